//! SQLite-backed query adapter (embedded file database).

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column, Row, Sqlite};

use super::{Engine, QueryAdapter, QueryError, QueryOutcome, Record, SqlValue, StatementKind, returned_id};

/// SQLite adapter.
///
/// The pool holds a single connection, so statements from concurrent
/// requests are serialized through it. This also keeps `sqlite::memory:`
/// databases alive for the lifetime of the adapter.
#[derive(Debug, Clone)]
pub struct SqliteAdapter {
    pool: SqlitePool,
}

impl SqliteAdapter {
    /// Open (creating if missing) the database at `url`
    /// (`sqlite://path/to/file.db` or `sqlite::memory:`).
    pub async fn connect(url: &str) -> Result<Self, QueryError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| connect_error(e.to_string()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| connect_error(e.to_string()))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl QueryAdapter for SqliteAdapter {
    fn engine(&self) -> Engine {
        Engine::Sqlite
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<QueryOutcome, QueryError> {
        let query = bind_params(sql, params);

        match StatementKind::of(sql) {
            StatementKind::Read | StatementKind::Returning => {
                let rows = query
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| engine_error(sql, e))?;
                let rows = decode_rows(sql, &rows)?;
                let returning = StatementKind::of(sql) == StatementKind::Returning;
                Ok(QueryOutcome {
                    last_insert_id: if returning { returned_id(&rows) } else { None },
                    rows_affected: returning.then_some(rows.len() as u64),
                    rows,
                })
            }
            kind => {
                let result = query
                    .execute(&self.pool)
                    .await
                    .map_err(|e| engine_error(sql, e))?;
                Ok(QueryOutcome {
                    rows: Vec::new(),
                    last_insert_id: (kind == StatementKind::Insert)
                        .then(|| result.last_insert_rowid()),
                    rows_affected: Some(result.rows_affected()),
                })
            }
        }
    }
}

fn bind_params<'q>(sql: &'q str, params: &'q [SqlValue]) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    params.iter().fold(sqlx::query(sql), |query, param| match param {
        SqlValue::Null => query.bind(None::<i64>),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Text(s) => query.bind(s.as_str()),
    })
}

fn decode_rows(sql: &str, rows: &[SqliteRow]) -> Result<Vec<Record>, QueryError> {
    rows.iter().map(|row| decode_row(sql, row)).collect()
}

fn decode_row(sql: &str, row: &SqliteRow) -> Result<Record, QueryError> {
    let mut columns = Vec::with_capacity(row.len());
    for column in row.columns() {
        let idx = column.ordinal();
        let value = if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            v.map_or(SqlValue::Null, SqlValue::Int)
        } else {
            row.try_get::<Option<String>, _>(idx)
                .map(|v| v.map_or(SqlValue::Null, SqlValue::Text))
                .map_err(|e| QueryError::Decode {
                    statement: sql.to_string(),
                    column: column.name().to_string(),
                    message: e.to_string(),
                })?
        };
        columns.push((column.name().to_string(), value));
    }
    Ok(Record::new(columns))
}

fn engine_error(sql: &str, err: sqlx::Error) -> QueryError {
    let err = QueryError::from_sqlx(sql, err);
    tracing::warn!(engine = %Engine::Sqlite, error = %err, "statement failed");
    err
}

fn connect_error(message: String) -> QueryError {
    QueryError::Connect {
        engine: Engine::Sqlite,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn adapter() -> SqliteAdapter {
        let db = SqliteAdapter::connect("sqlite::memory:").await.unwrap();
        db.execute(
            "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, label TEXT, n INTEGER)",
            &[],
        )
        .await
        .unwrap();
        db
    }

    #[tokio::test]
    async fn insert_reports_last_insert_id_and_affected_rows() {
        let db = adapter().await;

        let first = db
            .execute("INSERT INTO t (label, n) VALUES (?, ?)", &["a".into(), SqlValue::Int(1)])
            .await
            .unwrap();
        let second = db
            .execute("INSERT INTO t (label, n) VALUES (?, ?)", &["b".into(), SqlValue::Null])
            .await
            .unwrap();

        assert_eq!(first.last_insert_id, Some(1));
        assert_eq!(second.last_insert_id, Some(2));
        assert_eq!(second.rows_affected, Some(1));
    }

    #[tokio::test]
    async fn select_returns_all_rows_with_nulls() {
        let db = adapter().await;
        for n in 0..3i64 {
            db.execute("INSERT INTO t (label, n) VALUES (?, ?)", &["x".into(), n.into()])
                .await
                .unwrap();
        }
        db.execute("INSERT INTO t (label) VALUES (?)", &["y".into()])
            .await
            .unwrap();

        let out = db
            .execute("SELECT id, label, n FROM t ORDER BY id", &[])
            .await
            .unwrap();

        assert_eq!(out.rows.len(), 4);
        assert_eq!(out.rows_affected, None);
        assert_eq!(out.last_insert_id, None);
        assert_eq!(out.rows[3].try_opt_i64("n").unwrap(), None);
        assert_eq!(out.rows[1].try_i64("n").unwrap(), 1);
        assert_eq!(out.rows[0].try_str("label").unwrap(), "x");
    }

    #[tokio::test]
    async fn update_of_missing_row_affects_nothing() {
        let db = adapter().await;
        let out = db
            .execute("UPDATE t SET n = ? WHERE id = ?", &[SqlValue::Int(5), SqlValue::Int(99)])
            .await
            .unwrap();
        assert_eq!(out.rows_affected, Some(0));
        assert_eq!(out.last_insert_id, None);
    }

    #[tokio::test]
    async fn insert_returning_id_uses_rowid() {
        let db = adapter().await;
        let id = db
            .insert_returning_id("INSERT INTO t (label) VALUES (?)", &["z".into()])
            .await
            .unwrap();
        assert_eq!(id, 1);
    }

    #[tokio::test]
    async fn engine_errors_carry_the_statement() {
        let db = adapter().await;
        let err = db
            .execute("SELECT nope FROM missing_table WHERE id = ?", &[SqlValue::Int(1)])
            .await
            .unwrap_err();

        match err {
            QueryError::Engine {
                statement, message, ..
            } => {
                assert_eq!(statement, "SELECT nope FROM missing_table WHERE id = ?");
                assert!(message.contains("missing_table"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
