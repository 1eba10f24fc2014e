//! PostgreSQL-backed query adapter (networked relational database).
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to [`QueryError::Engine`] with the SQLSTATE code
//! (when the server sent one), the server message and the statement template
//! as written by the caller (before placeholder rewriting).
//!
//! ## Thread Safety
//!
//! `PostgresAdapter` is `Send + Sync`; the SQLx pool hands out one connection
//! per statement, so statements from different requests run concurrently.

use std::borrow::Cow;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row};

use super::placeholders::to_ordinal;
use super::{Engine, QueryAdapter, QueryError, QueryOutcome, Record, SqlValue, StatementKind, returned_id};

/// PostgreSQL adapter.
#[derive(Debug, Clone)]
pub struct PostgresAdapter {
    pool: PgPool,
}

impl PostgresAdapter {
    /// Connect a pool of at most `max_connections` connections to `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, QueryError> {
        let options = PgConnectOptions::from_str(url).map_err(|e| connect_error(e.to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| connect_error(e.to_string()))?;

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueryAdapter for PostgresAdapter {
    fn engine(&self) -> Engine {
        Engine::Postgres
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<QueryOutcome, QueryError> {
        let kind = StatementKind::of(sql);
        let rewritten = to_ordinal(sql);
        let query = bind_params(&rewritten, params);

        match kind {
            StatementKind::Read | StatementKind::Returning => {
                let rows = query
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| engine_error(sql, e))?;
                let rows = decode_rows(sql, &rows)?;
                let returning = kind == StatementKind::Returning;
                Ok(QueryOutcome {
                    last_insert_id: if returning { returned_id(&rows) } else { None },
                    rows_affected: returning.then_some(rows.len() as u64),
                    rows,
                })
            }
            // Without RETURNING the server reports no generated id.
            StatementKind::Insert | StatementKind::Write => {
                let result = query
                    .execute(&self.pool)
                    .await
                    .map_err(|e| engine_error(sql, e))?;
                Ok(QueryOutcome {
                    rows: Vec::new(),
                    last_insert_id: None,
                    rows_affected: Some(result.rows_affected()),
                })
            }
        }
    }

    fn request_generated_id<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        with_returning_id(sql)
    }
}

/// Append `RETURNING id` unless the statement already returns something.
fn with_returning_id(sql: &str) -> Cow<'_, str> {
    if StatementKind::of(sql) == StatementKind::Returning {
        return Cow::Borrowed(sql);
    }
    Cow::Owned(format!("{} RETURNING id", sql.trim_end().trim_end_matches(';')))
}

fn bind_params<'q>(sql: &'q str, params: &'q [SqlValue]) -> Query<'q, Postgres, PgArguments> {
    params.iter().fold(sqlx::query(sql), |query, param| match param {
        SqlValue::Null => query.bind(None::<i64>),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Text(s) => query.bind(s.as_str()),
    })
}

fn decode_rows(sql: &str, rows: &[PgRow]) -> Result<Vec<Record>, QueryError> {
    rows.iter().map(|row| decode_row(sql, row)).collect()
}

/// Decode a row column by column: INT8, then INT4/INT2, then text types.
fn decode_row(sql: &str, row: &PgRow) -> Result<Record, QueryError> {
    let mut columns = Vec::with_capacity(row.len());
    for column in row.columns() {
        let idx = column.ordinal();
        let value = if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            v.map_or(SqlValue::Null, SqlValue::Int)
        } else if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
            v.map_or(SqlValue::Null, |v| SqlValue::Int(v.into()))
        } else if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
            v.map_or(SqlValue::Null, |v| SqlValue::Int(v.into()))
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
    tracing::warn!(engine = %Engine::Postgres, error = %err, "statement failed");
    err
}

fn connect_error(message: String) -> QueryError {
    QueryError::Connect {
        engine: Engine::Postgres,
        message,
    }
}
