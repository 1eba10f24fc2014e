//! Engine-agnostic query execution.
//!
//! Everything above this module talks to the database through
//! [`QueryAdapter::execute`] with `?` placeholders and [`SqlValue`] parameters,
//! and reads results as [`Record`]s. The two implementations hide the engine
//! differences:
//!
//! | Concern | SQLite | PostgreSQL |
//! |---------|--------|------------|
//! | Placeholders | `?` as written | rewritten to `$1, $2, …` |
//! | Generated id | driver last-insert rowid | `RETURNING id` appended by [`QueryAdapter::insert_returning_id`] |
//! | Pool | one connection, statements serialize | `max_connections` concurrent |
//!
//! No statement is retried: one call is exactly one attempt.

pub mod placeholders;
pub mod postgres;
pub mod sqlite;

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::DatabaseConfig;

pub use postgres::PostgresAdapter;
pub use sqlite::SqliteAdapter;

/// Backing engine of a [`QueryAdapter`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Sqlite,
    Postgres,
}

impl Engine {
    /// Column declaration for an auto-increment primary key.
    pub fn identity_column(self) -> &'static str {
        match self {
            Engine::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
            Engine::Postgres => "BIGSERIAL PRIMARY KEY",
        }
    }

    /// Column type for a reference to an identity column.
    pub fn reference_column(self) -> &'static str {
        match self {
            Engine::Sqlite => "INTEGER",
            Engine::Postgres => "BIGINT",
        }
    }
}

impl core::fmt::Display for Engine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Engine::Sqlite => f.write_str("sqlite"),
            Engine::Postgres => f.write_str("postgres"),
        }
    }
}

/// A positional statement parameter or a decoded column value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

/// One result row: column names in select-list order with their values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    columns: Vec<(String, SqlValue)>,
}

impl Record {
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Integer column that may be null.
    pub fn try_opt_i64(&self, column: &str) -> Result<Option<i64>, QueryError> {
        match self.get(column) {
            Some(SqlValue::Int(v)) => Ok(Some(*v)),
            Some(SqlValue::Null) => Ok(None),
            Some(SqlValue::Text(_)) => Err(QueryError::column(column, "integer")),
            None => Err(QueryError::column(column, "present")),
        }
    }

    pub fn try_i64(&self, column: &str) -> Result<i64, QueryError> {
        self.try_opt_i64(column)?
            .ok_or_else(|| QueryError::column(column, "non-null integer"))
    }

    /// Text column that may be null.
    pub fn try_opt_str(&self, column: &str) -> Result<Option<String>, QueryError> {
        match self.get(column) {
            Some(SqlValue::Text(v)) => Ok(Some(v.clone())),
            Some(SqlValue::Null) => Ok(None),
            Some(SqlValue::Int(_)) => Err(QueryError::column(column, "text")),
            None => Err(QueryError::column(column, "present")),
        }
    }

    pub fn try_str(&self, column: &str) -> Result<String, QueryError> {
        self.try_opt_str(column)?
            .ok_or_else(|| QueryError::column(column, "non-null text"))
    }
}

/// Unified result shape of a single statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutcome {
    /// All matching rows (reads and `RETURNING` writes), unpaginated.
    pub rows: Vec<Record>,
    /// Identifier generated by an insert, when the engine reported one.
    pub last_insert_id: Option<i64>,
    /// Rows touched by a write; `None` for reads.
    pub rows_affected: Option<u64>,
}

/// Query execution error.
///
/// Engine failures keep the statement template as the caller wrote it, so a
/// failure can be traced back to the call site regardless of engine rewriting.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("could not connect to {engine}: {message}")]
    Connect { engine: Engine, message: String },

    #[error("engine rejected statement `{statement}`: {message}")]
    Engine {
        statement: String,
        code: Option<String>,
        message: String,
    },

    #[error("could not decode column {column} of `{statement}`: {message}")]
    Decode {
        statement: String,
        column: String,
        message: String,
    },

    #[error("column {column}: expected {expected} value")]
    Column { column: String, expected: &'static str },

    #[error("insert did not return a generated id: `{statement}`")]
    MissingGeneratedId { statement: String },
}

impl QueryError {
    pub(crate) fn column(column: &str, expected: &'static str) -> Self {
        Self::Column {
            column: column.to_string(),
            expected,
        }
    }

    pub(crate) fn from_sqlx(statement: &str, err: sqlx::Error) -> Self {
        let (code, message) = match &err {
            sqlx::Error::Database(db_err) => (
                db_err.code().map(|c| c.into_owned()),
                db_err.message().to_string(),
            ),
            sqlx::Error::PoolClosed => (None, "connection pool closed".to_string()),
            sqlx::Error::PoolTimedOut => (None, "timed out acquiring a connection".to_string()),
            other => (None, other.to_string()),
        };
        Self::Engine {
            statement: statement.to_string(),
            code,
            message,
        }
    }
}

/// What an adapter has to do with a statement's results.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum StatementKind {
    /// `SELECT` / `WITH`: rows only.
    Read,
    /// Write carrying `RETURNING`: rows plus affected count.
    Returning,
    /// `INSERT` without `RETURNING`: affected count plus generated id.
    Insert,
    /// Any other write or DDL: affected count only.
    Write,
}

impl StatementKind {
    pub(crate) fn of(sql: &str) -> Self {
        let upper = sql.trim_start().to_ascii_uppercase();
        let first = upper
            .split(|c: char| !c.is_ascii_alphabetic())
            .find(|w| !w.is_empty())
            .unwrap_or("");
        if first == "SELECT" || first == "WITH" {
            return StatementKind::Read;
        }
        let returning = upper
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .any(|w| w == "RETURNING");
        match (returning, first) {
            (true, _) => StatementKind::Returning,
            (false, "INSERT") => StatementKind::Insert,
            _ => StatementKind::Write,
        }
    }
}

/// Single entry point for parameterized SQL, implemented once per engine.
///
/// Implementations own their connection pool; every call acquires a
/// connection for the duration of one statement and returns it on success
/// and failure alike.
#[async_trait]
pub trait QueryAdapter: Send + Sync {
    fn engine(&self) -> Engine;

    /// Execute one statement written with `?` placeholders.
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<QueryOutcome, QueryError>;

    /// Rewrite an `INSERT` so that the engine reports the generated id.
    fn request_generated_id<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(sql)
    }

    /// Execute an `INSERT` and return the generated identifier.
    ///
    /// Fails with [`QueryError::MissingGeneratedId`] rather than returning a
    /// null id when the engine reports none.
    async fn insert_returning_id(&self, sql: &str, params: &[SqlValue]) -> Result<i64, QueryError> {
        let statement = self.request_generated_id(sql);
        let outcome = self.execute(&statement, params).await?;
        outcome
            .last_insert_id
            .ok_or_else(|| QueryError::MissingGeneratedId {
                statement: sql.to_string(),
            })
    }
}

/// Open the adapter selected by configuration.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn QueryAdapter>, QueryError> {
    match config {
        DatabaseConfig::Sqlite { url } => {
            let adapter = SqliteAdapter::connect(url).await?;
            tracing::info!(engine = %Engine::Sqlite, "connected to database");
            Ok(Arc::new(adapter))
        }
        DatabaseConfig::Postgres {
            url,
            max_connections,
        } => {
            let adapter = PostgresAdapter::connect(url, *max_connections).await?;
            tracing::info!(engine = %Engine::Postgres, max_connections, "connected to database");
            Ok(Arc::new(adapter))
        }
    }
}

/// Generated id of a `RETURNING` statement: the `id` column of its first row.
pub(crate) fn returned_id(rows: &[Record]) -> Option<i64> {
    rows.first()
        .and_then(|row| row.try_opt_i64("id").ok())
        .flatten()
}
