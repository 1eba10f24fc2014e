//! Infrastructure layer: configuration, database adapters, schema and the
//! inventory store built on top of them.

pub mod config;
pub mod db;
pub mod schema;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use config::{Config, ConfigError, DatabaseConfig};
pub use db::{Engine, QueryAdapter, QueryError, QueryOutcome, Record, SqlValue};
pub use schema::{SchemaStatus, ensure_schema};
pub use store::{BatchOutcome, ErrorKind, InventoryError, InventoryStore};
