//! Idempotent schema setup.
//!
//! `ensure_schema` is safe to run on every start. Its outcome is logged and
//! returned as a [`SchemaStatus`] instead of an error; the store keeps that
//! status and refuses to run statements against a schema that is not ready.

use serde::Serialize;
use tracing::instrument;

use crate::db::{Engine, QueryAdapter};

/// Readiness of the persisted schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SchemaStatus {
    Ready,
    Unavailable { reason: String },
}

impl SchemaStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, SchemaStatus::Ready)
    }
}

pub(crate) fn create_categories_table(engine: Engine) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS genres (
    id {identity},
    name TEXT NOT NULL,
    "order" INTEGER DEFAULT 0
)"#,
        identity = engine.identity_column(),
    )
}

pub(crate) fn create_items_table(engine: Engine) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS items (
    id {identity},
    genre_id {reference},
    name TEXT NOT NULL,
    min_quantity INTEGER DEFAULT 1,
    current_quantity INTEGER DEFAULT 0,
    "order" INTEGER DEFAULT 0,
    FOREIGN KEY (genre_id) REFERENCES genres (id)
)"#,
        identity = engine.identity_column(),
        reference = engine.reference_column(),
    )
}

/// Create both tables if absent, categories first.
///
/// If the categories table cannot be created the items table is not
/// attempted. Failures are logged and reported through the returned status.
#[instrument(skip(db), fields(engine = %db.engine()))]
pub async fn ensure_schema(db: &dyn QueryAdapter) -> SchemaStatus {
    let engine = db.engine();

    if let Err(err) = db.execute(&create_categories_table(engine), &[]).await {
        tracing::error!(error = %err, "failed to create genres table");
        return SchemaStatus::Unavailable {
            reason: format!("genres table: {err}"),
        };
    }
    tracing::info!("genres table ready");

    if let Err(err) = db.execute(&create_items_table(engine), &[]).await {
        tracing::error!(error = %err, "failed to create items table");
        return SchemaStatus::Unavailable {
            reason: format!("items table: {err}"),
        };
    }
    tracing::info!("items table ready");

    SchemaStatus::Ready
}
