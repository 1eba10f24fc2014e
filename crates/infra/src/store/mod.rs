//! Inventory data access on top of a [`QueryAdapter`].
//!
//! `InventoryStore` owns the adapter and the schema status recorded at
//! startup. Every operation checks that status first and fails fast with
//! [`InventoryError::SchemaUnavailable`] instead of touching missing tables.
//!
//! ## Batches
//!
//! `apply_counts`, `apply_purchases` and `reorder_categories` run one
//! `UPDATE` per entry, in input order, without a surrounding transaction.
//! When entry `N` fails, entries `0..N` stay committed and the rest are never
//! attempted; the error reports both. Entries whose id matches no row are
//! no-ops and are listed in [`BatchOutcome::missing`].
//!
//! A purchase that would push `current_quantity` past
//! [`MAX_COLUMN_VALUE`] is refused by the `UPDATE` itself and stops the batch
//! with [`InventoryError::QuantityOverflow`], leaving the stored value as it was.
//!
//! ## Category resolution
//!
//! `add_item` finds a category by exact name and creates it when absent.
//! Concurrent callers in this process naming the same category are
//! serialized by [`CategoryLocks`]; separate processes sharing one database
//! can still create duplicates, since the schema has no unique constraint.

mod category_locks;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use pantry_core::{CategoryId, DomainError, ItemId};
use pantry_inventory::{
    Category, CategoryOrder, CategoryWithItems, CountUpdate, InventoryRow, Item, ItemUpdate,
    MAX_COLUMN_VALUE, NewItem, PurchaseUpdate, ShoppingEntry, group_rows,
};

use crate::db::{QueryAdapter, QueryError, Record, SqlValue};
use crate::schema::{SchemaStatus, ensure_schema};

pub use category_locks::CategoryLocks;

const SELECT_INVENTORY: &str = r#"SELECT
    g.id AS genre_id, g.name AS genre_name, g."order" AS genre_order,
    i.id AS item_id, i.name AS item_name, i.min_quantity, i.current_quantity, i."order" AS item_order
FROM genres g
LEFT JOIN items i ON g.id = i.genre_id
ORDER BY COALESCE(g."order", 0), g.id, COALESCE(i."order", 0), i.id"#;

const SELECT_CATEGORIES: &str =
    r#"SELECT id, name, "order" FROM genres ORDER BY COALESCE("order", 0), id"#;
const SELECT_CATEGORY_BY_NAME: &str = "SELECT id FROM genres WHERE name = ? ORDER BY id";
const INSERT_CATEGORY: &str = r#"INSERT INTO genres (name, "order") VALUES (?, 0)"#;
const INSERT_ITEM: &str =
    "INSERT INTO items (genre_id, name, min_quantity, current_quantity) VALUES (?, ?, ?, ?)";
const UPDATE_ITEM: &str =
    "UPDATE items SET name = ?, min_quantity = ?, current_quantity = ?, genre_id = ? WHERE id = ?";
const DELETE_ITEM: &str = "DELETE FROM items WHERE id = ?";
const SET_CURRENT_QUANTITY: &str = "UPDATE items SET current_quantity = ? WHERE id = ?";
const ADD_TO_CURRENT_QUANTITY: &str = "UPDATE items SET current_quantity = current_quantity + ? \
     WHERE id = ? AND CAST(COALESCE(current_quantity, 0) AS BIGINT) + ? <= 2147483647";
const SELECT_ITEM_ID: &str = "SELECT id FROM items WHERE id = ?";
const SET_CATEGORY_ORDER: &str = r#"UPDATE genres SET "order" = ? WHERE id = ?"#;

/// Whether a failure is the caller's to fix or the engine's.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input; retrying unchanged will fail again.
    Validation,
    /// The engine failed or is not ready; retry the whole operation later.
    Engine,
}

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("batch entry {index} failed after {committed} committed entries: {source}")]
    Batch {
        index: usize,
        committed: usize,
        #[source]
        source: QueryError,
    },

    #[error(
        "batch entry {index} would push item {item_id} past {max} after {committed} committed entries",
        max = MAX_COLUMN_VALUE
    )]
    QuantityOverflow {
        index: usize,
        committed: usize,
        item_id: ItemId,
    },

    #[error("schema is not available: {reason}")]
    SchemaUnavailable { reason: String },
}

impl InventoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InventoryError::Validation(_) | InventoryError::QuantityOverflow { .. } => {
                ErrorKind::Validation
            }
            InventoryError::Query(_)
            | InventoryError::Batch { .. }
            | InventoryError::SchemaUnavailable { .. } => ErrorKind::Engine,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Engine
    }
}

/// Result of a fully applied batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub attempted: usize,
    pub rows_affected: u64,
    /// Input positions whose id matched no row.
    pub missing: Vec<usize>,
}

pub struct InventoryStore {
    db: Arc<dyn QueryAdapter>,
    schema: SchemaStatus,
    category_locks: CategoryLocks,
}

impl InventoryStore {
    pub fn new(db: Arc<dyn QueryAdapter>, schema: SchemaStatus) -> Self {
        Self {
            db,
            schema,
            category_locks: CategoryLocks::new(),
        }
    }

    /// Ensure the schema, then build a store that remembers the outcome.
    pub async fn open(db: Arc<dyn QueryAdapter>) -> Self {
        let schema = ensure_schema(db.as_ref()).await;
        Self::new(db, schema)
    }

    pub fn schema_status(&self) -> &SchemaStatus {
        &self.schema
    }

    fn ensure_ready(&self) -> Result<(), InventoryError> {
        match &self.schema {
            SchemaStatus::Ready => Ok(()),
            SchemaStatus::Unavailable { reason } => Err(InventoryError::SchemaUnavailable {
                reason: reason.clone(),
            }),
        }
    }

    /// Every category with its items, categories and items by display order.
    #[instrument(skip(self), err)]
    pub async fn list_inventory(&self) -> Result<Vec<CategoryWithItems>, InventoryError> {
        self.ensure_ready()?;
        let outcome = self.db.execute(SELECT_INVENTORY, &[]).await?;
        let rows = outcome
            .rows
            .iter()
            .map(inventory_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(group_rows(rows))
    }

    #[instrument(skip(self), err)]
    pub async fn list_categories(&self) -> Result<Vec<Category>, InventoryError> {
        self.ensure_ready()?;
        let outcome = self.db.execute(SELECT_CATEGORIES, &[]).await?;
        outcome
            .rows
            .iter()
            .map(|row| -> Result<Category, InventoryError> {
                Ok(Category {
                    id: CategoryId::new(row.try_i64("id")?),
                    name: row.try_str("name")?,
                    order: row.try_opt_i64("order")?.unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Create an item, creating its category first when no category has
    /// that exact name.
    #[instrument(
        skip(self, item),
        fields(genre = %item.category_name(), item = %item.name()),
        err
    )]
    pub async fn add_item(&self, item: NewItem) -> Result<Item, InventoryError> {
        self.ensure_ready()?;
        let category_id = self.find_or_create_category(item.category_name()).await?;

        let id = self
            .db
            .insert_returning_id(
                INSERT_ITEM,
                &[
                    SqlValue::Int(category_id.get()),
                    item.name().into(),
                    SqlValue::Int(item.min_quantity()),
                    SqlValue::Int(item.current_quantity()),
                ],
            )
            .await?;

        tracing::info!(item_id = id, genre_id = %category_id, "item created");
        Ok(item.into_item(ItemId::new(id), category_id))
    }

    async fn find_or_create_category(&self, name: &str) -> Result<CategoryId, InventoryError> {
        let _guard = self.category_locks.lock(name).await;

        let existing = self
            .db
            .execute(SELECT_CATEGORY_BY_NAME, &[name.into()])
            .await?;
        if let Some(row) = existing.rows.first() {
            return Ok(CategoryId::new(row.try_i64("id")?));
        }

        let id = self
            .db
            .insert_returning_id(INSERT_CATEGORY, &[name.into()])
            .await?;
        tracing::info!(genre_id = id, "genre created");
        Ok(CategoryId::new(id))
    }

    /// Replace an item's mutable fields. Returns rows affected (0 if absent).
    #[instrument(skip(self, update), fields(item_id = %update.id), err)]
    pub async fn update_item(&self, update: ItemUpdate) -> Result<u64, InventoryError> {
        update.validate()?;
        self.ensure_ready()?;
        let outcome = self
            .db
            .execute(
                UPDATE_ITEM,
                &[
                    update.name.as_str().into(),
                    SqlValue::Int(update.min_quantity),
                    SqlValue::Int(update.current_quantity),
                    update.category_id.map(CategoryId::get).into(),
                    SqlValue::Int(update.id.get()),
                ],
            )
            .await?;
        Ok(outcome.rows_affected.unwrap_or(0))
    }

    /// Delete an item. Returns rows affected (0 if absent).
    #[instrument(skip(self), err)]
    pub async fn delete_item(&self, id: ItemId) -> Result<u64, InventoryError> {
        self.ensure_ready()?;
        let outcome = self
            .db
            .execute(DELETE_ITEM, &[SqlValue::Int(id.get())])
            .await?;
        Ok(outcome.rows_affected.unwrap_or(0))
    }

    /// Stocktaking: set each listed item's current quantity.
    #[instrument(skip(self, updates), fields(entries = updates.len()), err)]
    pub async fn apply_counts(&self, updates: &[CountUpdate]) -> Result<BatchOutcome, InventoryError> {
        CountUpdate::validate_batch(updates)?;
        self.ensure_ready()?;
        self.run_batch(
            SET_CURRENT_QUANTITY,
            None,
            updates
                .iter()
                .map(|u| [SqlValue::Int(u.current_quantity), SqlValue::Int(u.item_id.get())])
                .collect::<Vec<_>>(),
        )
        .await
    }

    /// Purchase completion: add each purchased quantity to the current one.
    #[instrument(skip(self, updates), fields(entries = updates.len()), err)]
    pub async fn apply_purchases(
        &self,
        updates: &[PurchaseUpdate],
    ) -> Result<BatchOutcome, InventoryError> {
        PurchaseUpdate::validate_batch(updates)?;
        self.ensure_ready()?;
        self.run_batch(
            ADD_TO_CURRENT_QUANTITY,
            Some(SELECT_ITEM_ID),
            updates.iter().map(|u| {
                [
                    SqlValue::Int(u.purchased_quantity),
                    SqlValue::Int(u.item_id.get()),
                    SqlValue::Int(u.purchased_quantity),
                ]
            })
            .collect::<Vec<_>>(),
        )
        .await
    }

    #[instrument(skip(self, orders), fields(entries = orders.len()), err)]
    pub async fn reorder_categories(
        &self,
        orders: &[CategoryOrder],
    ) -> Result<BatchOutcome, InventoryError> {
        CategoryOrder::validate_batch(orders)?;
        self.ensure_ready()?;
        self.run_batch(
            SET_CATEGORY_ORDER,
            None,
            orders
                .iter()
                .map(|o| [SqlValue::Int(o.order), SqlValue::Int(o.category_id.get())])
                .collect::<Vec<_>>(),
        )
        .await
    }

    /// Items below their minimum, with the quantity to buy.
    #[instrument(skip(self), err)]
    pub async fn shopping_list(&self) -> Result<Vec<ShoppingEntry>, InventoryError> {
        let inventory = self.list_inventory().await?;
        Ok(pantry_inventory::shopping_list(&inventory))
    }

    /// Run `statement` once per entry. The id is the second parameter of
    /// every entry. With `guarded_by`, an entry matching no row is looked up
    /// by that query: a row that exists was refused by the statement's guard.
    async fn run_batch<const N: usize, I>(
        &self,
        statement: &str,
        guarded_by: Option<&str>,
        entries: I,
    ) -> Result<BatchOutcome, InventoryError>
    where
        I: IntoIterator<Item = [SqlValue; N]>,
    {
        let stopped = |index: usize, source: QueryError| {
            tracing::warn!(index, committed = index, "batch stopped");
            InventoryError::Batch {
                index,
                committed: index,
                source,
            }
        };

        let mut outcome = BatchOutcome::default();
        for (index, params) in entries.into_iter().enumerate() {
            let result = self
                .db
                .execute(statement, &params)
                .await
                .map_err(|source| stopped(index, source))?;

            let affected = result.rows_affected.unwrap_or(0);
            if affected == 0 {
                if let (Some(lookup), Some(SqlValue::Int(id))) = (guarded_by, params.get(1)) {
                    let found = self
                        .db
                        .execute(lookup, &[SqlValue::Int(*id)])
                        .await
                        .map_err(|source| stopped(index, source))?;
                    if !found.rows.is_empty() {
                        tracing::warn!(index, item_id = *id, "batch stopped: quantity overflow");
                        return Err(InventoryError::QuantityOverflow {
                            index,
                            committed: index,
                            item_id: ItemId::new(*id),
                        });
                    }
                }
                outcome.missing.push(index);
            }
            outcome.attempted += 1;
            outcome.rows_affected += affected;
        }

        tracing::debug!(
            attempted = outcome.attempted,
            missing = outcome.missing.len(),
            "batch applied"
        );
        Ok(outcome)
    }
}

fn inventory_row(row: &Record) -> Result<InventoryRow, QueryError> {
    Ok(InventoryRow {
        category_id: CategoryId::new(row.try_i64("genre_id")?),
        category_name: row.try_str("genre_name")?,
        category_order: row.try_opt_i64("genre_order")?,
        item_id: row.try_opt_i64("item_id")?.map(ItemId::new),
        item_name: row.try_opt_str("item_name")?,
        min_quantity: row.try_opt_i64("min_quantity")?,
        current_quantity: row.try_opt_i64("current_quantity")?,
        item_order: row.try_opt_i64("item_order")?,
    })
}
