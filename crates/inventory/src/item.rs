use serde::{Deserialize, Serialize};

use pantry_core::{CategoryId, DomainError, ItemId};

/// Column default for `items.min_quantity`.
pub const DEFAULT_MIN_QUANTITY: i64 = 1;
/// Column default for `items.current_quantity`.
pub const DEFAULT_CURRENT_QUANTITY: i64 = 0;
/// Column default for the `"order"` columns of both tables.
pub const DEFAULT_ORDER: i64 = 0;
/// Largest value the `INTEGER` quantity and order columns hold on every engine.
pub const MAX_COLUMN_VALUE: i64 = i32::MAX as i64;

/// A named grouping of items (persisted as a genre row).
///
/// `name` is the de facto natural key used by item creation, although the
/// schema does not enforce uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub order: i64,
}

/// A trackable good.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(rename = "genre_id")]
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub min_quantity: i64,
    pub current_quantity: i64,
    pub order: i64,
}

impl Item {
    /// An item below its minimum belongs on the shopping list.
    pub fn needs_restock(&self) -> bool {
        self.current_quantity < self.min_quantity
    }

    /// Units missing to get back to the minimum (0 when stocked).
    pub fn shortfall(&self) -> i64 {
        (self.min_quantity - self.current_quantity).max(0)
    }
}

/// A category together with its items, as returned by the inventory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryWithItems {
    pub id: CategoryId,
    pub name: String,
    pub order: i64,
    pub items: Vec<Item>,
}

/// Command: create an item, resolving its category by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    category_name: String,
    name: String,
    min_quantity: i64,
    current_quantity: i64,
}

impl NewItem {
    /// Validate and build the command.
    ///
    /// Both names must be non-empty; quantities must lie in
    /// `0..=MAX_COLUMN_VALUE`.
    pub fn new(
        category_name: impl Into<String>,
        name: impl Into<String>,
        min_quantity: i64,
        current_quantity: i64,
    ) -> Result<Self, DomainError> {
        let category_name = category_name.into();
        let name = name.into();
        if category_name.is_empty() || name.is_empty() {
            return Err(DomainError::validation(
                "genre name and item name are required",
            ));
        }
        ensure_quantity("min_quantity", min_quantity)?;
        ensure_quantity("current_quantity", current_quantity)?;

        Ok(Self {
            category_name,
            name,
            min_quantity,
            current_quantity,
        })
    }

    pub fn category_name(&self) -> &str {
        &self.category_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_quantity(&self) -> i64 {
        self.min_quantity
    }

    pub fn current_quantity(&self) -> i64 {
        self.current_quantity
    }

    /// The item as stored once its category and identifier are known.
    pub fn into_item(self, id: ItemId, category_id: CategoryId) -> Item {
        Item {
            id,
            category_id: Some(category_id),
            name: self.name,
            min_quantity: self.min_quantity,
            current_quantity: self.current_quantity,
            order: DEFAULT_ORDER,
        }
    }
}

/// Command: full replace of an item's mutable fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub id: ItemId,
    pub name: String,
    pub min_quantity: i64,
    pub current_quantity: i64,
    pub category_id: Option<CategoryId>,
}

impl ItemUpdate {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.is_empty() {
            return Err(DomainError::validation("item name is required"));
        }
        ensure_quantity("min_quantity", self.min_quantity)?;
        ensure_quantity("current_quantity", self.current_quantity)
    }
}

/// Stocktaking entry: set the current quantity to a freshly counted value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountUpdate {
    pub item_id: ItemId,
    pub current_quantity: i64,
}

/// Purchase entry: add the purchased quantity to the current quantity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseUpdate {
    pub item_id: ItemId,
    pub purchased_quantity: i64,
}

/// Reorder entry: new display order for a category.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryOrder {
    pub category_id: CategoryId,
    pub order: i64,
}

impl CountUpdate {
    /// Validate a whole stocktaking batch before anything is written.
    pub fn validate_batch(updates: &[CountUpdate]) -> Result<(), DomainError> {
        for (idx, u) in updates.iter().enumerate() {
            ensure_quantity("current_quantity", u.current_quantity)
                .map_err(|e| at_index(idx, e))?;
        }
        Ok(())
    }
}

impl PurchaseUpdate {
    /// Validate a whole purchase batch before anything is written.
    pub fn validate_batch(updates: &[PurchaseUpdate]) -> Result<(), DomainError> {
        for (idx, u) in updates.iter().enumerate() {
            ensure_quantity("purchased_quantity", u.purchased_quantity)
                .map_err(|e| at_index(idx, e))?;
        }
        Ok(())
    }
}

impl CategoryOrder {
    pub fn validate_batch(orders: &[CategoryOrder]) -> Result<(), DomainError> {
        for (idx, o) in orders.iter().enumerate() {
            if !(i64::from(i32::MIN)..=MAX_COLUMN_VALUE).contains(&o.order) {
                return Err(at_index(
                    idx,
                    DomainError::validation(format!(
                        "order must fit an INTEGER column (got {})",
                        o.order
                    )),
                ));
            }
        }
        Ok(())
    }
}

fn ensure_quantity(field: &str, value: i64) -> Result<(), DomainError> {
    if value < 0 {
        return Err(DomainError::validation(format!(
            "{field} cannot be negative (got {value})"
        )));
    }
    if value > MAX_COLUMN_VALUE {
        return Err(DomainError::validation(format!(
            "{field} cannot exceed {MAX_COLUMN_VALUE} (got {value})"
        )));
    }
    Ok(())
}

fn at_index(idx: usize, err: DomainError) -> DomainError {
    match err {
        DomainError::Validation(msg) => DomainError::validation(format!("entry {idx}: {msg}")),
        other => other,
    }
}
