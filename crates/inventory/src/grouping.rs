//! Reshaping of the flat category/item join into nested categories.
//!
//! The inventory listing runs a single `LEFT JOIN` of categories to items,
//! sorted by category order and then item order. `group_rows` folds that
//! stream into one `CategoryWithItems` per category in a single pass:
//!
//! - the first row seen for a category id opens its group (an id → index map
//!   makes the "seen before?" check O(1));
//! - rows with a null item id come from categories without items and only
//!   open the group, they never add an item;
//! - groups keep the order in which their first row appeared, items keep row
//!   order.
//!
//! O(rows) time, O(categories) auxiliary space.

use std::collections::HashMap;

use pantry_core::{CategoryId, ItemId};

use crate::item::{
    CategoryWithItems, DEFAULT_CURRENT_QUANTITY, DEFAULT_MIN_QUANTITY, DEFAULT_ORDER, Item,
};

/// One row of the category ⟕ item join.
///
/// Every item column is optional: the outer join yields nulls for categories
/// without items, and the schema allows nulls in the quantity/order columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRow {
    pub category_id: CategoryId,
    pub category_name: String,
    pub category_order: Option<i64>,
    pub item_id: Option<ItemId>,
    pub item_name: Option<String>,
    pub min_quantity: Option<i64>,
    pub current_quantity: Option<i64>,
    pub item_order: Option<i64>,
}

impl InventoryRow {
    fn item(&self) -> Option<Item> {
        let id = self.item_id?;
        Some(Item {
            id,
            category_id: Some(self.category_id),
            name: self.item_name.clone().unwrap_or_default(),
            min_quantity: self.min_quantity.unwrap_or(DEFAULT_MIN_QUANTITY),
            current_quantity: self.current_quantity.unwrap_or(DEFAULT_CURRENT_QUANTITY),
            order: self.item_order.unwrap_or(DEFAULT_ORDER),
        })
    }
}

/// Group an already-sorted join result by category.
pub fn group_rows<I>(rows: I) -> Vec<CategoryWithItems>
where
    I: IntoIterator<Item = InventoryRow>,
{
    let mut inventory: Vec<CategoryWithItems> = Vec::new();
    let mut index: HashMap<CategoryId, usize> = HashMap::new();

    for row in rows {
        let slot = *index.entry(row.category_id).or_insert_with(|| {
            inventory.push(CategoryWithItems {
                id: row.category_id,
                name: row.category_name.clone(),
                order: row.category_order.unwrap_or(DEFAULT_ORDER),
                items: Vec::new(),
            });
            inventory.len() - 1
        });

        if let Some(item) = row.item() {
            inventory[slot].items.push(item);
        }
    }

    inventory
}
