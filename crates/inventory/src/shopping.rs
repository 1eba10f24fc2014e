//! Shopping-list derivation.
//!
//! Pure function of the grouped inventory: every item whose current quantity
//! is below its minimum is listed with the number of units to buy.

use serde::{Deserialize, Serialize};

use pantry_core::ItemId;

use crate::item::{CategoryWithItems, PurchaseUpdate};

/// An item that needs restocking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingEntry {
    pub id: ItemId,
    pub name: String,
    #[serde(rename = "genre_name")]
    pub category_name: String,
    pub min_quantity: i64,
    pub current_quantity: i64,
    pub to_buy: i64,
}

impl ShoppingEntry {
    /// Purchase that brings the item exactly back to its minimum.
    pub fn as_purchase(&self) -> PurchaseUpdate {
        PurchaseUpdate {
            item_id: self.id,
            purchased_quantity: self.to_buy,
        }
    }
}

/// Flatten the inventory into the items that need buying, keeping
/// category order and item order.
pub fn shopping_list(inventory: &[CategoryWithItems]) -> Vec<ShoppingEntry> {
    inventory
        .iter()
        .flat_map(|category| {
            category
                .items
                .iter()
                .filter(|item| item.needs_restock())
                .map(move |item| ShoppingEntry {
                    id: item.id,
                    name: item.name.clone(),
                    category_name: category.name.clone(),
                    min_quantity: item.min_quantity,
                    current_quantity: item.current_quantity,
                    to_buy: item.shortfall(),
                })
        })
        .collect()
}
