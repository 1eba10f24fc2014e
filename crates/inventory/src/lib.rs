//! Household inventory domain module.
//!
//! This crate contains the business rules for categories and items,
//! implemented purely as deterministic domain logic (no IO, no SQL, no HTTP).

pub mod grouping;
pub mod item;
pub mod shopping;

pub use grouping::{InventoryRow, group_rows};
pub use item::{
    Category, CategoryOrder, CategoryWithItems, CountUpdate, Item, ItemUpdate, NewItem,
    PurchaseUpdate, DEFAULT_CURRENT_QUANTITY, DEFAULT_MIN_QUANTITY, DEFAULT_ORDER, MAX_COLUMN_VALUE,
};
pub use shopping::{ShoppingEntry, shopping_list};
