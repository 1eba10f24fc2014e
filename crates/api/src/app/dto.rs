use serde::{Deserialize, Serialize};

use pantry_core::{CategoryId, DomainError, ItemId};
use pantry_inventory::{
    CategoryOrder, CountUpdate, DEFAULT_CURRENT_QUANTITY, DEFAULT_MIN_QUANTITY, Item, ItemUpdate,
    NewItem, PurchaseUpdate,
};

// -------------------------
// Request DTOs
// -------------------------

/// Missing names are reported as validation errors rather than rejected
/// bodies, so the caller gets the domain message.
#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub genre_name: Option<String>,
    pub name: Option<String>,
    pub min_quantity: Option<i64>,
    pub current_quantity: Option<i64>,
}

impl CreateItemRequest {
    pub fn into_command(self) -> Result<NewItem, DomainError> {
        NewItem::new(
            self.genre_name.unwrap_or_default(),
            self.name.unwrap_or_default(),
            self.min_quantity.unwrap_or(DEFAULT_MIN_QUANTITY),
            self.current_quantity.unwrap_or(DEFAULT_CURRENT_QUANTITY),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub name: String,
    pub min_quantity: i64,
    pub current_quantity: i64,
    pub genre_id: Option<CategoryId>,
}

impl UpdateItemRequest {
    pub fn into_command(self, id: ItemId) -> ItemUpdate {
        ItemUpdate {
            id,
            name: self.name,
            min_quantity: self.min_quantity,
            current_quantity: self.current_quantity,
            category_id: self.genre_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CountEntry {
    pub id: ItemId,
    pub current_quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseEntry {
    pub id: ItemId,
    pub purchased_quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct GenreOrderEntry {
    pub id: CategoryId,
    pub order: i64,
}

/// `{ "updates": [...] }`; an absent array is invalid input.
#[derive(Debug, Deserialize)]
pub struct StocktakeRequest {
    pub updates: Option<Vec<CountEntry>>,
}

/// `{ "items": [...] }`
#[derive(Debug, Deserialize)]
pub struct CompleteShoppingRequest {
    pub items: Option<Vec<PurchaseEntry>>,
}

/// `{ "genres": [...] }`
#[derive(Debug, Deserialize)]
pub struct ReorderGenresRequest {
    pub genres: Option<Vec<GenreOrderEntry>>,
}

// -------------------------
// Response DTOs
// -------------------------

/// A freshly created item together with the genre it was filed under.
#[derive(Debug, Serialize)]
pub struct CreatedItem {
    #[serde(flatten)]
    pub item: Item,
    pub genre_name: String,
}

pub fn count_updates(entries: Vec<CountEntry>) -> Vec<CountUpdate> {
    entries
        .into_iter()
        .map(|e| CountUpdate {
            item_id: e.id,
            current_quantity: e.current_quantity,
        })
        .collect()
}

pub fn purchase_updates(entries: Vec<PurchaseEntry>) -> Vec<PurchaseUpdate> {
    entries
        .into_iter()
        .map(|e| PurchaseUpdate {
            item_id: e.id,
            purchased_quantity: e.purchased_quantity,
        })
        .collect()
}

pub fn category_orders(entries: Vec<GenreOrderEntry>) -> Vec<CategoryOrder> {
    entries
        .into_iter()
        .map(|e| CategoryOrder {
            category_id: e.id,
            order: e.order,
        })
        .collect()
}
