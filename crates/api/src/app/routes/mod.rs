use axum::{
    Router,
    routing::{get, post, put},
};

pub mod genres;
pub mod inventory;
pub mod items;
pub mod shopping;
pub mod system;

/// Router for the `/api` endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/inventory", get(inventory::list_inventory))
        .route("/inventory/update", post(inventory::apply_counts))
        .route("/genres", get(genres::list_genres))
        .route("/genres/reorder", put(genres::reorder_genres))
        .route("/items", post(items::create_item))
        .route("/items/:id", put(items::update_item).delete(items::delete_item))
        .route("/shopping/list", get(shopping::shopping_list))
        .route("/shopping/complete", post(shopping::complete_shopping))
}
