use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use pantry_infra::InventoryStore;

use crate::app::{dto, errors};

pub async fn list_genres(Extension(store): Extension<Arc<InventoryStore>>) -> axum::response::Response {
    match store.list_categories().await {
        Ok(genres) => Json(json!({ "data": genres })).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

/// `{ "genres": [{ "id", "order" }] }`, applied in input order.
pub async fn reorder_genres(
    Extension(store): Extension<Arc<InventoryStore>>,
    body: Result<Json<dto::ReorderGenresRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let Some(entries) = body.genres else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_input", "genres array is required");
    };

    match store.reorder_categories(&dto::category_orders(entries)).await {
        Ok(outcome) => Json(json!({
            "message": "Genres reordered",
            "data": outcome,
        }))
        .into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}
