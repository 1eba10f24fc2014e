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

pub async fn list_inventory(
    Extension(store): Extension<Arc<InventoryStore>>,
) -> axum::response::Response {
    match store.list_inventory().await {
        Ok(inventory) => Json(json!({ "data": inventory })).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

/// Stocktaking: `{ "updates": [{ "id", "current_quantity" }] }`.
pub async fn apply_counts(
    Extension(store): Extension<Arc<InventoryStore>>,
    body: Result<Json<dto::StocktakeRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let Some(entries) = body.updates else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_input", "updates array is required");
    };

    match store.apply_counts(&dto::count_updates(entries)).await {
        Ok(outcome) => Json(json!({
            "message": "Batch update successful",
            "data": outcome,
        }))
        .into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}
