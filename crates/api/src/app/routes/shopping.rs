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

/// Items below their minimum quantity, with how many to buy.
pub async fn shopping_list(
    Extension(store): Extension<Arc<InventoryStore>>,
) -> axum::response::Response {
    match store.shopping_list().await {
        Ok(entries) => Json(json!({ "data": entries })).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

/// `{ "items": [{ "id", "purchased_quantity" }] }`: add purchases to stock.
pub async fn complete_shopping(
    Extension(store): Extension<Arc<InventoryStore>>,
    body: Result<Json<dto::CompleteShoppingRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let Some(entries) = body.items else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_input", "items array is required");
    };

    match store.apply_purchases(&dto::purchase_updates(entries)).await {
        Ok(outcome) => Json(json!({
            "message": "Shopping completed",
            "data": outcome,
        }))
        .into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}
