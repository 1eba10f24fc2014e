use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
    response::IntoResponse,
};
use serde_json::json;

use pantry_core::ItemId;
use pantry_infra::{InventoryError, InventoryStore};

use crate::app::{dto, errors};

pub async fn create_item(
    Extension(store): Extension<Arc<InventoryStore>>,
    body: Result<Json<dto::CreateItemRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let cmd = match body.into_command() {
        Ok(cmd) => cmd,
        Err(e) => return errors::inventory_error_to_response(e.into()),
    };

    let genre_name = cmd.category_name().to_string();
    match store.add_item(cmd).await {
        Ok(item) => Json(json!({
            "message": "success",
            "data": dto::CreatedItem { item, genre_name },
        }))
        .into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(store): Extension<Arc<InventoryStore>>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateItemRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_item_id(&id) {
        Ok(id) => id,
        Err(e) => return errors::inventory_error_to_response(e),
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match store.update_item(body.into_command(id)).await {
        Ok(rows_affected) => Json(json!({
            "message": "success",
            "rows_affected": rows_affected,
        }))
        .into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

/// Deleting an unknown id succeeds with `rows_affected: 0`.
pub async fn delete_item(
    Extension(store): Extension<Arc<InventoryStore>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_item_id(&id) {
        Ok(id) => id,
        Err(e) => return errors::inventory_error_to_response(e),
    };

    match store.delete_item(id).await {
        Ok(rows_affected) => Json(json!({
            "message": "deleted",
            "rows_affected": rows_affected,
        }))
        .into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

fn parse_item_id(raw: &str) -> Result<ItemId, InventoryError> {
    raw.parse::<ItemId>().map_err(InventoryError::from)
}
