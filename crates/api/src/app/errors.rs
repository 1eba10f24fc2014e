use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use pantry_infra::InventoryError;

/// Map a store failure to a JSON error.
///
/// Validation problems are the caller's to fix (400). Engine problems are
/// marked `retryable`: the whole operation may be retried later.
pub fn inventory_error_to_response(err: InventoryError) -> axum::response::Response {
    let retryable = err.is_retryable();
    let message = err.to_string();
    match err {
        InventoryError::Validation(e) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string())
        }
        InventoryError::Query(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(json!({
                "error": "query_error",
                "message": e.to_string(),
                "retryable": retryable,
            })),
        )
            .into_response(),
        InventoryError::Batch {
            index,
            committed,
            source,
        } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(json!({
                "error": "query_error",
                "message": source.to_string(),
                "retryable": retryable,
                "index": index,
                "committed": committed,
            })),
        )
            .into_response(),
        InventoryError::QuantityOverflow {
            index,
            committed,
            item_id,
        } => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({
                "error": "quantity_overflow",
                "message": message,
                "retryable": retryable,
                "index": index,
                "committed": committed,
                "id": item_id,
            })),
        )
            .into_response(),
        InventoryError::SchemaUnavailable { reason } => (
            StatusCode::SERVICE_UNAVAILABLE,
            axum::Json(json!({
                "error": "schema_unavailable",
                "message": reason,
                "retryable": retryable,
            })),
        )
            .into_response(),
    }
}

pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_input", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
