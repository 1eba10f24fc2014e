use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use pantry_infra::InventoryStore;

/// 200 once the schema is ready, 503 with the failure reason otherwise.
pub async fn health(Extension(store): Extension<Arc<InventoryStore>>) -> impl IntoResponse {
    let status = store.schema_status();
    let code = if status.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status.clone()))
}
