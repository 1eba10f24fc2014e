//! HTTP API application wiring (Axum router + layers).
//!
//! - `routes/`: HTTP handlers, one file per resource
//! - `dto.rs`: request bodies and their mapping to store commands
//! - `errors.rs`: consistent JSON error responses

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use pantry_infra::InventoryStore;

pub mod dto;
pub mod errors;
pub mod routes;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(store: Arc<InventoryStore>, cors_allow: &[String]) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", routes::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(cors_allow))
                .layer(Extension(store)),
        )
}

fn cors_layer(cors_allow: &[String]) -> CorsLayer {
    if cors_allow.is_empty() || cors_allow.iter().any(|o| o == "*") {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }

    let origins = cors_allow
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect::<Vec<_>>();
    CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any)
}
