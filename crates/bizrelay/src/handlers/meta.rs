//! Liveness, build info and fallbacks.

use crate::error::ApiError;
use axum::Json;
use serde_json::{Value, json};

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "code": 200}))
}

/// `GET /info`
pub async fn info() -> Json<Value> {
    Json(json!({
        "status": "success",
        "data": {"version": env!("CARGO_PKG_VERSION")},
    }))
}

/// Any unrouted path.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// A routed path hit with the wrong method.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
