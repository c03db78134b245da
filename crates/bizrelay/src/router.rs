//! Router construction.

use crate::cors::cors;
use crate::handlers::{email, meta, registry};
use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Builds the full router with CORS and request tracing.
pub fn build_router(state: AppState) -> Router {
    let send_email = || post(email::send_email).fallback(meta::method_not_allowed);

    Router::new()
        .route("/health", get(meta::health))
        .route("/info", get(meta::info))
        .route(
            "/api/entreprise/",
            get(registry::get_entreprise_without_identifier),
        )
        .route("/api/entreprise/*identifier", get(registry::get_entreprise))
        .route("/api/send-email", send_email())
        .route("/send-email", send_email())
        .fallback(meta::not_found)
        .layer(middleware::from_fn_with_state(state.origins.clone(), cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
