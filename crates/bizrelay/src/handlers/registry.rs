//! Company lookup.

use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use bizrelay_registry::{CanonicalEntity, Identifier};
use tracing::info;

/// `GET /api/entreprise/{identifier}`
///
/// The identifier is validated before any upstream call. Extra path
/// segments and undecodable bytes are validation failures too.
pub async fn get_entreprise(
    State(state): State<AppState>,
    identifier: Result<Path<String>, PathRejection>,
) -> Result<Json<CanonicalEntity>, ApiError> {
    let Path(candidate) = identifier.map_err(|e| ApiError::invalid_identifier(e.body_text()))?;
    lookup(&state, &candidate).await
}

/// `GET /api/entreprise/`
pub async fn get_entreprise_without_identifier(
    State(state): State<AppState>,
) -> Result<Json<CanonicalEntity>, ApiError> {
    lookup(&state, "").await
}

async fn lookup(state: &AppState, candidate: &str) -> Result<Json<CanonicalEntity>, ApiError> {
    let identifier = Identifier::parse(candidate, state.identifier_policy)?;
    let entity = state.lookup.lookup(&identifier).await?;

    info!(identifier = %identifier, kind = ?identifier.kind(), "entity resolved");
    Ok(Json(entity))
}
