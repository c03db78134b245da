//! Transactional email.

use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use bizrelay_core::SendEmailRequest;
use serde_json::{Value, json};
use tracing::info;

/// `POST /api/send-email`
///
/// Malformed JSON is a validation error; the content type is not checked.
pub async fn send_email(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: SendEmailRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::malformed_body(&e))?;
    let message = request.validate()?;

    let report = state.transport.send(&message).await?;

    info!(recipients = report.recipients, "email sent");
    Ok(Json(json!({"status": "sent", "recipients": report.recipients})))
}
