//! HTTP error taxonomy.
//!
//! Every failure a handler can produce maps to one variant here. The
//! internal cause is logged; the caller only ever sees a stable message and
//! a `kind` tag.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bizrelay_core::ValidationError;
use serde_json::{Value, json};
use tracing::{error, warn};

/// Request-scoped failure.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed identifier, email fields or request body.
    #[error("validation failed: {detail}")]
    Validation {
        /// Caller-safe message.
        message: &'static str,
        /// Offending field, when there is one.
        field: Option<&'static str>,
        /// Internal detail for the log.
        detail: String,
    },

    /// The registry has no such entity, or the route does not exist.
    #[error("not found")]
    NotFound,

    /// The registry answered with an unexpected status.
    #[error("registry returned {status}: {body}")]
    Upstream {
        /// Upstream HTTP status.
        status: u16,
        /// Upstream body, for the log only.
        body: String,
    },

    /// Network failure or timeout reaching the registry or relay.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The registry payload could not be decoded.
    #[error("undecodable registry payload: {0}")]
    Decode(String),

    /// Required credentials or settings are absent.
    #[error("configuration error: {0}")]
    Config(String),

    /// The relay rejected the message.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// The route exists but not for this method.
    #[error("method not allowed")]
    MethodNotAllowed,
}

impl ApiError {
    /// Malformed JSON body.
    pub fn malformed_body(err: &serde_json::Error) -> Self {
        Self::Validation {
            message: "Malformed JSON body",
            field: None,
            detail: err.to_string(),
        }
    }

    /// Identifier that could not be extracted from the path.
    pub fn invalid_identifier(detail: impl Into<String>) -> Self {
        Self::Validation {
            message: "Invalid identifier",
            field: Some("identifier"),
            detail: detail.into(),
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Upstream { .. }
            | Self::Transport(_)
            | Self::Decode(_)
            | Self::Config(_)
            | Self::Delivery(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Snake-case kind tag sent to the caller.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::NotFound => "not_found",
            Self::Upstream { .. } => "upstream",
            Self::Transport(_) => "transport",
            Self::Decode(_) => "decode",
            Self::Config(_) => "config",
            Self::Delivery(_) => "delivery",
            Self::MethodNotAllowed => "method_not_allowed",
        }
    }

    /// Stable caller-facing message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Validation { message, .. } => *message,
            Self::NotFound => "Not found",
            Self::Upstream { .. } => "Registry returned an unexpected response",
            Self::Transport(_) => "Upstream service unavailable",
            Self::Decode(_) => "Registry returned an unreadable response",
            Self::Config(_) => "Service is not configured",
            Self::Delivery(_) => "Email delivery failed",
            Self::MethodNotAllowed => "Method not allowed",
        }
    }

    fn body(&self) -> Value {
        let mut body = json!({
            "error": self.message(),
            "kind": self.kind(),
        });
        if let Self::Validation {
            field: Some(field), ..
        } = self
        {
            body["field"] = Value::from(*field);
        }
        body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.kind(), error = %self, "request failed");
        } else {
            warn!(kind = self.kind(), error = %self, "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation {
            message: err.message(),
            field: Some(err.field()),
            detail: err.to_string(),
        }
    }
}

impl From<bizrelay_registry::Error> for ApiError {
    fn from(err: bizrelay_registry::Error) -> Self {
        use bizrelay_registry::Error;

        match err {
            Error::InvalidIdentifier { reason } => Self::invalid_identifier(reason),
            Error::NotFound => Self::NotFound,
            Error::Upstream { status, body } => Self::Upstream { status, body },
            Error::Transport(e) => Self::Transport(e.to_string()),
            Error::Decode(detail) => Self::Decode(detail),
            Error::Config(detail) => Self::Config(detail),
        }
    }
}

impl From<bizrelay_core::Error> for ApiError {
    fn from(err: bizrelay_core::Error) -> Self {
        use bizrelay_core::Error;

        match err {
            Error::Validation(e) => e.into(),
            Error::Config(detail) => Self::Config(detail),
            Error::Compose(e) if e.is_invalid_input() => Self::Validation {
                message: "Invalid field",
                field: Some("attachment_data"),
                detail: e.to_string(),
            },
            Error::Compose(e) => Self::Delivery(e.to_string()),
            Error::Delivery(e) if e.is_transport() => Self::Transport(e.to_string()),
            Error::Delivery(e) => Self::Delivery(e.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_body() {
        let err = ApiError::from(ValidationError::MissingField("to"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.body(),
            json!({"error": "Missing required field", "kind": "validation", "field": "to"})
        );
    }

    #[test]
    fn test_upstream_body_is_not_echoed() {
        let err = ApiError::from(bizrelay_registry::Error::Upstream {
            status: 502,
            body: "stack trace: secret".into(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = err.body().to_string();
        assert!(!body.contains("secret"));
        assert!(body.contains("\"kind\":\"upstream\""));
    }

    #[test]
    fn test_registry_mapping() {
        assert_eq!(
            ApiError::from(bizrelay_registry::Error::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        let err = ApiError::from(bizrelay_registry::Error::invalid_identifier("must be 14 digits"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body()["field"], "identifier");
        assert_eq!(
            ApiError::from(bizrelay_registry::Error::Config("no token".into())).kind(),
            "config"
        );
    }

    #[test]
    fn test_method_not_allowed() {
        let err = ApiError::MethodNotAllowed;
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(err.body().get("field").is_none());
    }
}
