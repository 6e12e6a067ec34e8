//! Error types for the dashboard API.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use evofleet_core::fleet::FleetError;
use evofleet_core::runner::HandleError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request conflicts with the fleet's current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request body was well-formed but its values are not acceptable.
    #[error("invalid request: {0}")]
    Invalid(String),

    /// The fleet actor is not running.
    #[error("fleet unavailable")]
    Unavailable,

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<HandleError> for ObserverError {
    fn from(e: HandleError) -> Self {
        match e {
            HandleError::Closed => Self::Unavailable,
            HandleError::Rejected(inner @ (FleetError::Gate(_) | FleetError::ConfigLocked(_))) => {
                Self::Conflict(inner.to_string())
            }
            HandleError::Rejected(inner @ FleetError::InvalidConfig(_)) => {
                Self::Invalid(inner.to_string())
            }
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::Invalid(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            Self::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
