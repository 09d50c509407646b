//! Error taxonomy for the API surface.
//!
//! Each variant maps to one HTTP status class. Handlers propagate with `?`;
//! internal detail (I/O, serde) is logged and replaced by a generic message
//! before it reaches the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed request fields.
    #[error("{0}")]
    Validation(String),

    /// Task, user, or execution record absent.
    #[error("{0}")]
    NotFound(String),

    /// Missing, expired, or invalid bearer token.
    #[error("unauthorized")]
    Unauthorized,

    /// Acting on another user's resource. Phrased without confirming the
    /// resource exists.
    #[error("{0}")]
    Forbidden(String),

    /// Illegal execution-state transition.
    #[error("{0}")]
    State(String),

    /// Store unavailable or corrupt. Retried at the transport level by the
    /// caller, not internally.
    #[error("storage failure")]
    Persistence(#[from] std::io::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::State(_) => StatusCode::CONFLICT,
            ApiError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Persistence(ref cause) = self {
            tracing::error!(%cause, "persistence failure");
        }
        let body = Json(serde_json::json!({ "message": self.to_string() }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::State("x".into()).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn persistence_hides_detail() {
        let err: ApiError = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire").into();
        assert_eq!(err.to_string(), "storage failure");
    }
}
