/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>` which automatically converts
/// to the appropriate status code, with the body carrying the same error
/// code the realtime channel uses, so the taxonomy case survives either
/// transport.
///
/// # Example
///
/// ```ignore
/// use taskdeck_api::error::{ApiError, ApiResult};
/// use axum::Json;
///
/// async fn handler() -> ApiResult<Json<serde_json::Value>> {
///     let data = fetch_data().await?;
///     Ok(Json(data))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use taskdeck_shared::auth::gate::GateError;
use taskdeck_shared::service::error::ServiceError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad input shape or length (400)
    BadRequest(String),

    /// Duplicate username/email at registration (400, per the original
    /// contract; not 409)
    Conflict(String),

    /// Missing/invalid/expired credential (401)
    Unauthorized(String),

    /// No matching owned or claimable row (404)
    NotFound(String),

    /// Upload type/size/count violation (400)
    UploadRejected(String),

    /// Store or unexpected failure (500); detail is logged, a generic
    /// message goes to the caller
    Internal(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "AUTH_REQUIRED", "NOT_FOUND")
    pub error: String,

    /// Human-readable error message
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::UploadRejected(msg) => write!(f, "Upload rejected: {}", msg),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Status code and wire code for each case
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "VALIDATION"),
            ApiError::Conflict(_) => (StatusCode::BAD_REQUEST, "CONFLICT"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "AUTH_REQUIRED"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::UploadRejected(_) => (StatusCode::BAD_REQUEST, "UPLOAD_REJECTED"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();

        let message = match self {
            // Log internal errors but don't expose details to clients
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::UploadRejected(msg) => msg,
        };

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Convert service errors to API errors
impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => ApiError::BadRequest(msg),
            ServiceError::Unauthenticated => {
                ApiError::Unauthorized("Authentication required".to_string())
            }
            ServiceError::NotFound(msg) => ApiError::NotFound(msg),
            ServiceError::Conflict(msg) => ApiError::Conflict(msg),
            ServiceError::UploadRejected(msg) => ApiError::UploadRejected(msg),
            ServiceError::Internal => ApiError::Internal("service failure".to_string()),
        }
    }
}

/// Convert gate errors to API errors
impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Unauthenticated => {
                ApiError::Unauthorized("Authentication required".to_string())
            }
            GateError::Database(e) => ApiError::Internal(format!("identity lookup failed: {}", e)),
        }
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Internal(format!("database error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Task not found".to_string());
        assert_eq!(err.to_string(), "Not found: Task not found");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::BadRequest(String::new()).parts().0,
            StatusCode::BAD_REQUEST
        );
        // Duplicate registration is a 400 in this API, not a 409
        assert_eq!(
            ApiError::Conflict(String::new()).parts().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized(String::new()).parts().0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::NotFound(String::new()).parts().0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::UploadRejected(String::new()).parts().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Internal(String::new()).parts().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_service_error_mapping_preserves_case() {
        let err: ApiError = ServiceError::Unauthenticated.into();
        assert_eq!(err.parts().1, "AUTH_REQUIRED");

        let err: ApiError = ServiceError::NotFound("x".into()).into();
        assert_eq!(err.parts().1, "NOT_FOUND");

        let err: ApiError = ServiceError::UploadRejected("x".into()).into();
        assert_eq!(err.parts().1, "UPLOAD_REJECTED");

        let err: ApiError = ServiceError::Conflict("x".into()).into();
        assert_eq!(err.parts().1, "CONFLICT");
    }
}
