/// Service error taxonomy
///
/// Every operation fails with exactly one of these cases, and both
/// transports preserve which case occurred (HTTP as a status code, the
/// realtime channel as an error object). Validation and ownership checks
/// run before any mutating store call; unexpected store failures are
/// logged here with context and surfaced as a generic `Internal` with no
/// store detail attached.

use crate::auth::gate::GateError;
use crate::auth::jwt::TokenError;
use crate::auth::password::PasswordError;
use crate::uploads::UploadError;

/// Service result type alias
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Unified service error
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Bad input shape or length
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid or expired credential
    #[error("Authentication required")]
    Unauthenticated,

    /// No matching owned or claimable row
    #[error("{0}")]
    NotFound(String),

    /// Duplicate username or email at registration
    #[error("{0}")]
    Conflict(String),

    /// Upload type/size/count violation
    #[error("{0}")]
    UploadRejected(String),

    /// Store or unexpected failure; detail stays in the logs
    #[error("Internal server error")]
    Internal,
}

impl ServiceError {
    /// Wire code preserved identically by both transports
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "VALIDATION",
            ServiceError::Unauthenticated => "AUTH_REQUIRED",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Conflict(_) => "CONFLICT",
            ServiceError::UploadRejected(_) => "UPLOAD_REJECTED",
            ServiceError::Internal => "INTERNAL",
        }
    }

    /// Flattens validator output into one Validation error
    pub fn from_validation(errors: validator::ValidationErrors) -> Self {
        let mut parts: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "is invalid".to_string());
                    format!("{}: {}", field, message)
                })
            })
            .collect();
        parts.sort();

        ServiceError::Validation(parts.join("; "))
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "Store operation failed");
        ServiceError::Internal
    }
}

impl From<GateError> for ServiceError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Unauthenticated => ServiceError::Unauthenticated,
            GateError::Database(e) => {
                tracing::error!(error = %e, "Store failure during identity resolution");
                ServiceError::Internal
            }
        }
    }
}

impl From<TokenError> for ServiceError {
    fn from(_: TokenError) -> Self {
        ServiceError::Unauthenticated
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        tracing::error!(error = %err, "Password operation failed");
        ServiceError::Internal
    }
}

impl From<UploadError> for ServiceError {
    fn from(err: UploadError) -> Self {
        ServiceError::UploadRejected(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 3, message = "too short"))]
        name: String,
    }

    #[test]
    fn test_wire_codes() {
        assert_eq!(ServiceError::Validation("x".into()).code(), "VALIDATION");
        assert_eq!(ServiceError::Unauthenticated.code(), "AUTH_REQUIRED");
        assert_eq!(ServiceError::NotFound("x".into()).code(), "NOT_FOUND");
        assert_eq!(ServiceError::Conflict("x".into()).code(), "CONFLICT");
        assert_eq!(
            ServiceError::UploadRejected("x".into()).code(),
            "UPLOAD_REJECTED"
        );
        assert_eq!(ServiceError::Internal.code(), "INTERNAL");
    }

    #[test]
    fn test_internal_message_is_generic() {
        assert_eq!(ServiceError::Internal.to_string(), "Internal server error");
    }

    #[test]
    fn test_from_validation_includes_field_name() {
        let probe = Probe { name: "ab".into() };
        let err = ServiceError::from_validation(probe.validate().unwrap_err());

        match err {
            ServiceError::Validation(msg) => {
                assert!(msg.contains("name"));
                assert!(msg.contains("too short"));
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_upload_error_preserves_detail() {
        let err: ServiceError = UploadError::NoFiles.into();
        match err {
            ServiceError::UploadRejected(msg) => assert_eq!(msg, "No files uploaded"),
            other => panic!("expected UploadRejected, got {:?}", other),
        }
    }
}
