use service_core::axum::http::StatusCode;
use service_core::error::{codes, AppError};
use thiserror::Error;

use super::store::StoreError;

/// Machine codes specific to the credential pipeline.
pub mod gateway_codes {
    pub const INVALID_CREDENTIALS: &str = "INVALID_CREDENTIALS";
    pub const OTP_MISMATCH: &str = "OTP_MISMATCH";
    pub const OTP_EXPIRED: &str = "OTP_EXPIRED";
    pub const OTP_ATTEMPTS_EXCEEDED: &str = "OTP_ATTEMPTS_EXCEEDED";
    pub const INVALID_TOKEN: &str = "INVALID_TOKEN";
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Account type cannot use the requested login platform.
    #[error("{0}")]
    PlatformMismatch(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("Incorrect password")]
    InvalidCredentials,

    #[error("Incorrect otp")]
    OtpMismatch,

    #[error("OTP expired or not found")]
    OtpExpiredOrMissing,

    /// Too many wrong guesses; the code has been invalidated.
    #[error("Too many incorrect otp attempts")]
    OtpAttemptsExceeded,

    #[error("Invalid token")]
    InvalidToken,

    /// Signature verified but the token names no usable session.
    #[error("Token carries no session reference")]
    MissingSessionReference,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => {
                ServiceError::Conflict(format!("{} already exists", what))
            }
            StoreError::Backend(e) => ServiceError::Internal(e),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(what) => AppError::NotFound(anyhow::anyhow!("{} not found", what)),
            ServiceError::PlatformMismatch(msg) => AppError::Rejected {
                status: StatusCode::BAD_REQUEST,
                code: codes::FORBIDDEN,
                message: msg.to_string(),
            },
            ServiceError::Forbidden(msg) => AppError::Forbidden(anyhow::anyhow!(msg)),
            ServiceError::InvalidCredentials => AppError::Rejected {
                status: StatusCode::BAD_REQUEST,
                code: gateway_codes::INVALID_CREDENTIALS,
                message: "Incorrect password".to_string(),
            },
            ServiceError::OtpMismatch => AppError::Rejected {
                status: StatusCode::BAD_REQUEST,
                code: gateway_codes::OTP_MISMATCH,
                message: "Incorrect otp".to_string(),
            },
            ServiceError::OtpExpiredOrMissing => AppError::Rejected {
                status: StatusCode::BAD_REQUEST,
                code: gateway_codes::OTP_EXPIRED,
                message: "OTP expired or not found".to_string(),
            },
            ServiceError::OtpAttemptsExceeded => AppError::Rejected {
                status: StatusCode::BAD_REQUEST,
                code: gateway_codes::OTP_ATTEMPTS_EXCEEDED,
                message: "Too many incorrect otp attempts, request a new code".to_string(),
            },
            ServiceError::InvalidToken => AppError::Rejected {
                status: StatusCode::UNAUTHORIZED,
                code: gateway_codes::INVALID_TOKEN,
                message: "Invalid token".to_string(),
            },
            ServiceError::MissingSessionReference => AppError::Rejected {
                status: StatusCode::BAD_REQUEST,
                code: gateway_codes::INVALID_TOKEN,
                message: "Token carries no session reference".to_string(),
            },
            ServiceError::BadRequest(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::Unauthorized(msg) => AppError::Unauthorized(anyhow::anyhow!(msg)),
            ServiceError::Conflict(msg) => AppError::Conflict(anyhow::anyhow!(msg)),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_mismatch_is_bad_request_with_forbidden_code() {
        let err: AppError =
            ServiceError::PlatformMismatch("User can't login to admin web").into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "FORBIDDEN");
    }

    #[test]
    fn test_duplicate_record_is_conflict() {
        let err: AppError = ServiceError::from(StoreError::Duplicate("user")).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_store_backend_failure_is_internal() {
        let err: AppError =
            ServiceError::from(StoreError::Backend(anyhow::anyhow!("connection reset"))).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "INTERNAL_SERVER");
    }
}
