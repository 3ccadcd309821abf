use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use validator::{Validate, ValidationError};

/// JSON body that has passed its `validator` rules.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| {
                AppError::BadRequest(anyhow::anyhow!("Invalid request body: {}", e.body_text()))
            })?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

/// Usernames: 3-32 characters of ASCII letters, digits, `_`, `.` or `-`.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len_ok = (3..=32).contains(&username.len());
    let chars_ok = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));

    if len_ok && chars_ok {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_username"))
    }
}

/// Passwords: 5-128 characters with at least one letter and one digit.
pub fn validate_password_shape(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if (5..=128).contains(&len) && has_letter && has_digit {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_password"))
    }
}

/// OTP submissions are digits only.
pub fn validate_otp_code(code: &str) -> Result<(), ValidationError> {
    if !code.is_empty() && code.len() <= 10 && code.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_otp"))
    }
}
