use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{SanitizedUser, Session};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// Username or email address.
    #[serde(alias = "username", alias = "email")]
    #[validate(length(min = 1, max = 254, message = "Username or email is required"))]
    #[schema(example = "bob")]
    pub identifier: String,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "pw123")]
    pub password: String,

    #[validate(length(min = 1, max = 32, message = "Platform is required"))]
    #[schema(example = "web")]
    pub platform: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(max = 128, message = "Full name is too long"))]
    #[schema(example = "Bob Builder")]
    pub full_name: Option<String>,

    #[validate(custom(
        function = "crate::utils::validation::validate_username",
        message = "Username must be 3-32 letters, digits, '_', '.' or '-'"
    ))]
    #[schema(example = "bob")]
    pub username: String,

    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "bob@x.com")]
    pub email: String,

    #[validate(custom(
        function = "crate::utils::validation::validate_password_shape",
        message = "Password must be 5-128 characters with at least one letter and one digit"
    ))]
    #[schema(example = "pw123", min_length = 5)]
    pub password: String,

    #[validate(length(max = 16))]
    #[schema(example = "male")]
    pub gender: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "User registered successfully, please verify your email address")]
    pub message: String,

    /// Set on flows that mail a verification code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = true)]
    pub email_sent: Option<bool>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            email_sent: None,
        }
    }

    pub fn with_email_sent(mut self, sent: bool) -> Self {
        self.email_sent = Some(sent);
        self
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyEmailRequest {
    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "bob@x.com")]
    pub email: String,

    #[validate(custom(
        function = "crate::utils::validation::validate_otp_code",
        message = "Code must be numeric"
    ))]
    #[serde(alias = "code")]
    #[schema(example = "042917")]
    pub otp: String,

    #[validate(length(min = 1, max = 32, message = "Platform is required"))]
    #[schema(example = "web")]
    pub platform: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResendVerificationRequest {
    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "bob@x.com")]
    pub email: String,
}

/// Successful login or email verification.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: SanitizedUser,
    pub session: Session,
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
}
