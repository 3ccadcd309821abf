use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::AccountType;

/// Profile revision. A new password is always required and is re-hashed.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(max = 128, message = "Full name is too long"))]
    #[schema(example = "Bob Builder")]
    pub full_name: Option<String>,

    #[validate(custom(
        function = "crate::utils::validation::validate_username",
        message = "Username must be 3-32 letters, digits, '_', '.' or '-'"
    ))]
    #[schema(example = "bob")]
    pub username: Option<String>,

    #[validate(custom(
        function = "crate::utils::validation::validate_password_shape",
        message = "Password must be 5-128 characters with at least one letter and one digit"
    ))]
    #[schema(example = "pw456")]
    pub password: String,

    #[validate(length(max = 16))]
    #[schema(example = "male")]
    pub gender: Option<String>,
}

/// Account provisioned directly by an administrator; it starts active.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(max = 128, message = "Full name is too long"))]
    #[schema(example = "Carol Ops")]
    pub full_name: Option<String>,

    #[validate(custom(
        function = "crate::utils::validation::validate_username",
        message = "Username must be 3-32 letters, digits, '_', '.' or '-'"
    ))]
    #[schema(example = "carol")]
    pub username: String,

    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "carol@x.com")]
    pub email: String,

    #[validate(custom(
        function = "crate::utils::validation::validate_password_shape",
        message = "Password must be 5-128 characters with at least one letter and one digit"
    ))]
    #[schema(example = "pw123")]
    pub password: String,

    #[validate(length(max = 16))]
    pub gender: Option<String>,

    #[serde(default)]
    pub user_type: Option<AccountType>,

    #[validate(length(min = 1, max = 32, message = "Role must be 1-32 characters"))]
    #[schema(example = "user")]
    pub user_role: Option<String>,
}
