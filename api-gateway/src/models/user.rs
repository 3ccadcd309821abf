use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::utils::PasswordHashString;

/// Login surface reserved for administrative accounts.
pub const ADMIN_PLATFORM: &str = "admin";

/// Role given to self-registered accounts.
pub const DEFAULT_USER_ROLE: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    User,
    Admin,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::User => "user",
            AccountType::Admin => "admin",
        }
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(AccountType::User),
            "admin" => Ok(AccountType::Admin),
            other => Err(format!("Unknown account type: {}", other)),
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum UserStatus {
    /// Registered, waiting for the emailed code.
    #[serde(rename = "inverify")]
    PendingVerification,
    #[serde(rename = "active")]
    Active,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::PendingVerification => "inverify",
            UserStatus::Active => "active",
        }
    }
}

impl std::str::FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inverify" => Ok(UserStatus::PendingVerification),
            "active" => Ok(UserStatus::Active),
            other => Err(format!("Unknown user status: {}", other)),
        }
    }
}

/// User record as held by the credential store.
///
/// Not serializable: responses go through [`SanitizedUser`], which has no hash field.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: PasswordHashString,
    pub gender: Option<String>,
    pub user_type: AccountType,
    pub user_role: String,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a user; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: PasswordHashString,
    pub gender: Option<String>,
    pub user_type: AccountType,
    pub user_role: String,
    pub status: UserStatus,
}

/// Profile revision; `None` fields keep their stored values.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub password_hash: Option<PasswordHashString>,
    pub gender: Option<String>,
}

impl UserPatch {
    /// Apply to an in-memory copy; mirrors the SQL `COALESCE` update.
    pub fn apply(self, user: &mut User, now: DateTime<Utc>) {
        if let Some(full_name) = self.full_name {
            user.full_name = full_name;
        }
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(password_hash) = self.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(gender) = self.gender {
            user.gender = Some(gender);
        }
        user.updated_at = now;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SanitizedUser {
    pub id: Uuid,
    #[schema(example = "Bob Builder")]
    pub full_name: String,
    #[schema(example = "bob")]
    pub username: String,
    #[schema(example = "bob@example.com")]
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    pub user_type: AccountType,
    #[schema(example = "user")]
    pub user_role: String,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for SanitizedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            gender: user.gender.clone(),
            user_type: user.user_type,
            user_role: user.user_role.clone(),
            status: user.status,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<User> for SanitizedUser {
    fn from(user: User) -> Self {
        SanitizedUser::from(&user)
    }
}
