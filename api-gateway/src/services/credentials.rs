use std::sync::Arc;

use super::{store::CredentialStore, ServiceError};
use crate::models::{AccountType, User, ADMIN_PLATFORM};
use crate::utils::{verify_password, Password};

/// Platform eligibility: regular accounts stay off the admin surface and
/// admin accounts stay on it.
pub fn check_platform(user_type: AccountType, platform: &str) -> Result<(), ServiceError> {
    match user_type {
        AccountType::User if platform == ADMIN_PLATFORM => Err(ServiceError::PlatformMismatch(
            "User can't login to admin web",
        )),
        AccountType::Admin if platform != ADMIN_PLATFORM => Err(ServiceError::PlatformMismatch(
            "Admin can only login to admin web",
        )),
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct CredentialVerifier {
    store: Arc<dyn CredentialStore>,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Resolve `identifier` to a user and verify `password`.
    ///
    /// Platform eligibility is decided before the password is looked at, so a
    /// mismatch reveals nothing about the password.
    pub async fn verify(
        &self,
        identifier: &str,
        password: &Password,
        platform: &str,
    ) -> Result<User, ServiceError> {
        let user = self
            .store
            .find_by_identifier(identifier)
            .await?
            .ok_or(ServiceError::NotFound("User"))?;

        if let Err(e) = check_platform(user.user_type, platform) {
            tracing::warn!(user_id = %user.id, platform = %platform, "Login refused on platform");
            return Err(e);
        }

        let password = password.clone();
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| ServiceError::Internal(e.into()))??;

        if !matches {
            tracing::info!(user_id = %user.id, "Incorrect password");
            return Err(ServiceError::InvalidCredentials);
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, UserStatus};
    use crate::services::store::InMemoryStore;
    use crate::utils::hash_password;

    async fn verifier_with(user_type: AccountType) -> CredentialVerifier {
        let store = Arc::new(InMemoryStore::new());
        store
            .create_user(NewUser {
                full_name: "Bob".to_string(),
                username: "bob".to_string(),
                email: "bob@x.com".to_string(),
                password_hash: hash_password(&Password::new("pw123".to_string())).unwrap(),
                gender: None,
                user_type,
                user_role: user_type.as_str().to_string(),
                status: UserStatus::Active,
            })
            .await
            .unwrap();
        CredentialVerifier::new(store)
    }

    fn pw(s: &str) -> Password {
        Password::new(s.to_string())
    }

    #[tokio::test]
    async fn test_valid_credentials_by_username_or_email() {
        let verifier = verifier_with(AccountType::User).await;
        let by_name = verifier.verify("bob", &pw("pw123"), "web").await.unwrap();
        let by_email = verifier.verify("bob@x.com", &pw("pw123"), "web").await.unwrap();
        assert_eq!(by_name.id, by_email.id);
    }

    #[tokio::test]
    async fn test_unknown_identifier_is_not_found() {
        let verifier = verifier_with(AccountType::User).await;
        assert!(matches!(
            verifier.verify("alice", &pw("pw123"), "web").await,
            Err(ServiceError::NotFound("User"))
        ));
    }

    #[tokio::test]
    async fn test_wrong_password_is_invalid_credentials() {
        let verifier = verifier_with(AccountType::User).await;
        assert!(matches!(
            verifier.verify("bob", &pw("pw124"), "web").await,
            Err(ServiceError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_platform_mismatch_regardless_of_password() {
        let user = verifier_with(AccountType::User).await;
        for password in ["pw123", "wrong1"] {
            assert!(matches!(
                user.verify("bob", &pw(password), ADMIN_PLATFORM).await,
                Err(ServiceError::PlatformMismatch(_))
            ));
        }

        let admin = verifier_with(AccountType::Admin).await;
        for password in ["pw123", "wrong1"] {
            assert!(matches!(
                admin.verify("bob", &pw(password), "web").await,
                Err(ServiceError::PlatformMismatch(_))
            ));
        }
        assert!(admin.verify("bob", &pw("pw123"), ADMIN_PLATFORM).await.is_ok());
    }
}
