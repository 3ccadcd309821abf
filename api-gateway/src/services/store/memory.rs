use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard,
};
use uuid::Uuid;

use super::{CredentialStore, SessionStore, StoreError};
use crate::models::{NewSession, NewUser, Session, SessionPatch, User, UserPatch, UserStatus};

/// Process-local store with the same uniqueness rules as the Postgres schema.
#[derive(Default)]
pub struct InMemoryStore {
    users: Mutex<HashMap<Uuid, User>>,
    sessions: Mutex<HashMap<Uuid, Session>>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as a backend outage would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or_default()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(anyhow::anyhow!("store unavailable")));
        }
        Ok(())
    }

    fn users(&self) -> Result<MutexGuard<'_, HashMap<Uuid, User>>, StoreError> {
        self.check_available()?;
        self.users
            .lock()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("user map lock poisoned")))
    }

    fn sessions(&self) -> Result<MutexGuard<'_, HashMap<Uuid, Session>>, StoreError> {
        self.check_available()?;
        self.sessions
            .lock()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("session map lock poisoned")))
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        let users = self.users()?;
        let by_username = users.values().find(|u| u.username == identifier);
        let found = by_username.or_else(|| {
            users
                .values()
                .find(|u| u.email.eq_ignore_ascii_case(identifier))
        });
        Ok(found.cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users()?;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users()?.get(&id).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users()?;

        if users.values().any(|u| {
            u.username == user.username || u.email.eq_ignore_ascii_case(&user.email)
        }) {
            return Err(StoreError::Duplicate("user"));
        }

        let now = Utc::now();
        let record = User {
            id: Uuid::new_v4(),
            full_name: user.full_name,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            gender: user.gender,
            user_type: user.user_type,
            user_role: user.user_role,
            status: user.status,
            created_at: now,
            updated_at: now,
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn set_status(&self, id: Uuid, status: UserStatus) -> Result<Option<User>, StoreError> {
        let mut users = self.users()?;
        Ok(users.get_mut(&id).map(|user| {
            user.status = status;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let mut users = self.users()?;

        if let Some(username) = &patch.username {
            if users.values().any(|u| u.id != id && &u.username == username) {
                return Err(StoreError::Duplicate("user"));
            }
        }

        Ok(users.get_mut(&id).map(|user| {
            patch.apply(user, Utc::now());
            user.clone()
        }))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn create_session(&self, session: NewSession) -> Result<Session, StoreError> {
        let now = Utc::now();
        let record = Session {
            id: Uuid::new_v4(),
            user_id: session.user_id,
            ip_address: session.ip_address,
            user_agent: session.user_agent,
            platform: session.platform,
            is_active: true,
            expires_at: session.expires_at,
            last_active_at: now,
            created_at: now,
            updated_at: now,
        };
        self.sessions()?.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions()?.get(&id).cloned())
    }

    async fn update_session(
        &self,
        id: Uuid,
        patch: SessionPatch,
    ) -> Result<Option<Session>, StoreError> {
        let mut sessions = self.sessions()?;
        Ok(sessions.get_mut(&id).map(|session| {
            patch.apply(session, Utc::now());
            session.clone()
        }))
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), StoreError> {
        self.sessions()?.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccountType;
    use crate::utils::PasswordHashString;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            full_name: String::new(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: PasswordHashString::new("hash".to_string()),
            gender: None,
            user_type: AccountType::User,
            user_role: "user".to_string(),
            status: UserStatus::PendingVerification,
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_or_email_rejected() {
        let store = InMemoryStore::new();
        store.create_user(new_user("bob", "bob@x.com")).await.unwrap();

        assert!(matches!(
            store.create_user(new_user("bob", "other@x.com")).await,
            Err(StoreError::Duplicate("user"))
        ));
        assert!(matches!(
            store.create_user(new_user("robert", "BOB@x.com")).await,
            Err(StoreError::Duplicate("user"))
        ));
    }

    #[tokio::test]
    async fn test_find_by_identifier_matches_username_or_email() {
        let store = InMemoryStore::new();
        let user = store.create_user(new_user("bob", "bob@x.com")).await.unwrap();

        let by_name = store.find_by_identifier("bob").await.unwrap().unwrap();
        let by_email = store.find_by_identifier("Bob@X.com").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert_eq!(by_email.id, user.id);
        assert!(store.find_by_identifier("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_user_keeps_usernames_unique() {
        let store = InMemoryStore::new();
        let bob = store.create_user(new_user("bob", "bob@x.com")).await.unwrap();
        store.create_user(new_user("alice", "alice@x.com")).await.unwrap();

        assert!(matches!(
            store
                .update_user(
                    bob.id,
                    UserPatch {
                        username: Some("alice".to_string()),
                        ..Default::default()
                    },
                )
                .await,
            Err(StoreError::Duplicate("user"))
        ));

        let updated = store
            .update_user(
                bob.id,
                UserPatch {
                    username: Some("bob".to_string()),
                    full_name: Some("Bob".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.full_name, "Bob");
        assert_eq!(updated.email, "bob@x.com");

        assert!(store
            .update_user(Uuid::new_v4(), UserPatch::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent_and_outage_is_reported() {
        let store = InMemoryStore::new();
        store.delete_session(Uuid::new_v4()).await.unwrap();

        store.set_unavailable(true);
        assert!(matches!(
            store.get_session(Uuid::new_v4()).await,
            Err(StoreError::Backend(_))
        ));
    }
}
