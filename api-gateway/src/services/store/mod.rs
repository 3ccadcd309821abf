//! Record stores behind the credential pipeline.
//!
//! Both traits are implemented by [`Database`] (Postgres) and by
//! [`InMemoryStore`] (tests, local runs).

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::Database;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NewSession, NewUser, Session, SessionPatch, User, UserPatch, UserStatus};

#[derive(Error, Debug)]
pub enum StoreError {
    /// Unique constraint hit; carries the record kind.
    #[error("duplicate {0}")]
    Duplicate(&'static str),

    #[error("store failure: {0}")]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up by username, then by email (case-insensitive).
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn set_status(&self, id: Uuid, status: UserStatus) -> Result<Option<User>, StoreError>;

    /// Apply `patch`; `None` when no user has this id. A username already
    /// held by another account is `Duplicate`.
    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: NewSession) -> Result<Session, StoreError>;

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, StoreError>;

    /// Apply `patch`; `None` when no session has this id.
    async fn update_session(
        &self,
        id: Uuid,
        patch: SessionPatch,
    ) -> Result<Option<Session>, StoreError>;

    /// Removing an absent id is not an error.
    async fn delete_session(&self, id: Uuid) -> Result<(), StoreError>;
}
