use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::{store::SessionStore, ServiceError};
use crate::models::{NewSession, Session, SessionPatch};
use crate::utils::ClientInfo;

/// Session lifecycle: create, read, revise, heartbeat, delete.
///
/// Nothing is cached in-process; every read goes to the store so a
/// revocation is visible to the very next request.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    lifetime: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, lifetime: Duration) -> Self {
        Self { store, lifetime }
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.lifetime)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        client: &ClientInfo,
        platform: &str,
    ) -> Result<Session, ServiceError> {
        let session = self
            .store
            .create_session(NewSession {
                user_id,
                ip_address: client.ip_address.clone(),
                user_agent: client.user_agent.clone(),
                platform: platform.to_string(),
                expires_at: self.expiry_from(Utc::now()),
            })
            .await
            .map_err(|e| {
                tracing::error!(error = %e, user_id = %user_id, "Error while creating new session");
                ServiceError::from(e)
            })?;

        tracing::info!(user_id = %user_id, session_id = %session.id, platform = %platform, "Session created");
        Ok(session)
    }

    pub async fn get(&self, id: Uuid) -> Result<Session, ServiceError> {
        self.store
            .get_session(id)
            .await?
            .ok_or(ServiceError::NotFound("Session"))
    }

    /// Partial update; fields left `None` in `patch` keep their stored values.
    ///
    /// Deactivation is one-way: asking to activate an inactive session is a
    /// conflict, and activating an active one is a no-op.
    pub async fn update(&self, id: Uuid, mut patch: SessionPatch) -> Result<Session, ServiceError> {
        if patch.is_active == Some(true) {
            let current = self.get(id).await?;
            if !current.is_active {
                tracing::warn!(session_id = %id, "Refused to reactivate an inactive session");
                return Err(ServiceError::Conflict(
                    "Session is no longer active and cannot be reactivated".to_string(),
                ));
            }
            patch.is_active = None;
        }

        if patch.is_empty() {
            return self.get(id).await;
        }

        let session = self
            .store
            .update_session(id, patch)
            .await?
            .ok_or(ServiceError::NotFound("Session"))?;

        tracing::info!(session_id = %id, is_active = session.is_active, "Session updated");
        Ok(session)
    }

    /// Advance `last_active_at`; the activity flag is left as stored.
    pub async fn heartbeat(&self, id: Uuid) -> Result<Session, ServiceError> {
        self.update(
            id,
            SessionPatch {
                last_active_at: Some(Utc::now()),
                ..Default::default()
            },
        )
        .await
    }

    /// Mark inactive without deleting, e.g. administrative revocation.
    pub async fn deactivate(&self, id: Uuid) -> Result<Session, ServiceError> {
        self.update(
            id,
            SessionPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    /// Idempotent; only a store failure is an error.
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.store.delete_session(id).await.map_err(|e| {
            tracing::error!(error = %e, session_id = %id, "Error deleting session");
            ServiceError::from(e)
        })?;

        tracing::info!(session_id = %id, "Session deleted");
        Ok(())
    }
}
