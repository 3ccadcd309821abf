use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Server-held login session. Every token references exactly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "203.0.113.7")]
    pub ip_address: String,
    #[schema(example = "Mozilla/5.0")]
    pub user_agent: String,
    #[schema(example = "web")]
    pub platform: String,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// A session grants access only while active and unexpired. Expiry is never
    /// written back; it is evaluated against `now` on each check.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at > now
    }
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: Uuid,
    pub ip_address: String,
    pub user_agent: String,
    pub platform: String,
    pub expires_at: DateTime<Utc>,
}

/// Partial revision of a session. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
    pub is_active: Option<bool>,
    pub ip_address: Option<String>,
    pub last_active_at: Option<DateTime<Utc>>,
}

impl SessionPatch {
    pub fn is_empty(&self) -> bool {
        self.is_active.is_none() && self.ip_address.is_none() && self.last_active_at.is_none()
    }

    /// Apply to an in-memory copy; mirrors the SQL `COALESCE` update.
    pub fn apply(self, session: &mut Session, now: DateTime<Utc>) {
        if let Some(is_active) = self.is_active {
            session.is_active = is_active;
        }
        if let Some(ip_address) = self.ip_address {
            session.ip_address = ip_address;
        }
        if let Some(last_active_at) = self.last_active_at {
            session.last_active_at = last_active_at;
        }
        session.updated_at = now;
    }
}
