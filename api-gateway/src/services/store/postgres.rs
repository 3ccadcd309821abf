use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{CredentialStore, SessionStore, StoreError};
use crate::models::{NewSession, NewUser, Session, SessionPatch, User, UserPatch, UserStatus};
use crate::utils::PasswordHashString;

const USER_COLUMNS: &str = "id, user_type, user_role, full_name, user_name, email, password, \
                            gender, status, created_at, updated_at";

const SESSION_COLUMNS: &str = "id, user_id, ip_address, user_agent, platform, is_active, \
                               expires_at, last_active_at, created_at, updated_at";

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    user_type: String,
    user_role: String,
    full_name: String,
    user_name: String,
    email: String,
    password: String,
    gender: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            full_name: row.full_name,
            username: row.user_name,
            email: row.email,
            password_hash: PasswordHashString::new(row.password),
            gender: row.gender,
            user_type: row.user_type.parse().map_err(|e: String| anyhow::anyhow!(e))?,
            user_role: row.user_role,
            status: row.status.parse().map_err(|e: String| anyhow::anyhow!(e))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct SessionRow {
    id: Uuid,
    user_id: Uuid,
    ip_address: String,
    user_agent: String,
    platform: String,
    is_active: bool,
    expires_at: DateTime<Utc>,
    last_active_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            id: row.id,
            user_id: row.user_id,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            platform: row.platform,
            is_active: row.is_active,
            expires_at: row.expires_at,
            last_active_at: row.last_active_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(anyhow::Error::new(err))
}

fn map_insert_error(err: sqlx::Error, what: &'static str) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Duplicate(what)
        }
        _ => backend(err),
    }
}

#[async_trait]
impl CredentialStore for Database {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE user_name = $1 OR LOWER(email) = LOWER($1) \
             ORDER BY (user_name = $1) DESC LIMIT 1"
        );

        sqlx::query_as::<_, UserRow>(&query)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");

        sqlx::query_as::<_, UserRow>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(User::try_from)
            .transpose()
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let query = format!(
            "INSERT INTO users \
             (id, user_type, user_role, full_name, user_name, email, password, gender, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {USER_COLUMNS}"
        );

        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(Uuid::new_v4())
            .bind(user.user_type.as_str())
            .bind(&user.user_role)
            .bind(&user.full_name)
            .bind(&user.username)
            .bind(&user.email)
            .bind(user.password_hash.as_str())
            .bind(&user.gender)
            .bind(user.status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_insert_error(e, "user"))?;

        User::try_from(row)
    }

    async fn set_status(&self, id: Uuid, status: UserStatus) -> Result<Option<User>, StoreError> {
        let query = format!(
            "UPDATE users SET status = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(User::try_from)
            .transpose()
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let query = format!(
            "UPDATE users SET \
             full_name = COALESCE($2, full_name), \
             user_name = COALESCE($3, user_name), \
             password = COALESCE($4, password), \
             gender = COALESCE($5, gender), \
             updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .bind(patch.full_name)
            .bind(patch.username)
            .bind(patch.password_hash.map(PasswordHashString::into_string))
            .bind(patch.gender)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_insert_error(e, "user"))?
            .map(User::try_from)
            .transpose()
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(backend)
    }
}

#[async_trait]
impl SessionStore for Database {
    async fn create_session(&self, session: NewSession) -> Result<Session, StoreError> {
        let query = format!(
            "INSERT INTO sessions \
             (id, user_id, ip_address, user_agent, platform, is_active, expires_at, last_active_at) \
             VALUES ($1, $2, $3, $4, $5, TRUE, $6, NOW()) \
             RETURNING {SESSION_COLUMNS}"
        );

        let row = sqlx::query_as::<_, SessionRow>(&query)
            .bind(Uuid::new_v4())
            .bind(session.user_id)
            .bind(&session.ip_address)
            .bind(&session.user_agent)
            .bind(&session.platform)
            .bind(session.expires_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_insert_error(e, "session"))?;

        Ok(row.into())
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, StoreError> {
        let query = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1");

        let row = sqlx::query_as::<_, SessionRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        Ok(row.map(Session::from))
    }

    async fn update_session(
        &self,
        id: Uuid,
        patch: SessionPatch,
    ) -> Result<Option<Session>, StoreError> {
        let query = format!(
            "UPDATE sessions SET \
             is_active = COALESCE($2, is_active), \
             ip_address = COALESCE($3, ip_address), \
             last_active_at = COALESCE($4, last_active_at), \
             updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {SESSION_COLUMNS}"
        );

        let row = sqlx::query_as::<_, SessionRow>(&query)
            .bind(id)
            .bind(patch.is_active)
            .bind(patch.ip_address)
            .bind(patch.last_active_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        Ok(row.map(Session::from))
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(backend)
    }
}
