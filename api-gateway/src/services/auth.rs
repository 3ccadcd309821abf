use std::sync::Arc;
use uuid::Uuid;

use super::{
    credentials::{check_platform, CredentialVerifier},
    email::EmailProvider,
    jwt::{AccessClaims, JwtService},
    otp::OtpService,
    session::SessionManager,
    store::CredentialStore,
    ServiceError,
};
use crate::dtos::auth::{
    AuthResponse, LoginRequest, MessageResponse, RegisterRequest, ResendVerificationRequest,
    VerifyEmailRequest,
};
use crate::dtos::user::{CreateUserRequest, UpdateUserRequest};
use crate::models::{AccountType, NewUser, User, UserPatch, UserStatus, DEFAULT_USER_ROLE};
use crate::utils::{hash_password, ClientInfo, Password, PasswordHashString};

pub const REGISTERED_MESSAGE: &str =
    "User registered successfully, please verify your email address";
pub const REGISTERED_UNSENT_MESSAGE: &str =
    "User registered, but the verification email could not be sent; please request a new code";
pub const RESENT_MESSAGE: &str = "Verification code sent, please check your email";
pub const LOGGED_OUT_MESSAGE: &str = "Successfully logged out";

/// Login, registration, email verification and logout flows.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn CredentialStore>,
    verifier: CredentialVerifier,
    otp: OtpService,
    sessions: SessionManager,
    jwt: JwtService,
    email: Arc<dyn EmailProvider>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        otp: OtpService,
        sessions: SessionManager,
        jwt: JwtService,
        email: Arc<dyn EmailProvider>,
    ) -> Self {
        Self {
            verifier: CredentialVerifier::new(users.clone()),
            users,
            otp,
            sessions,
            jwt,
            email,
        }
    }

    pub async fn login(
        &self,
        req: LoginRequest,
        client: &ClientInfo,
    ) -> Result<AuthResponse, ServiceError> {
        let identifier = req.identifier.trim();
        let user = self
            .verifier
            .verify(identifier, &Password::new(req.password), &req.platform)
            .await?;

        let response = self.start_session(user, &req.platform, client).await?;
        tracing::info!(user_id = %response.user.id, platform = %req.platform, "User logged in");
        Ok(response)
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<MessageResponse, ServiceError> {
        let email = normalize_email(&req.email);
        let username = req.username.trim().to_string();

        if self.users.find_by_identifier(&username).await?.is_some()
            || self.users.find_by_email(&email).await?.is_some()
        {
            return Err(ServiceError::Conflict("User already exists".to_string()));
        }

        let password_hash = hash_off_thread(req.password).await?;

        let user = self
            .users
            .create_user(NewUser {
                full_name: req
                    .full_name
                    .map(|n| n.trim().to_string())
                    .unwrap_or_default(),
                username,
                email,
                password_hash,
                gender: req.gender,
                user_type: AccountType::User,
                user_role: DEFAULT_USER_ROLE.to_string(),
                status: UserStatus::PendingVerification,
            })
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Error creating user");
                ServiceError::from(e)
            })?;

        tracing::info!(user_id = %user.id, "User registered, pending verification");

        let sent = self.send_code(&user).await?;
        let message = if sent {
            REGISTERED_MESSAGE
        } else {
            REGISTERED_UNSENT_MESSAGE
        };

        Ok(MessageResponse::new(message).with_email_sent(sent))
    }

    /// Check the emailed code, activate the account and open a session.
    pub async fn verify_email(
        &self,
        req: VerifyEmailRequest,
        client: &ClientInfo,
    ) -> Result<AuthResponse, ServiceError> {
        let email = normalize_email(&req.email);

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(ServiceError::NotFound("User"))?;

        check_platform(user.user_type, &req.platform)?;

        self.otp.check(&user.email, req.otp.trim()).await?;

        let user = match user.status {
            UserStatus::Active => user,
            UserStatus::PendingVerification => self
                .users
                .set_status(user.id, UserStatus::Active)
                .await?
                .ok_or(ServiceError::NotFound("User"))?,
        };

        tracing::info!(user_id = %user.id, "Email verified");
        self.start_session(user, &req.platform, client).await
    }

    /// Replace the pending code with a fresh one and email it again.
    pub async fn resend_verification(
        &self,
        req: ResendVerificationRequest,
    ) -> Result<MessageResponse, ServiceError> {
        let email = normalize_email(&req.email);

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(ServiceError::NotFound("User"))?;

        if user.status == UserStatus::Active {
            return Err(ServiceError::Conflict("Email already verified".to_string()));
        }

        if !self.send_code(&user).await? {
            return Err(ServiceError::Internal(anyhow::anyhow!(
                "Error sending OTP email"
            )));
        }
        Ok(MessageResponse::new(RESENT_MESSAGE).with_email_sent(true))
    }

    pub async fn logout(&self, session_id: Uuid) -> Result<MessageResponse, ServiceError> {
        self.sessions.delete(session_id).await?;
        Ok(MessageResponse::new(LOGGED_OUT_MESSAGE))
    }

    /// Revise a profile; the supplied password replaces the stored hash.
    pub async fn update_user(
        &self,
        user_id: Uuid,
        req: UpdateUserRequest,
    ) -> Result<User, ServiceError> {
        let password_hash = hash_off_thread(req.password).await?;

        let user = self
            .users
            .update_user(
                user_id,
                UserPatch {
                    full_name: req.full_name.map(|n| n.trim().to_string()),
                    username: req.username.map(|n| n.trim().to_string()),
                    password_hash: Some(password_hash),
                    gender: req.gender,
                },
            )
            .await
            .map_err(|e| {
                tracing::warn!(user_id = %user_id, error = %e, "Error updating user");
                ServiceError::from(e)
            })?
            .ok_or(ServiceError::NotFound("User"))?;

        tracing::info!(user_id = %user.id, "User updated");
        Ok(user)
    }

    /// Create an already-active account on an administrator's behalf.
    pub async fn provision_user(&self, req: CreateUserRequest) -> Result<User, ServiceError> {
        let email = normalize_email(&req.email);
        let password_hash = hash_off_thread(req.password).await?;

        let user = self
            .users
            .create_user(NewUser {
                full_name: req
                    .full_name
                    .map(|n| n.trim().to_string())
                    .unwrap_or_default(),
                username: req.username.trim().to_string(),
                email,
                password_hash,
                gender: req.gender,
                user_type: req.user_type.unwrap_or(AccountType::User),
                user_role: req
                    .user_role
                    .unwrap_or_else(|| DEFAULT_USER_ROLE.to_string()),
                status: UserStatus::Active,
            })
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Error creating user");
                ServiceError::from(e)
            })?;

        tracing::info!(user_id = %user.id, user_type = %user.user_type, "User provisioned");
        Ok(user)
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<User, ServiceError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(ServiceError::NotFound("User"))
    }

    /// Issue a code and mail it; `false` when delivery failed.
    async fn send_code(&self, user: &User) -> Result<bool, ServiceError> {
        let code = self.otp.issue(&user.email).await?;

        match self.email.send_otp_email(&user.email, &code).await {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::error!(user_id = %user.id, error = %e, "Error sending OTP");
                Ok(false)
            }
        }
    }

    async fn start_session(
        &self,
        user: User,
        platform: &str,
        client: &ClientInfo,
    ) -> Result<AuthResponse, ServiceError> {
        let session = self.sessions.create(user.id, client, platform).await?;

        let access_token = self.jwt.issue(&AccessClaims {
            sub: user.id,
            user_role: user.user_role.clone(),
            user_type: user.user_type,
            platform: platform.to_string(),
            session_id: session.id,
        })?;

        Ok(AuthResponse {
            user: user.into(),
            session,
            access_token,
        })
    }
}

/// Hash on the blocking pool.
async fn hash_off_thread(password: String) -> Result<PasswordHashString, ServiceError> {
    let password = Password::new(password);
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ServiceError::Internal(e.into()))??;
    Ok(hash)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
