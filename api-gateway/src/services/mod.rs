pub mod auth;
pub mod cache;
pub mod credentials;
pub mod email;
pub mod error;
pub mod jwt;
pub mod otp;
pub mod policy;
pub mod session;
pub mod store;

pub use auth::AuthService;
pub use cache::{MockCache, RedisService, SideCache};
pub use credentials::CredentialVerifier;
pub use email::{EmailProvider, EmailService, MockEmailService};
pub use error::ServiceError;
pub use jwt::{AccessClaims, JwtService};
pub use otp::OtpService;
pub use policy::PolicyEngine;
pub use session::SessionManager;
pub use store::{CredentialStore, Database, InMemoryStore, SessionStore, StoreError};
