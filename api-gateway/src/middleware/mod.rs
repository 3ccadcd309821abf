pub mod auth;

pub use auth::{authorization_gate, AuthContext, AuthUser, UNAUTHORIZED_ROLE};
