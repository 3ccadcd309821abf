pub mod auth;
pub mod sessions;
pub mod user;

pub use auth::*;
pub use sessions::{delete_session, get_session, heartbeat, update_session};
pub use user::{create_user, get_me, update_me, update_user};
