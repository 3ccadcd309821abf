pub mod session;
pub mod user;

pub use session::{NewSession, Session, SessionPatch};
pub use user::{
    AccountType, NewUser, SanitizedUser, User, UserPatch, UserStatus, ADMIN_PLATFORM,
    DEFAULT_USER_ROLE,
};
