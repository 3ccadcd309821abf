pub mod client_info;
pub mod password;
pub mod validation;

pub use client_info::ClientInfo;
pub use password::{hash_password, verify_password, Password, PasswordHashString};
pub use validation::ValidatedJson;
