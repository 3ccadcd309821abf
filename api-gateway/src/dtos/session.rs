use serde::Deserialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::models::SessionPatch;

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSessionRequest {
    #[schema(example = false)]
    pub is_active: Option<bool>,

    #[validate(custom(function = "validate_ip", message = "Invalid IP address"))]
    #[schema(example = "203.0.113.7")]
    pub ip_address: Option<String>,
}

fn validate_ip(ip: &str) -> Result<(), ValidationError> {
    ip.parse::<std::net::IpAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_ip"))
}

impl From<UpdateSessionRequest> for SessionPatch {
    fn from(req: UpdateSessionRequest) -> Self {
        SessionPatch {
            is_active: req.is_active,
            ip_address: req.ip_address,
            last_active_at: None,
        }
    }
}
