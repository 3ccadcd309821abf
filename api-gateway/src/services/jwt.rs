use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ServiceError;
use crate::models::AccountType;

/// Claims carried by an access token. This is the complete claim set: tokens
/// have no `exp`, `iat` or `jti`; validity is decided by the referenced session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    pub user_role: String,
    pub user_type: AccountType,
    pub platform: String,
    pub session_id: Uuid,
}

/// Wire shape accepted on decode. `session_id` is optional here so a missing
/// reference can be told apart from a bad signature.
#[derive(Deserialize)]
struct PresentedClaims {
    sub: Uuid,
    user_role: String,
    user_type: AccountType,
    platform: String,
    #[serde(default)]
    session_id: Option<String>,
}

/// HS256 token issuer/validator keyed by the server secret.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtService {
    pub fn new(secret: &Secret<String>) -> Result<Self, anyhow::Error> {
        let secret = secret.expose_secret();
        if secret.is_empty() {
            anyhow::bail!("JWT secret must not be empty");
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        tracing::info!("JWT service initialized with HS256");

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Sign `claims` into a compact, URL-safe token.
    pub fn issue(&self, claims: &AccessClaims) -> Result<String, ServiceError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Failed to encode token: {}", e)))
    }

    /// Verify the signature and decode the fixed claim set.
    ///
    /// Bad signature, malformed structure or ill-typed claims yield
    /// [`ServiceError::InvalidToken`]; a verified token without a usable
    /// `session_id` yields [`ServiceError::MissingSessionReference`].
    pub fn validate(&self, token: &str) -> Result<AccessClaims, ServiceError> {
        let presented = decode::<PresentedClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                ServiceError::InvalidToken
            })?
            .claims;

        let session_id = presented
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or(ServiceError::MissingSessionReference)?;

        Ok(AccessClaims {
            sub: presented.sub,
            user_role: presented.user_role,
            user_type: presented.user_type,
            platform: presented.platform,
            session_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> JwtService {
        JwtService::new(&Secret::new(secret.to_string())).unwrap()
    }

    fn claims() -> AccessClaims {
        AccessClaims {
            sub: Uuid::new_v4(),
            user_role: "user".to_string(),
            user_type: AccountType::User,
            platform: "web".to_string(),
            session_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_issue_and_validate() -> Result<(), anyhow::Error> {
        let jwt = service("test-secret");
        let claims = claims();

        let token = jwt.issue(&claims)?;
        assert!(!token.contains('+') && !token.contains('/') && !token.contains('='));

        let decoded = jwt.validate(&token)?;
        assert_eq!(decoded, claims);
        Ok(())
    }

    #[test]
    fn test_claim_set_is_exact() -> Result<(), anyhow::Error> {
        let jwt = service("test-secret");
        let token = jwt.issue(&claims())?;

        let payload = token.split('.').nth(1).unwrap();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        let raw = decode::<serde_json::Map<String, serde_json::Value>>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &validation,
        )?
        .claims;

        assert!(!payload.is_empty());
        let mut keys: Vec<_> = raw.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["platform", "session_id", "sub", "user_role", "user_type"]);
        Ok(())
    }

    #[test]
    fn test_wrong_secret_is_invalid() -> Result<(), anyhow::Error> {
        let token = service("secret-a").issue(&claims())?;
        assert!(matches!(
            service("secret-b").validate(&token),
            Err(ServiceError::InvalidToken)
        ));
        assert!(matches!(
            service("secret-a").validate("not.a.token"),
            Err(ServiceError::InvalidToken)
        ));
        Ok(())
    }

    #[test]
    fn test_missing_session_reference() -> Result<(), anyhow::Error> {
        #[derive(Serialize)]
        struct NoSession {
            sub: Uuid,
            user_role: &'static str,
            user_type: &'static str,
            platform: &'static str,
        }

        let token = encode(
            &Header::new(Algorithm::HS256),
            &NoSession {
                sub: Uuid::new_v4(),
                user_role: "user",
                user_type: "user",
                platform: "web",
            },
            &EncodingKey::from_secret(b"test-secret"),
        )?;

        assert!(matches!(
            service("test-secret").validate(&token),
            Err(ServiceError::MissingSessionReference)
        ));
        Ok(())
    }

    #[test]
    fn test_ill_typed_claims_are_invalid() -> Result<(), anyhow::Error> {
        let token = encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({
                "sub": "not-a-uuid",
                "user_role": "user",
                "user_type": "user",
                "platform": "web",
                "session_id": Uuid::new_v4(),
            }),
            &EncodingKey::from_secret(b"test-secret"),
        )?;

        assert!(matches!(
            service("test-secret").validate(&token),
            Err(ServiceError::InvalidToken)
        ));
        Ok(())
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(JwtService::new(&Secret::new(String::new())).is_err());
    }
}
