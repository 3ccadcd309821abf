use axum::{
    extract::{FromRequestParts, MatchedPath, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use service_core::error::{codes, AppError};

use crate::{
    models::Session,
    services::{AccessClaims, ServiceError},
    AppState,
};

/// Role evaluated for requests without a usable token.
pub const UNAUTHORIZED_ROLE: &str = "unauthorized";

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const USER_TYPE_HEADER: &str = "x-user-type";
pub const PLATFORM_HEADER: &str = "x-platform";
pub const SESSION_ID_HEADER: &str = "x-session-id";

const CLAIM_HEADERS: [&str; 5] = [
    USER_ID_HEADER,
    USER_ROLE_HEADER,
    USER_TYPE_HEADER,
    PLATFORM_HEADER,
    SESSION_ID_HEADER,
];

/// Verified identity of the caller, attached to the request by the gate.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: AccessClaims,
    pub session: Session,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the caller's claims. `Ok(None)` means the request is anonymous.
fn resolve_claims(state: &AppState, headers: &HeaderMap) -> Result<Option<AccessClaims>, AppError> {
    let Some(token) = bearer_token(headers) else {
        return Ok(None);
    };

    match state.jwt.validate(token) {
        Ok(claims) => Ok(Some(claims)),
        Err(ServiceError::MissingSessionReference) => {
            tracing::warn!("Token without session reference");
            Err(AppError::BadRequest(anyhow::anyhow!("Invalid token")))
        }
        Err(e) => {
            tracing::debug!(error = %e, "Token rejected, continuing as anonymous");
            Ok(None)
        }
    }
}

async fn live_session(state: &AppState, claims: &AccessClaims) -> Result<Session, AppError> {
    let session = match state.sessions.get(claims.session_id).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(session_id = %claims.session_id, error = %e, "Session lookup failed");
            return Err(AppError::BadRequest(anyhow::anyhow!("Invalid session ID")));
        }
    };

    if session.user_id != claims.sub {
        tracing::warn!(
            session_id = %session.id,
            user_id = %claims.sub,
            "Session belongs to another user"
        );
        return Err(AppError::BadRequest(anyhow::anyhow!("Invalid session ID")));
    }

    if !session.is_live(Utc::now()) {
        return Err(AppError::Unauthorized(anyhow::anyhow!("Session is not active")));
    }

    Ok(session)
}

fn insert_claim_headers(headers: &mut HeaderMap, claims: &AccessClaims) -> Result<(), AppError> {
    let values = [
        (USER_ID_HEADER, claims.sub.to_string()),
        (USER_ROLE_HEADER, claims.user_role.clone()),
        (USER_TYPE_HEADER, claims.user_type.to_string()),
        (PLATFORM_HEADER, claims.platform.clone()),
        (SESSION_ID_HEADER, claims.session_id.to_string()),
    ];

    for (name, value) in values {
        let value = HeaderValue::from_str(&value)
            .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Invalid token")))?;
        headers.insert(HeaderName::from_static(name), value);
    }
    Ok(())
}

/// Token, then session, then policy. Anything not explicitly allowed is refused.
pub async fn authorization_gate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    for name in CLAIM_HEADERS {
        req.headers_mut().remove(name);
    }

    let claims = resolve_claims(&state, req.headers())?;

    let session = match &claims {
        Some(claims) => Some(live_session(&state, claims).await?),
        None => None,
    };

    let role = claims
        .as_ref()
        .map(|c| c.user_role.as_str())
        .unwrap_or(UNAUTHORIZED_ROLE);

    let resource = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let verb = req.method().as_str().to_string();

    let allowed = match state.policy.enforce(role, &resource, &verb) {
        Ok(allowed) => allowed,
        Err(e) => {
            tracing::warn!(role = %role, resource = %resource, verb = %verb, error = %e, "Policy evaluation failed");
            false
        }
    };

    if !allowed {
        tracing::info!(role = %role, resource = %resource, verb = %verb, "Access denied");
        return Err(AppError::Forbidden(anyhow::anyhow!("access denied")));
    }

    if let (Some(claims), Some(session)) = (claims, session) {
        insert_claim_headers(req.headers_mut(), &claims)?;
        req.extensions_mut().insert(AuthContext { claims, session });
    }

    Ok(next.run(req).await)
}

/// Extractor for the claims the gate attached to the request.
pub struct AuthUser(pub AuthContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AppError::Rejected {
                status: StatusCode::UNAUTHORIZED,
                code: codes::UNAUTHORIZED,
                message: "Authentication required".to_string(),
            })
    }
}
