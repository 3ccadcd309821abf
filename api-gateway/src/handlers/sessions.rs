use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::{auth::MessageResponse, session::UpdateSessionRequest},
    middleware::{AuthContext, AuthUser},
    models::{AccountType, Session},
    services::ServiceError,
    utils::ValidatedJson,
    AppState,
};

/// Regular accounts may only act on their own sessions.
fn ensure_access(ctx: &AuthContext, session: &Session) -> Result<(), ServiceError> {
    if ctx.claims.user_type == AccountType::User && session.user_id != ctx.claims.sub {
        tracing::warn!(
            user_id = %ctx.claims.sub,
            session_id = %session.id,
            "Session belongs to another user"
        );
        return Err(ServiceError::Forbidden("access denied".to_string()));
    }
    Ok(())
}

async fn owned_session(state: &AppState, ctx: &AuthContext, id: Uuid) -> Result<Session, AppError> {
    let session = state.sessions.get(id).await?;
    ensure_access(ctx, &session)?;
    Ok(session)
}

/// Fetch a session
#[utoipa::path(
    get,
    path = "/session/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session", body = Session),
        (status = 403, description = "Access denied", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Session",
    security(("bearer_auth" = []))
)]
pub async fn get_session(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = owned_session(&state, &ctx, id).await?;
    Ok((StatusCode::OK, Json(session)))
}

/// Partially update a session
#[utoipa::path(
    put,
    path = "/session/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    request_body = UpdateSessionRequest,
    responses(
        (status = 200, description = "Updated session", body = Session),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Access denied", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Inactive sessions cannot be reactivated", body = ErrorResponse)
    ),
    tag = "Session",
    security(("bearer_auth" = []))
)]
pub async fn update_session(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    owned_session(&state, &ctx, id).await?;
    let session = state.sessions.update(id, req.into()).await?;
    Ok((StatusCode::OK, Json(session)))
}

/// Delete a session
#[utoipa::path(
    delete,
    path = "/session/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session deleted", body = MessageResponse),
        (status = 403, description = "Access denied", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    tag = "Session",
    security(("bearer_auth" = []))
)]
pub async fn delete_session(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    owned_session(&state, &ctx, id).await?;
    state.sessions.delete(id).await?;
    Ok((StatusCode::OK, Json(MessageResponse::new("Session deleted"))))
}

/// Record activity on the caller's session
#[utoipa::path(
    post,
    path = "/session/heartbeat",
    responses(
        (status = 200, description = "Session with advanced last-active time", body = Session),
        (status = 403, description = "Access denied", body = ErrorResponse)
    ),
    tag = "Session",
    security(("bearer_auth" = []))
)]
pub async fn heartbeat(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.heartbeat(ctx.session.id).await?;
    Ok((StatusCode::OK, Json(session)))
}
