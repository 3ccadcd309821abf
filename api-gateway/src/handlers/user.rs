use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::user::{CreateUserRequest, UpdateUserRequest},
    middleware::AuthUser,
    models::SanitizedUser,
    utils::ValidatedJson,
    AppState,
};

/// Current user profile
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Profile of the caller", body = SanitizedUser),
        (status = 403, description = "Access denied", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth_service.current_user(ctx.claims.sub).await?;
    Ok(Json(SanitizedUser::from(user)))
}

/// Update the caller's own profile and password
#[utoipa::path(
    put,
    path = "/users/me",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated profile", body = SanitizedUser),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Access denied", body = ErrorResponse),
        (status = 409, description = "Username already taken", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth_service.update_user(ctx.claims.sub, req).await?;
    Ok(Json(SanitizedUser::from(user)))
}

/// Update any account
#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated profile", body = SanitizedUser),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Access denied", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Username already taken", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(_ctx): AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth_service.update_user(id, req).await?;
    Ok(Json(SanitizedUser::from(user)))
}

/// Provision an active account
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = SanitizedUser),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Access denied", body = ErrorResponse),
        (status = 409, description = "User already exists", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    AuthUser(_ctx): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth_service.provision_user(req).await?;
    Ok((StatusCode::CREATED, Json(SanitizedUser::from(user))))
}
