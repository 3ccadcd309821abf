pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, Request},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::config::GatewayConfig;
use crate::middleware::auth::SESSION_ID_HEADER;
use crate::services::{
    AuthService, CredentialStore, EmailProvider, JwtService, OtpService, PolicyEngine,
    SessionManager, SessionStore, SideCache,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::registration::register,
        handlers::auth::registration::verify_email,
        handlers::auth::registration::resend_verification,
        handlers::auth::session::login,
        handlers::auth::session::logout,
        handlers::sessions::get_session,
        handlers::sessions::update_session,
        handlers::sessions::delete_session,
        handlers::sessions::heartbeat,
        handlers::user::get_me,
        handlers::user::update_me,
        handlers::user::update_user,
        handlers::user::create_user,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::auth::LoginRequest,
            dtos::auth::RegisterRequest,
            dtos::auth::VerifyEmailRequest,
            dtos::auth::ResendVerificationRequest,
            dtos::auth::MessageResponse,
            dtos::auth::AuthResponse,
            dtos::session::UpdateSessionRequest,
            dtos::user::UpdateUserRequest,
            dtos::user::CreateUserRequest,
            models::SanitizedUser,
            models::Session,
            models::AccountType,
            models::UserStatus,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login, registration and email verification"),
        (name = "Session", description = "Session inspection and lifecycle"),
        (name = "User", description = "Caller profile"),
        (name = "Observability", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: GatewayConfig,
    pub users: Arc<dyn CredentialStore>,
    pub session_store: Arc<dyn SessionStore>,
    pub cache: Arc<dyn SideCache>,
    pub email: Arc<dyn EmailProvider>,
    pub jwt: JwtService,
    pub policy: Arc<PolicyEngine>,
    pub sessions: SessionManager,
    pub auth_service: AuthService,
    pub login_rate_limiter: IpRateLimiter,
    pub register_rate_limiter: IpRateLimiter,
    pub resend_rate_limiter: IpRateLimiter,
    pub verify_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wire the pipeline components around the given collaborators.
    pub fn new(
        config: GatewayConfig,
        users: Arc<dyn CredentialStore>,
        session_store: Arc<dyn SessionStore>,
        cache: Arc<dyn SideCache>,
        email: Arc<dyn EmailProvider>,
        jwt: JwtService,
        policy: PolicyEngine,
    ) -> Result<Self, AppError> {
        let sessions = SessionManager::new(session_store.clone(), config.session.lifetime()?);
        let otp = OtpService::new(
            cache.clone(),
            config.otp.ttl_seconds,
            config.otp.length,
            config.otp.max_attempts,
        );
        let auth_service = AuthService::new(
            users.clone(),
            otp,
            sessions.clone(),
            jwt.clone(),
            email.clone(),
        );

        let limits = &config.rate_limit;
        let login_rate_limiter =
            create_ip_rate_limiter(limits.login_attempts, limits.login_window_seconds);
        let register_rate_limiter =
            create_ip_rate_limiter(limits.register_attempts, limits.register_window_seconds);
        let resend_rate_limiter =
            create_ip_rate_limiter(limits.resend_attempts, limits.resend_window_seconds);
        let verify_rate_limiter =
            create_ip_rate_limiter(limits.verify_attempts, limits.verify_window_seconds);

        Ok(Self {
            config,
            users,
            session_store,
            cache,
            email,
            jwt,
            policy: Arc::new(policy),
            sessions,
            auth_service,
            login_rate_limiter,
            register_rate_limiter,
            resend_rate_limiter,
            verify_rate_limiter,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let login_route = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(
            state.login_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let register_route = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .layer(from_fn_with_state(
            state.register_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let resend_route = Router::new()
        .route(
            "/auth/verify-email/resend",
            post(handlers::auth::resend_verification),
        )
        .layer(from_fn_with_state(
            state.resend_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let verify_route = Router::new()
        .route("/auth/verify-email", post(handlers::auth::verify_email))
        .layer(from_fn_with_state(
            state.verify_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    // Every route here passes the authorization gate; route_layer keeps
    // MatchedPath available to the policy lookup.
    let gated_routes = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/users", post(handlers::user::create_user))
        .route(
            "/users/me",
            get(handlers::user::get_me).put(handlers::user::update_me),
        )
        .route("/users/:id", put(handlers::user::update_user))
        .route("/session/heartbeat", post(handlers::sessions::heartbeat))
        .route(
            "/session/:id",
            get(handlers::sessions::get_session)
                .put(handlers::sessions::update_session)
                .delete(handlers::sessions::delete_session),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::authorization_gate,
        ));

    let origins = &state.config.security.allowed_origins;
    let allowed_origins = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(origin) => Some(origin),
            Err(e) => {
                tracing::error!(origin = %o, error = %e, "Invalid CORS origin, skipping");
                None
            }
        }))
    };

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .merge(login_route)
        .merge(register_route)
        .merge(resend_route)
        .merge(verify_route)
        .merge(gated_routes)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    header::AUTHORIZATION,
                    header::CONTENT_TYPE,
                    HeaderName::from_static(REQUEST_ID_HEADER),
                ])
                .expose_headers([HeaderName::from_static(SESSION_ID_HEADER)]),
        )
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "A backing store is unreachable")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Err(e) = state.users.health_check().await {
        tracing::error!(error = %e, "Database health check failed");
        return Err(AppError::ServiceUnavailable);
    }

    if let Err(e) = state.cache.health_check().await {
        tracing::error!(error = %e, "Cache health check failed");
        return Err(AppError::ServiceUnavailable);
    }

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
    })))
}
