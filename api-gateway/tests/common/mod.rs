//! Router-level test harness backed by in-memory stores.

#![allow(dead_code)]

use api_gateway::{
    build_router,
    config::{
        DatabaseConfig, Environment, GatewayConfig, JwtConfig, OtpConfig, PolicyConfig,
        RateLimitConfig, RedisConfig, SecurityConfig, SessionConfig, SmtpConfig,
    },
    models::{AccountType, NewUser, UserStatus},
    services::{
        CredentialStore, InMemoryStore, JwtService, MockCache, MockEmailService, PolicyEngine,
    },
    utils::{hash_password, Password},
    AppState,
};
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Method, Request, StatusCode},
    Router,
};
use secrecy::Secret;
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc};
use tower::util::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "test-secret";
pub const TEST_PASSWORD: &str = "pw123";

pub fn test_config() -> GatewayConfig {
    GatewayConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "api-gateway".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: Secret::new("postgres://localhost/unused".to_string()),
            max_connections: 1,
            min_connections: 1,
        },
        redis: RedisConfig {
            url: "redis://localhost:6379".to_string(),
        },
        jwt: JwtConfig {
            secret: Secret::new(TEST_SECRET.to_string()),
        },
        session: SessionConfig {
            lifetime_hours: 999_999,
        },
        otp: OtpConfig {
            ttl_seconds: 300,
            length: 6,
            max_attempts: 5,
        },
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            port: 587,
            user: "noreply@x.com".to_string(),
            password: Secret::new(String::new()),
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        rate_limit: RateLimitConfig {
            login_attempts: 100,
            login_window_seconds: 60,
            register_attempts: 100,
            register_window_seconds: 60,
            resend_attempts: 100,
            resend_window_seconds: 60,
            verify_attempts: 100,
            verify_window_seconds: 60,
        },
        policy: PolicyConfig { path: None },
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub cache: Arc<MockCache>,
    pub email: Arc<MockEmailService>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(test_config(), PolicyEngine::load(None).unwrap())
    }

    pub fn with_config(config: GatewayConfig) -> Self {
        Self::build(config, PolicyEngine::load(None).unwrap())
    }

    pub fn with_policy(policy: PolicyEngine) -> Self {
        Self::build(test_config(), policy)
    }

    fn build(config: GatewayConfig, policy: PolicyEngine) -> Self {
        service_core::observability::init_test_tracing();

        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(MockCache::new());
        let email = Arc::new(MockEmailService::new());
        let jwt = JwtService::new(&config.jwt.secret).unwrap();

        let state = AppState::new(
            config,
            store.clone(),
            store.clone(),
            cache.clone(),
            email.clone(),
            jwt,
            policy,
        )
        .unwrap();

        Self {
            router: build_router(state.clone()),
            state,
            store,
            cache,
            email,
        }
    }

    /// Send a request from a fixed client address; returns status and JSON body
    /// (`Value::Null` when the body is empty or not JSON).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
        extra_headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::USER_AGENT, "gateway-tests/1.0")
            .extension(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        for (name, value) in extra_headers {
            builder = builder.header(*name, *value);
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body), None, &[]).await
    }

    pub async fn get_with_token(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, Some(token), &[]).await
    }

    pub async fn register(&self, username: &str, email: &str) -> (StatusCode, Value) {
        self.post(
            "/auth/register",
            json!({
                "full_name": "Test User",
                "username": username,
                "email": email,
                "password": TEST_PASSWORD,
            }),
        )
        .await
    }

    pub async fn verify(&self, email: &str, code: &str) -> (StatusCode, Value) {
        self.post(
            "/auth/verify-email",
            json!({ "email": email, "otp": code, "platform": "web" }),
        )
        .await
    }

    /// Register, verify with the mailed code and return the auth response body.
    pub async fn signed_up(&self, username: &str, email: &str) -> Value {
        let (status, _) = self.register(username, email).await;
        assert_eq!(status, StatusCode::CREATED);

        let code = self.email.last_code_for(email).unwrap();
        let (status, body) = self.verify(email, &code).await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    pub async fn login(&self, identifier: &str, password: &str, platform: &str) -> (StatusCode, Value) {
        self.post(
            "/auth/login",
            json!({ "identifier": identifier, "password": password, "platform": platform }),
        )
        .await
    }

    /// Insert an active admin directly, as the `create-admin` binary does.
    pub async fn seed_admin(&self, username: &str, email: &str) -> Uuid {
        let user = self
            .store
            .create_user(NewUser {
                full_name: "Admin".to_string(),
                username: username.to_string(),
                email: email.to_string(),
                password_hash: hash_password(&Password::new(TEST_PASSWORD.to_string())).unwrap(),
                gender: None,
                user_type: AccountType::Admin,
                user_role: "admin".to_string(),
                status: UserStatus::Active,
            })
            .await
            .unwrap();
        user.id
    }
}

pub fn token_of(body: &Value) -> String {
    body["access_token"].as_str().unwrap().to_string()
}

pub fn session_id_of(body: &Value) -> String {
    body["session"]["id"].as_str().unwrap().to_string()
}
