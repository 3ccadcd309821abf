mod common;

use axum::http::StatusCode;
use common::{test_config, token_of, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_register_verify_then_reuse_code() {
    let app = TestApp::new();

    let (status, body) = app.register("bob", "bob@x.com").await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["message"].as_str().unwrap().contains("please verify"));
    assert_eq!(body["email_sent"], true);

    let code = app.email.last_code_for("bob@x.com").unwrap();
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));

    let (status, body) = app.verify("bob@x.com", &code).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "bob");
    assert_eq!(body["user"]["status"], "active");
    assert_eq!(body["session"]["is_active"], true);
    assert_eq!(body["session"]["platform"], "web");
    assert!(!token_of(&body).is_empty());
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("password_hash").is_none());

    // Codes are single use.
    let (status, body) = app.verify("bob@x.com", &code).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "OTP_EXPIRED");
}

#[tokio::test]
async fn test_wrong_code_does_not_consume_pending_code() {
    let app = TestApp::new();
    app.register("bob", "bob@x.com").await;
    let code = app.email.last_code_for("bob@x.com").unwrap();
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let (status, body) = app.verify("bob@x.com", wrong).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "OTP_MISMATCH");
    assert_eq!(body["error"], "Incorrect otp");

    let (status, _) = app.verify("bob@x.com", &code).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_verify_unknown_email_is_not_found() {
    let app = TestApp::new();
    let (status, body) = app.verify("ghost@x.com", "123456").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_verify_on_admin_platform_is_refused() {
    let app = TestApp::new();
    app.register("bob", "bob@x.com").await;
    let code = app.email.last_code_for("bob@x.com").unwrap();

    let (status, body) = app
        .post(
            "/auth/verify-email",
            json!({ "email": "bob@x.com", "otp": code, "platform": "admin" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "FORBIDDEN");
    assert_eq!(app.store.session_count(), 0);

    // The refused attempt left the code in place.
    let (status, _) = app.verify("bob@x.com", &code).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = TestApp::new();
    let (status, _) = app.register("bob", "bob@x.com").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.register("bob", "other@x.com").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, _) = app.register("robert", "BOB@X.COM").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_rejects_malformed_input() {
    let app = TestApp::new();

    let (status, body) = app.register("bob", "not-an-email").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");

    let (status, _) = app
        .post(
            "/auth/register",
            json!({ "username": "bob", "email": "bob@x.com", "password": "short" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.post("/auth/register", json!({ "username": "bob" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    assert_eq!(app.email.sent_count("bob@x.com"), 0);
}

#[tokio::test]
async fn test_resend_replaces_pending_code() {
    let app = TestApp::new();
    app.register("bob", "bob@x.com").await;
    let first = app.email.last_code_for("bob@x.com").unwrap();

    let (status, body) = app
        .post("/auth/verify-email/resend", json!({ "email": "bob@x.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().is_some());
    assert_eq!(app.email.sent_count("bob@x.com"), 2);

    let second = app.email.last_code_for("bob@x.com").unwrap();
    if first != second {
        let (status, body) = app.verify("bob@x.com", &first).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "OTP_MISMATCH");
    }

    let (status, _) = app.verify("bob@x.com", &second).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post("/auth/verify-email/resend", json!({ "email": "bob@x.com" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post("/auth/verify-email/resend", json!({ "email": "ghost@x.com" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cache_outage_fails_verification() {
    let app = TestApp::new();
    app.register("bob", "bob@x.com").await;
    let code = app.email.last_code_for("bob@x.com").unwrap();

    app.cache.set_unavailable(true);
    let (status, body) = app.verify("bob@x.com", &code).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INTERNAL_SERVER");
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn test_repeated_wrong_codes_invalidate_pending_code() {
    let app = TestApp::new();
    app.register("bob", "bob@x.com").await;
    let code = app.email.last_code_for("bob@x.com").unwrap();
    let wrong = if code == "000000" { "111111" } else { "000000" };

    for _ in 0..4 {
        let (status, body) = app.verify("bob@x.com", wrong).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "OTP_MISMATCH");
    }

    let (status, body) = app.verify("bob@x.com", wrong).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "OTP_ATTEMPTS_EXCEEDED");

    // The right code no longer works; a resend starts over.
    let (status, body) = app.verify("bob@x.com", &code).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "OTP_EXPIRED");
    assert_eq!(app.store.session_count(), 0);

    let (status, _) = app
        .post("/auth/verify-email/resend", json!({ "email": "bob@x.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let code = app.email.last_code_for("bob@x.com").unwrap();
    let (status, _) = app.verify("bob@x.com", &code).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_verify_is_rate_limited_per_ip() {
    let mut config = test_config();
    config.rate_limit.verify_attempts = 3;
    config.rate_limit.verify_window_seconds = 600;
    let app = TestApp::with_config(config);
    app.register("bob", "bob@x.com").await;
    let code = app.email.last_code_for("bob@x.com").unwrap();
    let wrong = if code == "000000" { "111111" } else { "000000" };

    for _ in 0..3 {
        let (status, _) = app.verify("bob@x.com", wrong).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, body) = app.verify("bob@x.com", &code).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "TOO_MANY_REQUESTS");
}

#[tokio::test]
async fn test_undelivered_code_is_reported() {
    let app = TestApp::new();
    app.email.set_failing(true);

    let (status, body) = app.register("bob", "bob@x.com").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email_sent"], false);
    assert!(body["message"].as_str().unwrap().contains("could not be sent"));

    let (status, body) = app
        .post("/auth/verify-email/resend", json!({ "email": "bob@x.com" }))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INTERNAL_SERVER");

    app.email.set_failing(false);
    let (status, body) = app
        .post("/auth/verify-email/resend", json!({ "email": "bob@x.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email_sent"], true);

    let code = app.email.last_code_for("bob@x.com").unwrap();
    let (status, _) = app.verify("bob@x.com", &code).await;
    assert_eq!(status, StatusCode::OK);
}
