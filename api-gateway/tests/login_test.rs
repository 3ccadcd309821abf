mod common;

use axum::http::StatusCode;
use common::{session_id_of, token_of, TestApp, TEST_PASSWORD};

#[tokio::test]
async fn test_login_opens_live_session() {
    let app = TestApp::new();
    app.signed_up("bob", "bob@x.com").await;

    let (status, body) = app.login("bob", TEST_PASSWORD, "web").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "bob@x.com");
    assert_eq!(body["session"]["is_active"], true);
    assert_eq!(body["session"]["user_agent"], "gateway-tests/1.0");
    assert_eq!(body["session"]["ip_address"], "127.0.0.1");

    // The token resolves to the session just created.
    let token = token_of(&body);
    let session_id = session_id_of(&body);
    let claims = app.state.jwt.validate(&token).unwrap();
    assert_eq!(claims.session_id.to_string(), session_id);
    assert_eq!(claims.platform, "web");

    let (status, session) = app
        .get_with_token(&format!("/session/{}", session_id), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["is_active"], true);
}

#[tokio::test]
async fn test_login_by_email_any_case() {
    let app = TestApp::new();
    app.signed_up("bob", "bob@x.com").await;

    let (status, body) = app.login("BOB@x.com", TEST_PASSWORD, "web").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "bob");
}

#[tokio::test]
async fn test_wrong_platform_creates_no_session() {
    let app = TestApp::new();
    app.signed_up("bob", "bob@x.com").await;
    let sessions_before = app.store.session_count();

    for password in [TEST_PASSWORD, "wrong1"] {
        let (status, body) = app.login("bob", password, "admin").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "FORBIDDEN");
        assert_eq!(body["error"], "User can't login to admin web");
    }

    assert_eq!(app.store.session_count(), sessions_before);
}

#[tokio::test]
async fn test_admin_confined_to_admin_platform() {
    let app = TestApp::new();
    app.seed_admin("root", "root@x.com").await;

    let (status, body) = app.login("root", TEST_PASSWORD, "web").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "FORBIDDEN");
    assert_eq!(body["error"], "Admin can only login to admin web");

    let (status, body) = app.login("root", TEST_PASSWORD, "admin").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["user_type"], "admin");
}

#[tokio::test]
async fn test_wrong_password() {
    let app = TestApp::new();
    app.signed_up("bob", "bob@x.com").await;
    let sessions_before = app.store.session_count();

    let (status, body) = app.login("bob", "pw124", "web").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_CREDENTIALS");
    assert_eq!(body["error"], "Incorrect password");
    assert_eq!(app.store.session_count(), sessions_before);
}

#[tokio::test]
async fn test_unknown_user() {
    let app = TestApp::new();
    let (status, body) = app.login("nobody", TEST_PASSWORD, "web").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn test_pending_account_can_login() {
    let app = TestApp::new();
    app.register("bob", "bob@x.com").await;

    let (status, body) = app.login("bob", TEST_PASSWORD, "web").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["status"], "inverify");
}

#[tokio::test]
async fn test_store_outage_is_internal_error() {
    let app = TestApp::new();
    app.signed_up("bob", "bob@x.com").await;

    app.store.set_unavailable(true);
    let (status, body) = app.login("bob", TEST_PASSWORD, "web").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
}
