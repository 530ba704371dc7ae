//! Identity provider integration tests
//!
//! Runs `SupabaseAuth` against a `wiremock` server that answers like a
//! GoTrue instance.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pdfchat::auth::{AuthGateway, Credentials, SessionEventKind, SignUpOutcome, SupabaseAuth};
use pdfchat::config::AuthConfig;
use pdfchat::error::{error_kind, user_message, PdfChatError};

const ANON_KEY: &str = "test-anon-key";

fn gateway(server: &MockServer) -> SupabaseAuth {
    let config = AuthConfig {
        url: server.uri(),
        anon_key: ANON_KEY.to_string(),
    };
    SupabaseAuth::new(&config, Duration::from_secs(5)).expect("gateway should build")
}

fn creds() -> Credentials {
    Credentials::new("ada@example.com", "hunter22").expect("valid credentials")
}

fn token_body(access_token: &str, expires_in: i64) -> serde_json::Value {
    json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": expires_in,
        "refresh_token": "refresh-1",
        "user": { "id": "u-1", "email": "ada@example.com" }
    })
}

async fn mount_password_grant(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", ANON_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_sign_in_publishes_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", ANON_KEY))
        .and(body_json(json!({ "email": "ada@example.com", "password": "hunter22" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at-1", 3600)))
        .expect(1)
        .mount(&server)
        .await;

    let auth = gateway(&server);
    let mut subscription = auth.subscribe();
    let initial = subscription.next().await.expect("initial event");
    assert_eq!(initial.kind, SessionEventKind::InitialSession);
    assert!(initial.session.is_none());

    let session = auth.sign_in(&creds()).await.expect("sign in should succeed");
    assert_eq!(session.access_token, "at-1");
    assert_eq!(session.email, "ada@example.com");

    let event = subscription.next().await.expect("sign-in event");
    assert_eq!(event.kind, SessionEventKind::SignedIn);
    assert_eq!(event.session.map(|s| s.access_token), Some("at-1".to_string()));

    let current = auth.session().await.unwrap().expect("session present");
    assert_eq!(current.access_token, "at-1");
}

#[tokio::test]
async fn test_sign_in_rejected_reports_provider_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let auth = gateway(&server);
    let err = auth.sign_in(&creds()).await.unwrap_err();
    assert!(matches!(error_kind(&err), Some(PdfChatError::Auth(_))));
    assert_eq!(user_message(&err), "Invalid login credentials");
    assert!(auth.session().await.unwrap().is_none());
}

#[tokio::test]
async fn test_sign_up_requires_confirmation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .and(header("apikey", ANON_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u-2",
            "email": "ada@example.com",
            "confirmation_sent_at": "2024-01-01T00:00:00Z"
        })))
        .mount(&server)
        .await;

    let auth = gateway(&server);
    let outcome = auth.sign_up(&creds()).await.expect("sign up should succeed");
    assert_eq!(outcome, SignUpOutcome::ConfirmationRequired);
    assert!(auth.session().await.unwrap().is_none());
}

#[tokio::test]
async fn test_sign_up_auto_confirmed_signs_in() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at-new", 3600)))
        .mount(&server)
        .await;

    let auth = gateway(&server);
    let outcome = auth.sign_up(&creds()).await.expect("sign up should succeed");
    assert!(matches!(outcome, SignUpOutcome::SignedIn(ref s) if s.access_token == "at-new"));
    assert!(auth.session().await.unwrap().is_some());
}

#[tokio::test]
async fn test_sign_up_existing_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "code": 422,
            "msg": "User already registered"
        })))
        .mount(&server)
        .await;

    let auth = gateway(&server);
    let err = auth.sign_up(&creds()).await.unwrap_err();
    assert_eq!(user_message(&err), "User already registered");
}

#[tokio::test]
async fn test_sign_out_clears_session_even_when_provider_fails() {
    let server = MockServer::start().await;
    mount_password_grant(&server, token_body("at-1", 3600)).await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer at-1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let auth = gateway(&server);
    auth.sign_in(&creds()).await.unwrap();
    let mut subscription = auth.subscribe();
    subscription.next().await.expect("initial event");

    auth.sign_out().await.expect("sign out never fails");
    assert!(auth.session().await.unwrap().is_none());

    let event = subscription.next().await.expect("sign-out event");
    assert_eq!(event.kind, SessionEventKind::SignedOut);
    assert!(event.session.is_none());
}

#[tokio::test]
async fn test_expired_session_is_refreshed() {
    let server = MockServer::start().await;
    mount_password_grant(&server, token_body("at-old", 0)).await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_json(json!({ "refresh_token": "refresh-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at-new", 3600)))
        .expect(1)
        .mount(&server)
        .await;

    let auth = gateway(&server);
    auth.sign_in(&creds()).await.unwrap();
    let mut subscription = auth.subscribe();
    subscription.next().await.expect("initial event");

    let session = auth.session().await.unwrap().expect("refreshed session");
    assert_eq!(session.access_token, "at-new");

    let event = subscription.next().await.expect("refresh event");
    assert_eq!(event.kind, SessionEventKind::TokenRefreshed);

    // Fresh token; no second refresh.
    let again = auth.session().await.unwrap().expect("session present");
    assert_eq!(again.access_token, "at-new");
}

#[tokio::test]
async fn test_failed_refresh_signs_out() {
    let server = MockServer::start().await;
    mount_password_grant(&server, token_body("at-old", 0)).await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid Refresh Token"
        })))
        .mount(&server)
        .await;

    let auth = gateway(&server);
    auth.sign_in(&creds()).await.unwrap();
    let mut subscription = auth.subscribe();
    subscription.next().await.expect("initial event");

    assert!(auth.session().await.unwrap().is_none());
    let event = subscription.next().await.expect("sign-out event");
    assert_eq!(event.kind, SessionEventKind::SignedOut);
}

#[tokio::test]
async fn test_concurrent_callers_share_one_refresh() {
    let server = MockServer::start().await;
    mount_password_grant(&server, token_body("at-old", 0)).await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("at-new", 3600))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let auth = gateway(&server);
    auth.sign_in(&creds()).await.unwrap();

    let (first, second) = tokio::join!(auth.session(), auth.session());
    let first = first.unwrap().expect("refreshed session");
    let second = second.unwrap().expect("refreshed session");
    assert_eq!(first.access_token, "at-new");
    assert_eq!(second.access_token, "at-new");
}
