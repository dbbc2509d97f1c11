use super::*;
use crate::config::ProviderTimeouts;
use crate::provider::{MSG_EMAIL_EXISTS, user_message};
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

// =============================================================================
// parse_response
// =============================================================================

#[test]
fn parse_success_body() {
    let text = json!({
        "idToken": "abc", "email": "a@b.com", "expiresIn": "3600", "localId": "u1"
    })
    .to_string();
    let resp = parse_response(200, &text).unwrap();
    assert_eq!(resp.id_token, "abc");
    assert_eq!(resp.expires_in, 3600);
}

#[test]
fn parse_error_status_keeps_body() {
    let text = json!({ "error": { "code": 400, "message": "EMAIL_EXISTS" } }).to_string();
    let err = parse_response(400, &text).unwrap_err();
    assert!(matches!(err, ProviderError::Rejected { status: 400, .. }));
    assert_eq!(err.code(), Some("EMAIL_EXISTS"));
}

#[test]
fn parse_error_status_with_html_body() {
    let err = parse_response(502, "<html>bad gateway</html>").unwrap_err();
    assert!(matches!(&err, ProviderError::Rejected { status: 502, body } if body.is_null()));
    assert!(err.code().is_none());
}

#[test]
fn parse_success_status_with_bad_body() {
    let err = parse_response(200, r#"{"idToken":"abc"}"#).unwrap_err();
    assert!(matches!(err, ProviderError::Parse(_)));
}

// =============================================================================
// stub provider over HTTP
// =============================================================================

#[derive(Debug, Clone)]
struct Seen {
    path: String,
    query: String,
    body: Value,
}

type SeenLog = Arc<Mutex<Vec<Seen>>>;

async fn stub(State(seen): State<SeenLog>, uri: Uri, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    seen.lock().unwrap().push(Seen {
        path: uri.path().to_owned(),
        query: uri.query().unwrap_or_default().to_owned(),
        body: body.clone(),
    });

    if body["email"] == "taken@b.com" {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": { "code": 400, "message": "EMAIL_EXISTS" } })));
    }
    let local_id = if uri.path().ends_with("signUp") { "new-user" } else { "existing-user" };
    (
        StatusCode::OK,
        Json(json!({
            "kind": "identitytoolkit#Response",
            "idToken": "token-123",
            "email": body["email"],
            "refreshToken": "refresh-123",
            "expiresIn": "3600",
            "localId": local_id
        })),
    )
}

async fn spawn_stub() -> (IdentityToolkitClient, SeenLog) {
    let seen: SeenLog = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().fallback(stub).with_state(Arc::clone(&seen));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = ProviderConfig {
        api_key: "test-key".into(),
        base_url: format!("http://{addr}/v1"),
        timeouts: ProviderTimeouts { request_secs: 5, connect_secs: 5 },
    };
    (IdentityToolkitClient::new(&config).unwrap(), seen)
}

#[tokio::test]
async fn sign_in_posts_to_password_endpoint() {
    let (client, seen) = spawn_stub().await;
    let resp = client.sign_in(&Credentials::new("a@b.com", "secret1")).await.unwrap();

    assert_eq!(resp.local_id, "existing-user");
    assert_eq!(resp.email, "a@b.com");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].path, "/v1/accounts:signInWithPassword");
    assert_eq!(seen[0].query, "key=test-key");
    assert_eq!(seen[0].body, json!({ "email": "a@b.com", "password": "secret1", "returnSecureToken": true }));
}

#[tokio::test]
async fn sign_up_posts_to_sign_up_endpoint() {
    let (client, seen) = spawn_stub().await;
    let resp = client.sign_up(&Credentials::new("new@b.com", "secret1")).await.unwrap();

    assert_eq!(resp.local_id, "new-user");
    assert_eq!(seen.lock().unwrap()[0].path, "/v1/accounts:signUp");
}

#[tokio::test]
async fn rejection_maps_to_user_message() {
    let (client, _seen) = spawn_stub().await;
    let err = client.sign_up(&Credentials::new("taken@b.com", "secret1")).await.unwrap_err();
    assert_eq!(user_message(&err), MSG_EMAIL_EXISTS);
}

#[tokio::test]
async fn unreachable_provider_is_request_error_without_key() {
    let config = ProviderConfig {
        api_key: "super-secret-key".into(),
        base_url: "http://127.0.0.1:1/v1".into(),
        timeouts: ProviderTimeouts { request_secs: 2, connect_secs: 2 },
    };
    let client = IdentityToolkitClient::new(&config).unwrap();
    let err = client.sign_in(&Credentials::new("a@b.com", "secret1")).await.unwrap_err();
    assert!(matches!(err, ProviderError::Request(_)));
    assert!(!err.to_string().contains("super-secret-key"));
}
