//! ApiClient against an in-process mock of the Taskline API

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use taskline_client::{ApiClient, NETWORK_ERROR_MESSAGE};
use taskline_session::{
    AuthBackend, ChangePinRequest, ChangeUsernameRequest, ScopedStorage, SessionManager,
    SettingsSupplier, SetupRequest,
};

const COOKIE: &str = "session=abc123";
const PIN: &str = "123456";

#[derive(Clone)]
struct MockServer {
    auto_lock_minutes: Arc<Mutex<u32>>,
}

fn authenticated(headers: &HeaderMap) -> bool {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|cookies| cookies.contains(COOKIE))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "success": false,
            "error": { "code": 401, "message": "Authentication required" }
        })),
    )
        .into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["username"] == "testuser" && body["pin"] == PIN {
        (
            [(header::SET_COOKIE, format!("{}; Path=/; HttpOnly", COOKIE))],
            Json(json!({
                "message": "Login successful",
                "user": { "id": 1, "username": "testuser" }
            })),
        )
            .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid username or PIN" })),
        )
            .into_response()
    }
}

async fn logout() -> Response {
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, "session=; Path=/; Max-Age=0")],
    )
        .into_response()
}

async fn setup() -> Response {
    (
        StatusCode::CONFLICT,
        Json(json!({
            "success": false,
            "error": { "code": 409, "message": "Setup already completed" }
        })),
    )
        .into_response()
}

async fn settings(State(server): State<MockServer>, headers: HeaderMap) -> Response {
    if !authenticated(&headers) {
        return unauthorized();
    }
    let minutes = *server.auto_lock_minutes.lock().unwrap();
    Json(json!({
        "success": true,
        "data": { "auto_lock_minutes": minutes, "theme": "dark", "notes_enabled": true }
    }))
    .into_response()
}

async fn update_auto_lock(
    State(server): State<MockServer>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authenticated(&headers) {
        return unauthorized();
    }
    // Unknown fields are ignored and the current value is returned
    let mut current = server.auto_lock_minutes.lock().unwrap();
    if let Some(minutes) = body.get("minutes").and_then(Value::as_u64) {
        *current = minutes as u32;
    }
    Json(json!({ "auto_lock_minutes": *current })).into_response()
}

async fn change_pin(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authenticated(&headers) {
        return unauthorized();
    }
    if body["current_pin"] != PIN {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Current PIN is incorrect" })),
        )
            .into_response();
    }
    Json(json!({ "message": "PIN changed successfully" })).into_response()
}

async fn change_username(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authenticated(&headers) {
        return unauthorized();
    }
    Json(json!({
        "message": "Username changed successfully",
        "username": body["new_username"],
    }))
    .into_response()
}

async fn spawn_server(auto_lock_minutes: u32) -> String {
    let state = MockServer {
        auto_lock_minutes: Arc::new(Mutex::new(auto_lock_minutes)),
    };
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/setup", post(setup))
        .route("/api/auth/pin", put(change_pin))
        .route("/api/auth/username", put(change_username))
        .route("/api/settings", get(settings))
        .route("/api/settings/auto-lock", put(update_auto_lock))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{}", addr)
}

fn client(base_url: &str) -> ApiClient {
    ApiClient::new(base_url, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_login_cookie_authorizes_validation() {
    let client = client(&spawn_server(10).await);

    let error = client.validate_session().await.unwrap_err();
    assert_eq!(error.to_string(), "Authentication required");

    let session = client.login("testuser", PIN).await.unwrap();
    assert_eq!(session.id, 1);
    assert_eq!(session.username, "testuser");

    client.validate_session().await.unwrap();
}

#[tokio::test]
async fn test_login_rejected() {
    let client = client(&spawn_server(10).await);

    let error = client.login("testuser", "000000").await.unwrap_err();
    assert_eq!(error.message_or("Login failed"), "Invalid username or PIN");
}

#[tokio::test]
async fn test_logout_no_content_clears_cookie() {
    let client = client(&spawn_server(10).await);
    client.login("testuser", PIN).await.unwrap();

    client.logout().await.unwrap();
    assert!(client.validate_session().await.is_err());
}

#[tokio::test]
async fn test_setup_standardized_error() {
    let client = client(&spawn_server(10).await);
    let request = SetupRequest {
        pin: PIN.to_string(),
        username: Some("testuser".to_string()),
        email: None,
    };

    let error = client.setup(&request).await.unwrap_err();
    assert_eq!(error.to_string(), "Setup already completed");
}

#[tokio::test]
async fn test_auto_lock_setting() {
    let client = client(&spawn_server(10).await);
    client.login("testuser", PIN).await.unwrap();

    assert_eq!(client.auto_lock_minutes().await.unwrap(), Some(10));

    let updated = client.update_auto_lock(3).await.unwrap();
    assert_eq!(updated.auto_lock_minutes, 3);
    assert_eq!(client.auto_lock_minutes().await.unwrap(), Some(3));

    let disabled = client.update_auto_lock(0).await.unwrap();
    assert_eq!(disabled.auto_lock_minutes, 0);

    let settings = client.settings().await.unwrap();
    assert_eq!(settings.theme, "dark");
    assert!(settings.notes_enabled);
}

#[tokio::test]
async fn test_change_pin_and_username() {
    let client = client(&spawn_server(10).await);
    client.login("testuser", PIN).await.unwrap();

    let wrong = ChangePinRequest {
        current_pin: "999999".to_string(),
        new_pin: "654321".to_string(),
    };
    let error = client.change_pin(&wrong).await.unwrap_err();
    assert_eq!(error.to_string(), "Current PIN is incorrect");

    let right = ChangePinRequest {
        current_pin: PIN.to_string(),
        new_pin: "654321".to_string(),
    };
    client.change_pin(&right).await.unwrap();

    let rename = ChangeUsernameRequest {
        new_username: "ada".to_string(),
        pin: PIN.to_string(),
    };
    assert_eq!(client.change_username(&rename).await.unwrap(), "ada");
}

#[tokio::test]
async fn test_unreachable_server() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(&format!("http://{}", addr));
    let error = client.settings().await.unwrap_err();
    assert!(error.is_network_error());
    assert_eq!(error.message, NETWORK_ERROR_MESSAGE);
}

#[tokio::test]
async fn test_session_manager_over_http() {
    let client = Arc::new(client(&spawn_server(10).await));
    let manager = SessionManager::new(client, ScopedStorage::in_memory());
    manager.restore().await;
    assert!(manager.snapshot().user.is_none());

    manager.login("testuser", PIN).await.unwrap();
    manager.lock();

    let error = manager.unlock("000000").await.unwrap_err();
    assert_eq!(error.to_string(), "Invalid username or PIN");
    assert!(manager.snapshot().is_locked);

    manager.unlock(PIN).await.unwrap();
    assert!(!manager.snapshot().is_locked);

    manager.logout().await.unwrap();
    assert!(manager.snapshot().user.is_none());
}
