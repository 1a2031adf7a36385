//! Integration tests for the REST backend
//!
//! These tests run the client against a mock of the hosted service served
//! by axum on an ephemeral port, and verify the HTTP shape of every call.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use common::{
    backend::{AuthBackend, Filter, TableBackend},
    config::{BackendConfig, BackendMode},
    error::BackendError,
    identity::AuthChange,
    rest::RestBackend,
};
use serde_json::{Value, json};

const ANON_KEY: &str = "anon-test-key";
const ACCESS_TOKEN: &str = "access-token-1";
const USER_ID: &str = "6f1f1c1e-3b8a-4a3e-9d55-0c2a4b1e7a10";

/// Requests seen by the mock, as "METHOD path?query bearer"
#[derive(Clone, Default)]
struct MockLog(Arc<Mutex<Vec<String>>>);

impl MockLog {
    fn push(&self, line: String) {
        self.0.lock().unwrap().push(line);
    }

    fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .trim_start_matches("Bearer ")
        .to_string()
}

fn has_api_key(headers: &HeaderMap) -> bool {
    headers.get("apikey").and_then(|value| value.to_str().ok()) == Some(ANON_KEY)
}

fn user_json() -> Value {
    json!({
        "id": USER_ID,
        "email": "ana@example.com",
        "user_metadata": {"full_name": "Ana Souza"}
    })
}

fn sorted_query(query: &HashMap<String, String>) -> String {
    let mut pairs: Vec<String> = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    pairs.sort();
    pairs.join("&")
}

async fn signup(
    State(log): State<MockLog>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    log.push(format!("POST /auth/v1/signup {}", bearer(&headers)));
    if body["email"] == "taken@example.com" {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"code": 422, "msg": "User already registered"})),
        );
    }
    let mut user = user_json();
    user["user_metadata"] = body["data"].clone();
    (StatusCode::OK, Json(user))
}

async fn token(
    State(log): State<MockLog>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    log.push(format!("POST /auth/v1/token?{}", sorted_query(&query)));
    if body["password"] != "Secret#123" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "access_token": ACCESS_TOKEN,
            "refresh_token": "refresh-1",
            "token_type": "bearer",
            "user": user_json()
        })),
    )
}

async fn current_user(State(log): State<MockLog>, headers: HeaderMap) -> impl IntoResponse {
    log.push(format!("GET /auth/v1/user {}", bearer(&headers)));
    if bearer(&headers) == ACCESS_TOKEN {
        (StatusCode::OK, Json(user_json()))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"msg": "invalid JWT"})))
    }
}

async fn logout(State(log): State<MockLog>, headers: HeaderMap) -> StatusCode {
    log.push(format!("POST /auth/v1/logout {}", bearer(&headers)));
    StatusCode::NO_CONTENT
}

async fn select_rows(
    State(log): State<MockLog>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    log.push(format!(
        "GET /rest/v1/{}?{} {}",
        table,
        sorted_query(&query),
        bearer(&headers)
    ));
    if !has_api_key(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "No API key"}))).into_response();
    }
    match table.as_str() {
        "missing" => (
            StatusCode::NOT_FOUND,
            Json(json!({"message": "relation \"missing\" does not exist"})),
        )
            .into_response(),
        // A proxy answering with a page instead of rows
        "garbled" => (StatusCode::OK, "<html>maintenance</html>").into_response(),
        _ => (
            StatusCode::OK,
            Json(json!([
                {"id": "t1", "title": "Write report", "status": "pending"},
                {"id": "t2", "title": "Review", "status": "completed"}
            ])),
        )
            .into_response(),
    }
}

async fn insert_rows(
    State(log): State<MockLog>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let prefer = headers
        .get("prefer")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();
    log.push(format!(
        "POST /rest/v1/{}?{} {}",
        table,
        sorted_query(&query),
        prefer
    ));
    let rows: Vec<Value> = body
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|mut row| {
            row["id"] = json!("g-new");
            row
        })
        .collect();
    (StatusCode::CREATED, Json(Value::Array(rows)))
}

async fn update_rows(
    State(log): State<MockLog>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> StatusCode {
    log.push(format!(
        "PATCH /rest/v1/{}?{} {}",
        table,
        sorted_query(&query),
        body
    ));
    StatusCode::NO_CONTENT
}

async fn delete_rows(
    State(log): State<MockLog>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> StatusCode {
    log.push(format!("DELETE /rest/v1/{}?{}", table, sorted_query(&query)));
    StatusCode::NO_CONTENT
}

async fn spawn_mock() -> (RestBackend, MockLog) {
    let log = MockLog::default();
    let app = Router::new()
        .route("/auth/v1/signup", post(signup))
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/user", get(current_user))
        .route("/auth/v1/logout", post(logout))
        .route(
            "/rest/v1/:table",
            get(select_rows)
                .post(insert_rows)
                .patch(update_rows)
                .delete(delete_rows),
        )
        .with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = BackendConfig {
        url: format!("http://{}/", addr),
        anon_key: ANON_KEY.to_string(),
        request_timeout: 5,
        mode: BackendMode::Rest,
    };
    (RestBackend::new(&config).unwrap(), log)
}

#[tokio::test]
async fn test_sign_in_then_current_user_and_sign_out() {
    let (backend, log) = spawn_mock().await;
    let mut subscription = backend.on_auth_state_change();

    assert_eq!(backend.get_current_user().await.unwrap(), None);

    let session = backend
        .sign_in_with_password("ana@example.com", "Secret#123")
        .await
        .unwrap();
    assert_eq!(session.access_token, ACCESS_TOKEN);
    assert_eq!(session.user.full_name(), Some("Ana Souza"));
    assert!(matches!(
        subscription.recv().await,
        Some(AuthChange::SignedIn(_))
    ));

    let user = backend.get_current_user().await.unwrap().unwrap();
    assert_eq!(user.id.to_string(), USER_ID);

    backend.sign_out().await.unwrap();
    assert_eq!(subscription.recv().await, Some(AuthChange::SignedOut));
    assert!(backend.session().await.is_none());

    assert_eq!(
        log.lines(),
        vec![
            "POST /auth/v1/token?grant_type=password".to_string(),
            format!("GET /auth/v1/user {}", ACCESS_TOKEN),
            format!("POST /auth/v1/logout {}", ACCESS_TOKEN),
        ]
    );
}

#[tokio::test]
async fn test_wrong_password_reports_service_message() {
    let (backend, _log) = spawn_mock().await;

    let err = backend
        .sign_in_with_password("ana@example.com", "nope")
        .await
        .unwrap_err();
    match err {
        BackendError::Service { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid login credentials");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(backend.session().await.is_none());
}

#[tokio::test]
async fn test_sign_up_returns_user_without_session() {
    let (backend, log) = spawn_mock().await;

    let outcome = backend
        .sign_up(
            "ana@example.com",
            "Secret#123",
            json!({"full_name": "Ana Souza"}),
        )
        .await
        .unwrap();
    let user = outcome.user.unwrap();
    assert_eq!(user.full_name(), Some("Ana Souza"));
    assert!(outcome.session.is_none());
    assert_eq!(log.lines(), vec![format!("POST /auth/v1/signup {}", ANON_KEY)]);

    let err = backend
        .sign_up("taken@example.com", "Secret#123", json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "User already registered");
}

#[tokio::test]
async fn test_table_calls_use_postgrest_shape() {
    let (backend, log) = spawn_mock().await;
    backend
        .sign_in_with_password("ana@example.com", "Secret#123")
        .await
        .unwrap();

    let rows = backend
        .select("tasks", "id, title, status", &Filter::eq("group_id", "g1"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["status"], "completed");

    let inserted = backend
        .insert(
            "taskgroups",
            vec![json!({"user_id": USER_ID, "title": "Home"})],
            "id, title, description",
        )
        .await
        .unwrap();
    assert_eq!(inserted[0]["id"], "g-new");

    backend
        .update("taskgroups", json!({"title": "House"}), &Filter::eq("id", "g-new"))
        .await
        .unwrap();
    backend
        .delete("taskgroups", &Filter::eq("id", "g-new"))
        .await
        .unwrap();

    let lines = log.lines();
    assert_eq!(
        &lines[1..],
        &[
            format!(
                "GET /rest/v1/tasks?group_id=eq.g1&select=id, title, status {}",
                ACCESS_TOKEN
            ),
            "POST /rest/v1/taskgroups?select=id, title, description return=representation"
                .to_string(),
            "PATCH /rest/v1/taskgroups?id=eq.g-new {\"title\":\"House\"}".to_string(),
            "DELETE /rest/v1/taskgroups?id=eq.g-new".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_table_error_message_is_surfaced() {
    let (backend, _log) = spawn_mock().await;

    let err = backend
        .select("missing", "*", &Filter::eq("id", "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Service { status: 404, .. }));
    assert_eq!(err.user_message(), "relation \"missing\" does not exist");
}

#[tokio::test]
async fn test_malformed_body_is_a_decode_error() {
    let (backend, _log) = spawn_mock().await;

    let err = backend
        .select("garbled", "*", &Filter::eq("id", "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Decode(_)), "{err:?}");
}
