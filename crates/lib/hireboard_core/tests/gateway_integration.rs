//! Integration tests — run an in-process axum backend on an ephemeral port and
//! drive the gateway and session controller against it over real HTTP.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, patch, post, put};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tokio::sync::Notify;

use hireboard_core::gateway::{ApiClient, ApiOutcome, GatewayError, Navigator, Route};
use hireboard_core::roles::{Role, fetch_role};
use hireboard_core::session::{SessionController, SessionError, SessionState};
use hireboard_core::store::{FileTokenStore, MemoryTokenStore, TOKEN_KEY, TokenStore};

const PASSWORD: &str = "correct horse";
/// Password the backend answers with a bare 401.
const REVOKED: &str = "revoked";

/// Holds who-am-I requests until the test releases them.
#[derive(Default)]
struct Gate {
    entered: Notify,
    release: Notify,
}

#[derive(Clone)]
struct Backend {
    token: String,
    roles: Vec<String>,
    seen_auth: Arc<Mutex<Vec<Option<String>>>>,
    user_data_status: Option<StatusCode>,
    gate: Option<Arc<Gate>>,
}

impl Backend {
    fn new(roles: &[&str]) -> Self {
        Self {
            token: live_token("7"),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            seen_auth: Arc::new(Mutex::new(Vec::new())),
            user_data_status: None,
            gate: None,
        }
    }

    /// Who-am-I answers `status` with no body.
    fn failing_user_data(mut self, status: StatusCode) -> Self {
        self.user_data_status = Some(status);
        self
    }

    fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Gate::default()));
        self
    }

    fn last_auth(&self) -> Option<String> {
        self.seen_auth.lock().unwrap().last().cloned().flatten()
    }
}

fn live_token(sub: &str) -> String {
    let exp = (Utc::now() + Duration::minutes(15)).timestamp();
    encode(
        &Header::default(),
        &json!({ "sub": sub, "email": "member@example.test", "exp": exp }),
        &EncodingKey::from_secret(b"backend-secret"),
    )
    .unwrap()
}

fn auth_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn create_token(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    if body["password"] == PASSWORD {
        Json(json!({ "accessToken": backend.token })).into_response()
    } else if body["password"] == REVOKED {
        StatusCode::UNAUTHORIZED.into_response()
    } else {
        Json(json!({ "message": "Wrong email or password" })).into_response()
    }
}

async fn my_user_data(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    let auth = auth_header(&headers);
    backend.seen_auth.lock().unwrap().push(auth.clone());
    if let Some(gate) = &backend.gate {
        gate.entered.notify_one();
        gate.release.notified().await;
    }
    if let Some(status) = backend.user_data_status {
        return status.into_response();
    }
    if auth == Some(format!("Bearer {}", backend.token)) {
        Json(json!({ "email": "member@example.test", "roles": backend.roles })).into_response()
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

async fn echo_headers(headers: HeaderMap) -> Json<Value> {
    Json(json!({
        "authorization": auth_header(&headers),
        "contentType": headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
    }))
}

async fn echo_body(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "received": body }))
}

fn router(backend: Backend) -> Router {
    Router::new()
        .route("/api/Authentication/CreateTokenForUser", post(create_token))
        .route("/api/GetMyUserData", get(my_user_data))
        .route("/api/headers", get(echo_headers))
        .route("/api/always401", any(|| async { StatusCode::UNAUTHORIZED }))
        .route("/api/no-content", put(|| async { StatusCode::NO_CONTENT }))
        .route("/api/empty", put(|| async { StatusCode::OK }))
        .route(
            "/api/boom",
            put(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .route("/api/not-json", get(|| async { "<html>oops</html>" }))
        .route("/api/Resume/1", patch(echo_body))
        .route("/api/JobPosting", post(|| async { StatusCode::BAD_REQUEST }))
        .with_state(backend)
}

async fn spawn(backend: Backend) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let app = router(backend);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}/api/")
}

#[derive(Default)]
struct RecordingNavigator {
    resets: Mutex<Vec<Vec<Route>>>,
}

impl RecordingNavigator {
    fn resets(&self) -> Vec<Vec<Route>> {
        self.resets.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn reset(&self, routes: Vec<Route>) {
        self.resets.lock().unwrap().push(routes);
    }
}

#[tokio::test]
async fn login_stores_token_and_presents_it_to_who_am_i() {
    let backend = Backend::new(&["Member", "Admin"]);
    let base = spawn(backend.clone()).await;
    let store = Arc::new(MemoryTokenStore::new());
    let session = SessionController::new(ApiClient::new(&base, store.clone()).unwrap());

    let role = session.login("member@example.test", PASSWORD).await.unwrap();

    assert_eq!(role, Role::Admin);
    assert_eq!(store.read().await.unwrap(), Some(backend.token.clone()));
    assert_eq!(backend.last_auth(), Some(format!("Bearer {}", backend.token)));
    assert_eq!(session.state(), SessionState::Authenticated(Role::Admin));
    assert_eq!(session.state().home_route(), Some(Route::new("AdminHome")));
}

#[tokio::test]
async fn login_rejection_surfaces_backend_message() {
    let backend = Backend::new(&["member"]);
    let base = spawn(backend).await;
    let store = Arc::new(MemoryTokenStore::new());
    let session = SessionController::new(ApiClient::new(&base, store.clone()).unwrap());

    let err = session.login("member@example.test", "nope").await.unwrap_err();

    match err {
        SessionError::LoginRejected(message) => assert_eq!(message, "Wrong email or password"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.read().await.unwrap(), None);
    assert_eq!(session.state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn unauthorized_login_ends_an_authenticated_session() {
    let backend = Backend::new(&["member"]);
    let base = spawn(backend.clone()).await;
    let store = Arc::new(MemoryTokenStore::with_token(backend.token.clone()));
    let session = SessionController::new(ApiClient::new(&base, store.clone()).unwrap());
    session.boot().await.unwrap();
    assert_eq!(session.state(), SessionState::Authenticated(Role::Member));

    let err = session.login("x@example.test", REVOKED).await.unwrap_err();

    assert!(matches!(err, SessionError::LoginRejected(_)));
    assert_eq!(store.read().await.unwrap(), None);
    assert_eq!(session.state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn rejected_login_drops_previous_token() {
    let backend = Backend::new(&["member"]);
    let base = spawn(backend.clone()).await;
    let store = Arc::new(MemoryTokenStore::with_token(backend.token.clone()));
    let session = SessionController::new(ApiClient::new(&base, store.clone()).unwrap());
    session.boot().await.unwrap();

    session.login("x@example.test", "nope").await.unwrap_err();

    assert_eq!(store.read().await.unwrap(), None);
    assert_eq!(session.state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn login_without_role_does_not_keep_token() {
    let backend = Backend::new(&["member"]).failing_user_data(StatusCode::INTERNAL_SERVER_ERROR);
    let base = spawn(backend).await;
    let store = Arc::new(MemoryTokenStore::new());
    let session = SessionController::new(ApiClient::new(&base, store.clone()).unwrap());

    let err = session.login("member@example.test", PASSWORD).await.unwrap_err();

    assert!(matches!(err, SessionError::RoleUnavailable));
    assert_eq!(store.read().await.unwrap(), None);
    assert_eq!(session.state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn login_with_undecodable_user_data_does_not_keep_token() {
    // Roles must be a list; a bare string fails to decode.
    let app = Router::new()
        .route(
            "/api/Authentication/CreateTokenForUser",
            post(|| async { Json(json!({ "accessToken": live_token("odd") })) }),
        )
        .route(
            "/api/GetMyUserData",
            get(|| async { Json(json!({ "roles": "admin" })) }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    let store = Arc::new(MemoryTokenStore::new());
    let client = ApiClient::new(&format!("http://{addr}/api/"), store.clone()).unwrap();
    let session = SessionController::new(client);

    let err = session.login("a@example.test", PASSWORD).await.unwrap_err();

    assert!(matches!(err, SessionError::Gateway(GatewayError::Decode(_))));
    assert_eq!(store.read().await.unwrap(), None);
    assert_eq!(session.state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn role_lookup_finishing_after_logout_is_discarded() {
    let backend = Backend::new(&["admin"]).gated();
    let gate = backend.gate.clone().unwrap();
    let base = spawn(backend.clone()).await;
    let store = Arc::new(MemoryTokenStore::with_token(backend.token.clone()));
    let session = Arc::new(SessionController::new(
        ApiClient::new(&base, store.clone()).unwrap(),
    ));

    let booting = tokio::spawn({
        let session = session.clone();
        async move { session.boot().await }
    });
    gate.entered.notified().await;
    assert_eq!(session.state(), SessionState::Checking);

    session.logout().await.unwrap();
    gate.release.notify_one();

    assert_eq!(booting.await.unwrap().unwrap(), SessionState::Unauthenticated);
    assert_eq!(session.state(), SessionState::Unauthenticated);
    assert_eq!(store.read().await.unwrap(), None);
}

#[tokio::test]
async fn login_persists_token_to_file_store() {
    let backend = Backend::new(&["company"]);
    let base = spawn(backend.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileTokenStore::new(dir.path(), TOKEN_KEY));
    let session = SessionController::new(ApiClient::new(&base, store).unwrap());

    assert_eq!(
        session.login("c@example.test", PASSWORD).await.unwrap(),
        Role::Company
    );

    let reopened = FileTokenStore::new(dir.path(), TOKEN_KEY);
    assert_eq!(reopened.read().await.unwrap(), Some(backend.token));
}

#[tokio::test]
async fn boot_with_live_token_resolves_role() {
    let backend = Backend::new(&["company"]);
    let base = spawn(backend.clone()).await;
    let store = Arc::new(MemoryTokenStore::with_token(backend.token.clone()));
    let session = SessionController::new(ApiClient::new(&base, store).unwrap());

    assert_eq!(
        session.boot().await.unwrap(),
        SessionState::Authenticated(Role::Company)
    );
}

#[tokio::test]
async fn boot_with_rejected_token_ends_logged_out_without_looping() {
    let backend = Backend::new(&["member"]);
    let base = spawn(backend.clone()).await;
    // Live locally, but not the token the backend issued.
    let store = Arc::new(MemoryTokenStore::with_token(live_token("someone-else")));
    let session = SessionController::new(ApiClient::new(&base, store.clone()).unwrap());

    assert_eq!(session.boot().await.unwrap(), SessionState::Unauthenticated);
    assert_eq!(store.read().await.unwrap(), None);
    assert_eq!(backend.seen_auth.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn get_without_token_omits_authorization_but_still_sends() {
    let base = spawn(Backend::new(&[])).await;
    let client = ApiClient::new(&base, Arc::new(MemoryTokenStore::new())).unwrap();

    let body = client.get("headers", None).await.unwrap().into_json().unwrap();

    assert_eq!(body["authorization"], Value::Null);
    assert_eq!(body["contentType"], "application/json");
}

#[tokio::test]
async fn get_with_token_sends_bearer_header() {
    let base = spawn(Backend::new(&[])).await;
    let client = ApiClient::new(&base, Arc::new(MemoryTokenStore::with_token("abc"))).unwrap();

    let body = client.get("headers", None).await.unwrap().into_json().unwrap();

    assert_eq!(body["authorization"], "Bearer abc");
}

#[tokio::test]
async fn unauthorized_clears_token_and_resets_to_login() {
    let base = spawn(Backend::new(&[])).await;
    let store = Arc::new(MemoryTokenStore::with_token("stale"));
    let client = ApiClient::new(&base, store.clone()).unwrap();
    let navigator = RecordingNavigator::default();

    for _ in 0..2 {
        let outcome = client.get("always401", Some(&navigator)).await.unwrap();
        assert_eq!(outcome, ApiOutcome::Unauthorized);
        assert!(outcome.is_no_result());
        assert_eq!(store.read().await.unwrap(), None);
    }

    let resets = navigator.resets();
    assert!(!resets.is_empty());
    assert!(resets.iter().all(|stack| stack == &vec![Route::login()]));
}

#[tokio::test]
async fn unauthorized_is_handled_the_same_for_every_method() {
    let base = spawn(Backend::new(&[])).await;
    let body = json!({ "title": "x" });

    for method in ["POST", "PUT", "PATCH"] {
        let store = Arc::new(MemoryTokenStore::with_token("stale"));
        let client = ApiClient::new(&base, store.clone()).unwrap();
        let navigator = RecordingNavigator::default();

        let outcome = match method {
            "POST" => client.post("always401", Some(&body), Some(&navigator)).await,
            "PUT" => client.put("always401", Some(&body), Some(&navigator)).await,
            _ => client.patch("always401", Some(&body), Some(&navigator)).await,
        }
        .unwrap();

        assert_eq!(outcome, ApiOutcome::Unauthorized, "{method}");
        assert_eq!(store.read().await.unwrap(), None, "{method}");
        assert_eq!(navigator.resets(), vec![vec![Route::login()]], "{method}");
    }
}

#[tokio::test]
async fn unauthorized_without_navigator_still_clears_token() {
    let base = spawn(Backend::new(&[])).await;
    let store = Arc::new(MemoryTokenStore::with_token("stale"));
    let client = ApiClient::new(&base, store.clone()).unwrap();

    let outcome = client.get("always401", None).await.unwrap();

    assert_eq!(outcome, ApiOutcome::Unauthorized);
    assert_eq!(store.read().await.unwrap(), None);
}

#[tokio::test]
async fn unauthorized_through_session_ends_authenticated_state() {
    let backend = Backend::new(&["member"]);
    let base = spawn(backend.clone()).await;
    let store = Arc::new(MemoryTokenStore::with_token(backend.token.clone()));
    let session = SessionController::new(ApiClient::new(&base, store.clone()).unwrap());
    session.boot().await.unwrap();
    assert_eq!(session.state(), SessionState::Authenticated(Role::Member));
    let generation = session.generation();

    let outcome = session
        .client()
        .get("always401", Some(&session))
        .await
        .unwrap();

    assert_eq!(outcome, ApiOutcome::Unauthorized);
    assert_eq!(session.state(), SessionState::Unauthenticated);
    assert!(session.generation() > generation);
    assert_eq!(store.read().await.unwrap(), None);
}

#[tokio::test]
async fn put_empty_success_is_distinct_from_failure() {
    let base = spawn(Backend::new(&[])).await;
    let client = ApiClient::new(&base, Arc::new(MemoryTokenStore::with_token("t"))).unwrap();
    let body = json!({ "title": "Backend engineer" });

    let no_content = client.put("no-content", Some(&body), None).await.unwrap();
    let empty = client.put("empty", Some(&body), None).await.unwrap();
    let boom = client.put("boom", Some(&body), None).await.unwrap();

    assert_eq!(no_content, ApiOutcome::Empty);
    assert_eq!(empty, ApiOutcome::Empty);
    assert_eq!(boom, ApiOutcome::Failed(StatusCode::INTERNAL_SERVER_ERROR));
    assert!(!no_content.is_no_result());
    assert!(boom.is_no_result());
    assert!(matches!(
        boom.into_result(),
        Err(GatewayError::Status(StatusCode::INTERNAL_SERVER_ERROR))
    ));
}

#[tokio::test]
async fn post_failure_is_no_result_and_keeps_session() {
    let base = spawn(Backend::new(&[])).await;
    let store = Arc::new(MemoryTokenStore::with_token("t"));
    let client = ApiClient::new(&base, store.clone()).unwrap();
    let navigator = RecordingNavigator::default();

    let outcome = client
        .post("JobPosting", Some(&json!({ "title": "x" })), Some(&navigator))
        .await
        .unwrap();

    assert_eq!(outcome, ApiOutcome::Failed(StatusCode::BAD_REQUEST));
    assert_eq!(store.read().await.unwrap().as_deref(), Some("t"));
    assert!(navigator.resets().is_empty());
}

#[tokio::test]
async fn patch_sends_json_body() {
    let base = spawn(Backend::new(&[])).await;
    let client = ApiClient::new(&base, Arc::new(MemoryTokenStore::new())).unwrap();

    let body = client
        .patch("Resume/1", Some(&json!({ "summary": "Rust" })), None)
        .await
        .unwrap()
        .into_json()
        .unwrap();

    assert_eq!(body["received"]["summary"], "Rust");
}

#[tokio::test]
async fn non_json_success_body_is_a_decode_error() {
    let base = spawn(Backend::new(&[])).await;
    let client = ApiClient::new(&base, Arc::new(MemoryTokenStore::new())).unwrap();

    let err = client.get("not-json", None).await.unwrap_err();

    assert!(matches!(err, GatewayError::Decode(_)));
}

#[tokio::test]
async fn fetch_role_returns_none_on_no_result() {
    let base = spawn(Backend::new(&["admin"])).await;
    let client = ApiClient::new(&base, Arc::new(MemoryTokenStore::new())).unwrap();

    assert_eq!(fetch_role(&client).await.unwrap(), None);
}

#[tokio::test]
async fn transport_failure_is_an_error_not_a_logout() {
    // Bind then drop to get a port nothing is listening on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = Arc::new(MemoryTokenStore::with_token("t"));
    let client = ApiClient::new(&format!("http://{addr}/api"), store.clone()).unwrap();

    let err = client.get("JobPosting", None).await.unwrap_err();

    assert!(matches!(err, GatewayError::Transport(_)));
    assert_eq!(store.read().await.unwrap().as_deref(), Some("t"));
}
