//! Integration tests for Taskboard
//!
//! The session tests run the library against an in-process axum backend that
//! speaks just enough of the OAuth, CSRF, REST and JSON:API endpoints. The
//! CLI tests drive the binary with a temporary state directory.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create a taskboard Command isolated from the caller's
/// environment and `.env`
fn taskboard(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("taskboard");
    cmd.current_dir(dir.path())
        .env_remove("TASKBOARD_BASE_URL")
        .env_remove("TASKBOARD_CLIENT_ID")
        .env_remove("TASKBOARD_CLIENT_SECRET")
        .env_remove("TASKBOARD_STATE_DIR")
        .env_remove("RUST_LOG");
    cmd
}

// =============================================================================
// Mock backend
// =============================================================================

mod backend {
    use axum::extract::{Form, Path, RawQuery, State};
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    pub const USERNAME: &str = "alice";
    pub const PASSWORD: &str = "secret";
    pub const REFRESH_TOKEN: &str = "refresh-token";

    #[derive(Default)]
    pub struct MockState {
        pub valid_token: Mutex<String>,
        pub current_csrf: Mutex<String>,
        pub issued: AtomicUsize,
        pub refreshes: AtomicUsize,
        pub me_calls: AtomicUsize,
        pub csrf_fetches: AtomicUsize,
        pub heartbeats: AtomicUsize,
        pub uploads: AtomicUsize,
        /// Every bearer token is refused, even freshly issued ones
        pub reject_all: AtomicBool,
        /// Every CSRF token is refused
        pub reject_csrf: AtomicBool,
    }

    impl MockState {
        pub fn count(counter: &AtomicUsize) -> usize {
            counter.load(Ordering::SeqCst)
        }

        /// Invalidate the current access token server-side.
        pub fn revoke_access(&self) {
            *self.valid_token.lock().unwrap() = "revoked".to_string();
        }

        pub fn rotate_csrf(&self) {
            *self.current_csrf.lock().unwrap() = "rotated".to_string();
        }

        fn issue(&self) -> Value {
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            let token = format!("access-{}", n);
            *self.valid_token.lock().unwrap() = token.clone();
            json!({
                "access_token": token,
                "refresh_token": REFRESH_TOKEN,
                "token_type": "Bearer",
                "expires_in": 3600
            })
        }

        fn authorized(&self, headers: &HeaderMap) -> bool {
            if self.reject_all.load(Ordering::SeqCst) {
                return false;
            }
            let expected = format!("Bearer {}", self.valid_token.lock().unwrap());
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                == Some(expected.as_str())
        }

        fn csrf_ok(&self, headers: &HeaderMap) -> bool {
            if self.reject_csrf.load(Ordering::SeqCst) {
                return false;
            }
            let current = self.current_csrf.lock().unwrap().clone();
            headers.get("X-CSRF-Token").and_then(|v| v.to_str().ok()) == Some(current.as_str())
        }
    }

    type Shared = State<Arc<MockState>>;

    fn unauthorized() -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "The access token is invalid."})),
        )
            .into_response()
    }

    fn csrf_rejected() -> Response {
        (
            StatusCode::FORBIDDEN,
            Json(json!({"message": "X-CSRF-Token request header is invalid"})),
        )
            .into_response()
    }

    fn not_found() -> Response {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"errors": [{"title": "Not Found", "detail": "No such resource."}]})),
        )
            .into_response()
    }

    async fn token(State(state): Shared, Form(form): Form<HashMap<String, String>>) -> Response {
        let field = |name: &str| form.get(name).map(String::as_str);
        match field("grant_type") {
            Some("password") if field("username") == Some(USERNAME) && field("password") == Some(PASSWORD) => {
                Json(state.issue()).into_response()
            }
            Some("refresh_token") => {
                state.refreshes.fetch_add(1, Ordering::SeqCst);
                if field("refresh_token") == Some(REFRESH_TOKEN) {
                    Json(state.issue()).into_response()
                } else {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(json!({"error": "invalid_grant", "error_description": "The refresh token is invalid."})),
                    )
                        .into_response()
                }
            }
            _ => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "invalid_grant", "error_description": "The user credentials were incorrect."})),
            )
                .into_response(),
        }
    }

    async fn csrf_token(State(state): Shared) -> String {
        let n = state.csrf_fetches.fetch_add(1, Ordering::SeqCst) + 1;
        let token = format!("csrf-{}", n);
        *state.current_csrf.lock().unwrap() = token.clone();
        token
    }

    async fn me(State(state): Shared, headers: HeaderMap) -> Response {
        state.me_calls.fetch_add(1, Ordering::SeqCst);
        if !state.authorized(&headers) {
            return unauthorized();
        }
        Json(json!({
            "id": "u-alice",
            "uid": 7,
            "name": "alice",
            "email": "alice@example.com",
            "roles": ["authenticated"]
        }))
        .into_response()
    }

    async fn heartbeat(State(state): Shared, Path(_board): Path<String>, headers: HeaderMap) -> Response {
        state.heartbeats.fetch_add(1, Ordering::SeqCst);
        if !state.authorized(&headers) {
            return unauthorized();
        }
        if !state.csrf_ok(&headers) {
            return csrf_rejected();
        }
        Json(json!([{"userId": "u-alice", "name": "alice"}])).into_response()
    }

    async fn upload(State(state): Shared, Path(_card): Path<String>, headers: HeaderMap) -> Response {
        state.uploads.fetch_add(1, Ordering::SeqCst);
        if !state.authorized(&headers) {
            return unauthorized();
        }
        let multipart = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));
        if !multipart || !state.csrf_ok(&headers) {
            return (StatusCode::BAD_REQUEST, Json(json!({"message": "bad upload"}))).into_response();
        }
        Json(json!({
            "data": {
                "type": "file--file",
                "id": "f-1",
                "attributes": {
                    "filename": "notes.txt",
                    "filemime": "text/plain",
                    "filesize": 3,
                    "uri": {"value": "public://notes.txt", "url": "/files/notes.txt"}
                }
            }
        }))
        .into_response()
    }

    async fn member_roles(State(state): Shared, RawQuery(query): RawQuery, headers: HeaderMap) -> Response {
        if !state.authorized(&headers) {
            return unauthorized();
        }
        let data = if query.unwrap_or_default().contains("ws-1") {
            json!([{
                "type": "member_role--member_role",
                "id": "m-1",
                "relationships": {
                    "workspace": {"data": {"type": "node--workspace", "id": "ws-1"}},
                    "user": {"data": {"type": "user--user", "id": "u-alice"}},
                    "role": {"data": {"type": "workspace_role--workspace_role", "id": "r-viewer"}}
                }
            }])
        } else {
            json!([])
        };
        Json(json!({"data": data})).into_response()
    }

    fn viewer_role() -> Value {
        json!({
            "type": "workspace_role--workspace_role",
            "id": "r-viewer",
            "attributes": {
                "label": "Viewer",
                "machine_name": "viewer",
                "cardView": "any",
                "cardEdit": "own",
                "cardDelete": "none",
                "reportView": "none"
            }
        })
    }

    fn member_role() -> Value {
        json!({
            "type": "workspace_role--workspace_role",
            "id": "r-member",
            "attributes": {
                "label": "Member",
                "is_default": true,
                "cardView": "any",
                "cardCreate": "any",
                "cardEdit": "any",
                "reportView": "any"
            }
        })
    }

    async fn workspace_role(State(state): Shared, Path(id): Path<String>, headers: HeaderMap) -> Response {
        if !state.authorized(&headers) {
            return unauthorized();
        }
        match id.as_str() {
            "r-viewer" => Json(json!({"data": viewer_role()})).into_response(),
            "r-member" => Json(json!({"data": member_role()})).into_response(),
            _ => not_found(),
        }
    }

    async fn workspace(State(state): Shared, Path(id): Path<String>, headers: HeaderMap) -> Response {
        if !state.authorized(&headers) {
            return unauthorized();
        }
        match id.as_str() {
            "ws-2" => Json(json!({
                "data": {
                    "type": "node--workspace",
                    "id": "ws-2",
                    "attributes": {"title": "Design"},
                    "relationships": {
                        "default_role": {"data": {"type": "workspace_role--workspace_role", "id": "r-member"}}
                    }
                },
                "included": [member_role()]
            }))
            .into_response(),
            "ws-3" => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"message": "database unavailable"})),
            )
                .into_response(),
            _ => not_found(),
        }
    }

    /// Start the backend on an ephemeral port; returns its base URL.
    pub async fn spawn() -> (String, Arc<MockState>) {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/oauth/token", post(token))
            .route("/session/token", get(csrf_token))
            .route("/api/me", get(me))
            .route("/api/presence/{board}/heartbeat", post(heartbeat))
            .route("/api/cards/{card}/attachments", post(upload))
            .route("/jsonapi/member_role/member_role", get(member_roles))
            .route("/jsonapi/workspace_role/workspace_role/{id}", get(workspace_role))
            .route("/jsonapi/node/workspace/{id}", get(workspace))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), state)
    }
}

// =============================================================================
// Session, retry and permission flows
// =============================================================================

mod session_flow {
    use super::backend::{self, MockState, PASSWORD, USERNAME};
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use taskboard::TaskboardClient;
    use taskboard::api;
    use taskboard::config::Config;
    use taskboard::errors::{ApiError, LoginError, UploadError};
    use taskboard::navigation::{LoginRedirect, RecordingNavigator};
    use taskboard::permissions::{Permission, PermissionOrigin, Resource};
    use taskboard::session::{MemoryStorage, SessionEventKind};

    fn client_with(config: Config) -> (TaskboardClient, Arc<RecordingNavigator>) {
        let navigator = Arc::new(RecordingNavigator::new());
        let client = TaskboardClient::new(config, Box::new(MemoryStorage::new()), navigator.clone())
            .unwrap();
        (client, navigator)
    }

    async fn logged_in() -> (TaskboardClient, Arc<RecordingNavigator>, Arc<MockState>) {
        let (base, state) = backend::spawn().await;
        let (client, navigator) = client_with(Config::for_base_url(base, "web"));
        client.login(USERNAME, PASSWORD).await.unwrap();
        (client, navigator, state)
    }

    #[tokio::test]
    async fn test_login_stores_tokens_and_starts_monitor() {
        let (client, navigator, _state) = logged_in().await;

        let tokens = client.session().tokens();
        assert_eq!(tokens.access_token().as_deref(), Some("access-1"));
        assert_eq!(tokens.refresh_token().as_deref(), Some("refresh-token"));
        assert!(tokens.expires_at().is_some());
        assert!(client.is_authenticated());
        assert!(client.monitor().is_running());

        let me = client.me().await.unwrap();
        assert_eq!(me.id, "u-alice");
        assert_eq!(me.uid, Some(7));
        assert!(navigator.redirects().is_empty());
    }

    #[tokio::test]
    async fn test_login_with_wrong_password_is_invalid_credentials() {
        let (base, _state) = backend::spawn().await;
        let (client, _) = client_with(Config::for_base_url(base, "web"));

        let err = client.login(USERNAME, "wrong").await.unwrap_err();
        assert!(matches!(err, LoginError::InvalidCredentials));
        assert!(client.session().tokens().access_token().is_none());
        assert!(!client.monitor().is_running());
    }

    #[tokio::test]
    async fn test_unauthorized_refreshes_once_and_retries() {
        let (client, navigator, state) = logged_in().await;
        let mut events = client.subscribe();
        state.revoke_access();

        let me = client.me().await.unwrap();
        assert_eq!(me.name, "alice");
        assert_eq!(MockState::count(&state.refreshes), 1);
        assert_eq!(MockState::count(&state.me_calls), 2);
        assert_eq!(
            client.session().tokens().access_token().as_deref(),
            Some("access-2")
        );
        assert_eq!(events.try_recv().unwrap().kind, SessionEventKind::Refreshed);
        assert!(navigator.redirects().is_empty());
    }

    #[tokio::test]
    async fn test_second_unauthorized_redirects_without_looping() {
        let (client, navigator, state) = logged_in().await;
        state.reject_all.store(true, Ordering::SeqCst);

        let err = client.me().await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
        assert_eq!(MockState::count(&state.refreshes), 1);
        assert_eq!(MockState::count(&state.me_calls), 2);
        assert_eq!(navigator.redirects(), vec![LoginRedirect::Unauthorized]);
    }

    #[tokio::test]
    async fn test_rejected_refresh_clears_session_and_redirects() {
        let (base, state) = backend::spawn().await;
        let (client, navigator) = client_with(Config::for_base_url(base, "web"));
        let tokens = client.session().tokens();
        tokens.set_access_token(Some("stale".into()));
        tokens.set_refresh_token(Some("not-a-refresh-token".into()));

        let err = client.me().await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
        assert_eq!(MockState::count(&state.refreshes), 1);
        assert_eq!(MockState::count(&state.me_calls), 1);
        assert!(tokens.access_token().is_none());
        assert!(tokens.refresh_token().is_none());
        assert_eq!(navigator.redirects(), vec![LoginRedirect::Unauthorized]);
    }

    #[tokio::test]
    async fn test_concurrent_unauthorized_requests_share_one_refresh() {
        let (client, _navigator, state) = logged_in().await;
        state.revoke_access();

        let results = futures::future::join_all((0..3).map(|_| client.me())).await;
        assert!(results.iter().all(Result::is_ok));
        assert_eq!(MockState::count(&state.refreshes), 1);
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_returns_none() {
        let (base, state) = backend::spawn().await;
        let (client, _) = client_with(Config::for_base_url(base, "web"));

        assert!(client.refresh().await.is_none());
        assert_eq!(MockState::count(&state.refreshes), 0);
    }

    #[tokio::test]
    async fn test_csrf_token_is_cached_across_mutations() {
        let (client, _navigator, state) = logged_in().await;

        api::presence::heartbeat(client.api(), "b-1", "s-1").await.unwrap();
        let viewers = api::presence::heartbeat(client.api(), "b-1", "s-1").await.unwrap();
        assert_eq!(viewers[0].user_id, "u-alice");
        assert_eq!(MockState::count(&state.csrf_fetches), 1);
        assert_eq!(MockState::count(&state.heartbeats), 2);
    }

    #[tokio::test]
    async fn test_stale_csrf_token_is_refetched_once() {
        let (client, _navigator, state) = logged_in().await;
        api::presence::heartbeat(client.api(), "b-1", "s-1").await.unwrap();
        state.rotate_csrf();

        api::presence::heartbeat(client.api(), "b-1", "s-1").await.unwrap();
        assert_eq!(MockState::count(&state.csrf_fetches), 2);
        assert_eq!(MockState::count(&state.heartbeats), 3);
        assert_eq!(client.session().csrf().cached().as_deref(), Some("csrf-2"));
    }

    #[tokio::test]
    async fn test_persistent_csrf_rejection_is_a_backend_error() {
        let (client, navigator, state) = logged_in().await;
        state.reject_csrf.store(true, Ordering::SeqCst);

        let err = api::presence::heartbeat(client.api(), "b-1", "s-1")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert!(err.to_string().contains("CSRF"));
        assert_eq!(MockState::count(&state.heartbeats), 2);
        assert_eq!(MockState::count(&state.csrf_fetches), 2);
        assert!(navigator.redirects().is_empty());
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let (client, _navigator, _state) = logged_in().await;
        client.logout();

        let tokens = client.session().tokens();
        assert!(tokens.access_token().is_none());
        assert!(tokens.refresh_token().is_none());
        assert!(tokens.expires_at().is_none());
        assert!(client.session().csrf().cached().is_none());
        assert!(!client.monitor().is_running());
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn test_upload_over_limit_never_reaches_backend() {
        let (base, state) = backend::spawn().await;
        let mut config = Config::for_base_url(base, "web");
        config.uploads.max_bytes = 4;
        let (client, _) = client_with(config);
        client.login(USERNAME, PASSWORD).await.unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"0123456789").unwrap();

        let err = client.upload_attachment("c-1", &path).await.unwrap_err();
        match err {
            UploadError::TooLarge { size, limit, .. } => {
                assert_eq!(size, 10);
                assert_eq!(limit, 4);
            }
            other => panic!("Expected TooLarge, got {:?}", other),
        }
        assert_eq!(MockState::count(&state.uploads), 0);
        assert_eq!(MockState::count(&state.csrf_fetches), 0);
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_with_csrf() {
        let (client, _navigator, state) = logged_in().await;
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"abc").unwrap();

        let attachment = client.upload_attachment("c-1", &path).await.unwrap();
        assert_eq!(attachment.id, "f-1");
        assert_eq!(attachment.file_name, "notes.txt");
        assert_eq!(attachment.mime_type, "text/plain");
        assert_eq!(attachment.url.as_deref(), Some("/files/notes.txt"));
        assert_eq!(MockState::count(&state.uploads), 1);
    }

    #[tokio::test]
    async fn test_permissions_from_member_assignment() {
        let (client, _navigator, _state) = logged_in().await;

        let effective = client.my_permissions("ws-1").await.unwrap();
        assert_eq!(
            effective.origin,
            PermissionOrigin::Assignment {
                role_id: "r-viewer".into(),
                role_name: "viewer".into()
            }
        );
        assert!(effective.can_view(Resource::Card, false));
        assert!(effective.can_edit(Resource::Card, true));
        assert!(!effective.can_edit(Resource::Card, false));
        assert!(!effective.allows(Permission::CardDelete, true));
        assert!(!effective.can_view_reports());
    }

    #[tokio::test]
    async fn test_permissions_from_workspace_default_role() {
        let (client, _navigator, _state) = logged_in().await;

        let effective = client.my_permissions("ws-2").await.unwrap();
        assert!(matches!(
            effective.origin,
            PermissionOrigin::DefaultRole { ref role_id, .. } if role_id == "r-member"
        ));
        assert!(effective.can_create(Resource::Card));
        assert!(effective.can_view_reports());
        assert!(!effective.can_delete(Resource::Card, true));
    }

    #[tokio::test]
    async fn test_permissions_fall_back_when_backend_fails() {
        let (client, _navigator, _state) = logged_in().await;

        let effective = client.my_permissions("ws-3").await.unwrap();
        assert_eq!(effective.origin, PermissionOrigin::Fallback);
        assert!(effective.can_edit(Resource::Card, false));
        assert!(!effective.can_view_reports());
        assert!(!effective.can_access_admin());
    }

    #[tokio::test]
    async fn test_role_change_invalidates_cached_permissions() {
        let (client, _navigator, _state) = logged_in().await;
        let first = client.my_permissions("ws-1").await.unwrap();
        let again = client.my_permissions("ws-1").await.unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        let before = client.evaluator().version();
        client.evaluator().invalidate();
        assert!(client.evaluator().version() > before);
        let after = client.my_permissions("ws-1").await.unwrap();
        assert!(!Arc::ptr_eq(&first, &after));
        assert_eq!(first.set, after.set);
    }
}

// =============================================================================
// CLI
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_taskboard_help() {
        let dir = TempDir::new().unwrap();
        taskboard(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("login"))
            .stdout(predicate::str::contains("permissions"));
    }

    #[test]
    fn test_taskboard_version() {
        let dir = TempDir::new().unwrap();
        taskboard(&dir).arg("--version").assert().success();
    }

    #[test]
    fn test_status_without_session() {
        let dir = TempDir::new().unwrap();
        taskboard(&dir)
            .arg("--state-dir")
            .arg(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("Not logged in."));
    }

    #[test]
    fn test_status_reads_persisted_session() {
        let dir = TempDir::new().unwrap();
        let expires = (chrono::Utc::now() + chrono::Duration::hours(1)).to_rfc3339();
        let session = serde_json::json!({
            "taskboard.access_token": "a",
            "taskboard.refresh_token": "r",
            "taskboard.token_expires_at": expires,
        });
        fs::write(dir.path().join("session.json"), session.to_string()).unwrap();

        taskboard(&dir)
            .arg("--state-dir")
            .arg(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("active"))
            .stdout(predicate::str::contains("stored"));
    }

    #[test]
    fn test_logout_removes_persisted_tokens() {
        let dir = TempDir::new().unwrap();
        let session = serde_json::json!({
            "taskboard.access_token": "a",
            "taskboard.refresh_token": "r",
        });
        let path = dir.path().join("session.json");
        fs::write(&path, session.to_string()).unwrap();

        taskboard(&dir)
            .arg("--state-dir")
            .arg(dir.path())
            .arg("logout")
            .assert()
            .success()
            .stdout(predicate::str::contains("Logged out."));

        let remaining: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(remaining, serde_json::json!({}));
    }

    #[test]
    fn test_logout_without_session() {
        let dir = TempDir::new().unwrap();
        taskboard(&dir)
            .arg("--state-dir")
            .arg(dir.path())
            .arg("logout")
            .assert()
            .success()
            .stdout(predicate::str::contains("No stored session."));
    }

    #[test]
    fn test_config_validate_requires_client_id() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("taskboard.toml");
        fs::write(&config, "[server]\nbase_url = \"http://localhost:8080\"\n").unwrap();

        taskboard(&dir)
            .arg("--config")
            .arg(&config)
            .args(["config", "validate"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("client id"));
    }

    #[test]
    fn test_config_validate_accepts_complete_file() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("taskboard.toml");
        fs::write(
            &config,
            "[server]\nbase_url = \"http://localhost:8080\"\n\n[oauth]\nclient_id = \"web\"\n",
        )
        .unwrap();

        taskboard(&dir)
            .arg("--config")
            .arg(&config)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid."));
    }

    #[test]
    fn test_config_show_applies_base_url_flag() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("taskboard.toml");
        fs::write(&config, "[oauth]\nclient_id = \"web\"\n").unwrap();

        taskboard(&dir)
            .arg("--config")
            .arg(&config)
            .args(["--base-url", "https://tasks.example.com"])
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("https://tasks.example.com"));
    }

    #[test]
    fn test_config_path_uses_flag() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("custom.toml");
        taskboard(&dir)
            .arg("--config")
            .arg(&config)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("custom.toml"));
    }

    #[test]
    fn test_can_rejects_unknown_permission() {
        let dir = TempDir::new().unwrap();
        taskboard(&dir)
            .arg("--state-dir")
            .arg(dir.path())
            .args(["can", "ws-1", "card:teleport"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown"));
    }
}
