//! Test helpers for integration tests.
//!
//! Builds the backend service over an in-memory database and a temporary
//! blob directory, and wires the application model to it.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use fileshare::app::{App, CollectionSettings, NoticeLog};
use fileshare::auth::{AuthService, TokenIssuer};
use fileshare::config::Config;
use fileshare::provider::{LocalBackend, Providers};
use fileshare::storage::StorageService;
use fileshare::web::{create_health_router, create_router, AppState};
use fileshare::Database;

/// Password used for every test account.
pub const PASSWORD: &str = "secret123";

/// Configuration pointing at a temporary directory.
pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.server.login_rate_limit = 1000;
    config.auth.jwt_secret = "test-secret-key-for-testing-only".to_string();
    config.storage.signing_secret = "test-signing-secret".to_string();
    config.storage.path = dir.path().join("objects").to_string_lossy().into_owned();
    config.files.app_origin = "https://files.example.com".to_string();
    config
}

/// Services over an in-memory database with the bucket created.
pub async fn create_services(config: &Config) -> (AuthService, StorageService) {
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    let issuer = Arc::new(TokenIssuer::from_config(&config.auth));
    let auth = AuthService::new(db.clone(), issuer);
    let storage =
        StorageService::from_config(db, &config.storage).expect("Failed to create storage");
    storage
        .ensure_bucket()
        .await
        .expect("Failed to create bucket");
    (auth, storage)
}

/// HTTP test server for the backend API.
pub async fn create_test_server(config: &Config) -> TestServer {
    let (auth, storage) = create_services(config).await;
    let app_state = Arc::new(AppState::new(auth, storage));
    let router = create_router(app_state, &config.server, &config.auth.api_key)
        .merge(create_health_router());
    TestServer::new(router).expect("Failed to create test server")
}

/// Register a user through the API.
pub async fn sign_up(server: &TestServer, email: &str) -> Value {
    let response = server
        .post("/auth/v1/signup")
        .json(&json!({
            "email": email,
            "password": PASSWORD,
            "data": { "full_name": "Test User" }
        }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()
}

/// Sign in through the API and return the token response.
pub async fn sign_in(server: &TestServer, email: &str) -> Value {
    let response = server
        .post("/auth/v1/token")
        .add_query_param("grant_type", "password")
        .json(&json!({ "email": email, "password": PASSWORD }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()
}

/// Register, sign in and return `(user_id, access_token)`.
pub async fn signed_in_user(server: &TestServer, email: &str) -> (String, String) {
    sign_up(server, email).await;
    let body = sign_in(server, email).await;
    (
        body["data"]["user"]["id"].as_str().unwrap().to_string(),
        body["data"]["access_token"].as_str().unwrap().to_string(),
    )
}

/// `Authorization` header value for a token.
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Application model over an in-process backend.
pub struct LocalApp {
    pub dir: TempDir,
    pub backend: Arc<LocalBackend>,
    pub notices: Arc<NoticeLog>,
    pub app: App,
}

/// Build an application model with two registered users,
/// `alice@example.com` and `bob@example.com`.
pub async fn local_app() -> LocalApp {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let (auth, storage) = create_services(&config).await;
    for email in ["alice@example.com", "bob@example.com"] {
        auth.sign_up(email, PASSWORD, "Test User").await.unwrap();
    }

    let backend = Arc::new(LocalBackend::new(auth, storage));
    let notices = Arc::new(NoticeLog::new());
    let app = App::new(
        Providers::from_backend(backend.clone()),
        CollectionSettings::from_config(&config),
        notices.clone(),
    );
    app.start().await;

    LocalApp {
        dir,
        backend,
        notices,
        app,
    }
}
