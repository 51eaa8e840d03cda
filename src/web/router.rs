//! Router configuration for the HTTP API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    create_signed_url, get_authenticated_object, get_bucket, get_public_object, get_share,
    get_signed_object, list_objects, logout, remove_objects, signup, token, upload_object,
    upsert_share, user, AppState,
};
use super::middleware::{
    create_cors_layer, jwt_auth, login_rate_limit, require_api_key, security_headers,
    RateLimitState,
};
use crate::config::ServerConfig;

/// Create the API router.
///
/// Every route requires the public API key when `api_key` is not empty.
pub fn create_router(app_state: Arc<AppState>, server: &ServerConfig, api_key: &str) -> Router {
    let rate_limit = Arc::new(RateLimitState::new(server.login_rate_limit));
    rate_limit.clone().start_cleanup_task();

    let token_routes = Router::new()
        .route("/token", post(token))
        .route_layer(middleware::from_fn(move |req, next| {
            login_rate_limit(rate_limit.clone(), req, next)
        }));

    let auth_routes = Router::new()
        .route("/signup", post(signup))
        .route("/logout", post(logout))
        .route("/user", get(user))
        .merge(token_routes);

    // Bodies one byte over the object cap still reach the handler so the
    // size error is reported by the storage service.
    let body_limit = usize::try_from(app_state.storage.max_object_size())
        .unwrap_or(usize::MAX)
        .saturating_add(1);

    let storage_routes = Router::new()
        .route("/bucket/:name", get(get_bucket))
        .route("/object/list/:bucket", post(list_objects))
        .route(
            "/object/sign/:bucket/*path",
            post(create_signed_url).get(get_signed_object),
        )
        .route("/object/public/:bucket/*path", get(get_public_object))
        .route(
            "/object/authenticated/:bucket/*path",
            get(get_authenticated_object),
        )
        .route("/object/:bucket", delete(remove_objects))
        .route("/object/:bucket/*path", post(upload_object))
        .layer(DefaultBodyLimit::max(body_limit));

    let rest_routes = Router::new().route("/shares", get(get_share).post(upsert_share));

    let issuer = app_state.auth.issuer().clone();
    let api_key = Arc::new(api_key.to_string());

    Router::new()
        .nest("/auth/v1", auth_routes)
        .nest("/storage/v1", storage_routes)
        .nest("/rest/v1", rest_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(&server.cors_origins))
                .layer(middleware::from_fn(security_headers))
                .layer(middleware::from_fn(move |req, next| {
                    require_api_key(api_key.clone(), req, next)
                }))
                .layer(middleware::from_fn(move |req, next| {
                    jwt_auth(issuer.clone(), req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

async fn health_check() -> &'static str {
    "OK"
}
