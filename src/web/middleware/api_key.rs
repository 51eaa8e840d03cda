//! Public API key check.

use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::web::error::ApiError;

/// Header carrying the public API key.
pub const API_KEY_HEADER: &str = "apikey";

/// Reject requests whose `apikey` header does not match `expected`.
///
/// An empty `expected` key disables the check.
pub async fn require_api_key(expected: Arc<String>, req: Request<Body>, next: Next) -> Response {
    if expected.is_empty() {
        return next.run(req).await;
    }

    let presented = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    if presented != Some(expected.as_str()) {
        tracing::debug!(path = %req.uri().path(), "Rejected request with missing or wrong API key");
        return ApiError::unauthorized("Invalid API key").into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware, routing::get, Router};
    use tower::util::ServiceExt;

    fn app(key: &str) -> Router {
        let key = Arc::new(key.to_string());
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn(move |req, next| {
                require_api_key(key.clone(), req, next)
            }))
    }

    async fn status(app: Router, key: Option<&str>) -> StatusCode {
        let mut builder = Request::builder().uri("/");
        if let Some(key) = key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        app.oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_key_enforced_when_configured() {
        assert_eq!(status(app("anon-key"), Some("anon-key")).await, StatusCode::OK);
        assert_eq!(
            status(app("anon-key"), Some("wrong")).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status(app("anon-key"), None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_empty_key_disables_check() {
        assert_eq!(status(app(""), None).await, StatusCode::OK);
    }
}
