//! Sign-in rate limiting.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use parking_lot::RwLock;
use std::{collections::HashMap, net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};

use crate::web::error::ApiError;

/// Per-IP rate limiter.
pub type IpRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Per-IP quotas for password sign-in.
#[derive(Clone)]
pub struct RateLimitState {
    limiters: Arc<RwLock<HashMap<String, Arc<IpRateLimiter>>>>,
    per_minute: u32,
}

impl RateLimitState {
    /// Create a state allowing `per_minute` sign-in attempts per IP.
    pub fn new(per_minute: u32) -> Self {
        Self {
            limiters: Arc::new(RwLock::new(HashMap::new())),
            per_minute,
        }
    }

    fn limiter(&self, ip: &str) -> Arc<IpRateLimiter> {
        if let Some(limiter) = self.limiters.read().get(ip) {
            return limiter.clone();
        }

        let mut limiters = self.limiters.write();
        limiters
            .entry(ip.to_string())
            .or_insert_with(|| {
                let quota =
                    Quota::per_minute(NonZeroU32::new(self.per_minute).unwrap_or(NonZeroU32::MIN));
                Arc::new(RateLimiter::direct(quota))
            })
            .clone()
    }

    /// Whether another sign-in attempt from `ip` is allowed.
    pub fn check(&self, ip: &str) -> bool {
        self.limiter(ip).check().is_ok()
    }

    /// Drop limiters nobody holds.
    pub fn cleanup(&self) {
        self.limiters.write().retain(|_, v| Arc::strong_count(v) > 1);
    }

    /// Start a background task running [`cleanup`](Self::cleanup) every five minutes.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            interval.tick().await;
            loop {
                interval.tick().await;
                self.cleanup();
            }
        });
    }
}

/// Client IP, preferring proxy headers over the socket address.
fn get_client_ip(req: &Request<Body>) -> String {
    if let Some(ip) = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        return ip.trim().to_string();
    }

    if let Some(real_ip) = req.headers().get("X-Real-IP").and_then(|v| v.to_str().ok()) {
        return real_ip.to_string();
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

fn is_password_grant(req: &Request<Body>) -> bool {
    req.uri()
        .query()
        .is_some_and(|q| q.split('&').any(|pair| pair == "grant_type=password"))
}

/// Rate limit password sign-in attempts. Other token grants pass through.
pub async fn login_rate_limit(
    state: Arc<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !is_password_grant(&req) {
        return next.run(req).await;
    }

    let ip = get_client_ip(&req);
    if !state.check(&ip) {
        tracing::warn!(ip = %ip, "Sign-in rate limit exceeded");
        return ApiError::too_many_requests("Too many sign-in attempts. Please try again later.")
            .into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_per_ip() {
        let state = RateLimitState::new(3);

        assert!(state.check("127.0.0.1"));
        assert!(state.check("127.0.0.1"));
        assert!(state.check("127.0.0.1"));
        assert!(!state.check("127.0.0.1"));

        assert!(state.check("192.168.1.1"));
    }

    #[test]
    fn test_client_ip_from_forwarded_header() {
        let req = Request::builder()
            .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(get_client_ip(&req), "203.0.113.7");

        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(get_client_ip(&req), "unknown");
    }

    #[test]
    fn test_only_password_grant_limited() {
        let req = Request::builder()
            .uri("/auth/v1/token?grant_type=password")
            .body(Body::empty())
            .unwrap();
        assert!(is_password_grant(&req));

        let req = Request::builder()
            .uri("/auth/v1/token?grant_type=refresh_token")
            .body(Body::empty())
            .unwrap();
        assert!(!is_password_grant(&req));
    }

    #[test]
    fn test_cleanup_drops_idle_limiters() {
        let state = RateLimitState::new(3);
        state.check("127.0.0.1");
        state.cleanup();
        assert!(state.limiters.read().is_empty());
    }
}
