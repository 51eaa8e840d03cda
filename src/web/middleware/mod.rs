//! Middleware for the HTTP API.

pub mod api_key;
pub mod auth;
pub mod cors;
pub mod rate_limit;
pub mod security;

pub use api_key::{require_api_key, API_KEY_HEADER};
pub use auth::{jwt_auth, AuthUser, OptionalAuthUser};
pub use cors::create_cors_layer;
pub use rate_limit::{login_rate_limit, RateLimitState};
pub use security::security_headers;
