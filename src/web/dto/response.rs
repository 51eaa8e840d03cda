//! Response DTOs for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::model::{Identity, Session};

/// Generic API response wrapper.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Response data.
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Session issued by the token endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Access token (JWT).
    pub access_token: String,
    /// Always `bearer`.
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    /// Access token expiry as unix seconds.
    pub expires_at: i64,
    /// Refresh token.
    pub refresh_token: String,
    /// The signed-in user.
    pub user: Identity,
}

impl TokenResponse {
    /// Build the response for a session.
    pub fn from_session(session: Session, expires_in: u64) -> Self {
        Self {
            access_token: session.access_token,
            token_type: "bearer".to_string(),
            expires_in,
            expires_at: session.expires_at.timestamp(),
            refresh_token: session.refresh_token,
            user: session.user,
        }
    }

    /// Convert back into a session.
    pub fn into_session(self) -> Session {
        let expires_at = chrono::DateTime::from_timestamp(self.expires_at, 0)
            .unwrap_or_else(chrono::Utc::now);
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// A created signed URL.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignedUrlResponse {
    /// Absolute URL.
    #[serde(rename = "signedUrl")]
    pub signed_url: String,
}

/// A stored object.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Object identifier.
    pub id: String,
    /// Storage path.
    pub path: String,
}
