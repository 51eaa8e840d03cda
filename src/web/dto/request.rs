//! Request DTOs for the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validation::{no_control_chars, not_empty_trimmed};
use crate::model::SignOutScope;

/// Registration request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SignUpRequest {
    /// Login email.
    #[validate(custom(function = "not_empty_trimmed"))]
    pub email: String,
    /// Password.
    pub password: String,
    /// Profile metadata.
    #[serde(default)]
    pub data: SignUpData,
}

/// Profile metadata attached at registration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SignUpData {
    /// Display name.
    #[serde(default)]
    pub full_name: String,
}

/// Query of the token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    /// `password` or `refresh_token`.
    pub grant_type: String,
}

/// Body of the token endpoint. Which fields are required depends on the
/// grant type.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TokenRequest {
    /// Login email (password grant).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Password (password grant).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Refresh token (refresh grant).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Query of the logout endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct LogoutQuery {
    /// How far the sign-out reaches.
    #[serde(default)]
    pub scope: SignOutScope,
}

/// Body of the logout endpoint.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LogoutRequest {
    /// Refresh token to revoke for a local sign-out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Listing request.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListRequest {
    /// Namespace to list.
    #[serde(default)]
    pub prefix: String,
}

/// Bulk removal request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RemoveRequest {
    /// Object paths to remove.
    #[validate(length(min = 1, message = "At least one path is required"))]
    pub prefixes: Vec<String>,
}

/// Signed URL request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SignRequest {
    /// Lifetime of the URL in seconds.
    #[serde(rename = "expiresIn")]
    #[validate(range(
        min = 1,
        max = 31_449_600,
        message = "expiresIn must be between 1 and 31449600 seconds"
    ))]
    pub expires_in: u64,
}

/// Query carried by a signed URL.
#[derive(Debug, Deserialize)]
pub struct SignedUrlQuery {
    /// Signature.
    pub token: String,
    /// Expiry as unix seconds.
    pub expires: i64,
}

/// Share upsert request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ShareRequest {
    /// Shared storage path.
    #[validate(custom(function = "no_control_chars"))]
    pub file_path: String,
    /// Identifier of the shared object.
    #[validate(custom(function = "not_empty_trimmed"))]
    pub file_id: String,
    /// Share time; defaults to now.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Share lookup query. Exactly one key is expected.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ShareQuery {
    /// Look up by storage path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Look up by object identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
}
