//! Records exchanged between the application model and its backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated user as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-assigned user ID.
    pub id: String,
    /// Login email.
    pub email: String,
    /// Display name given at registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// A signed-in session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for API calls.
    pub access_token: String,
    /// Token used to obtain a new access token.
    pub refresh_token: String,
    /// When the access token stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// The signed-in user.
    pub user: Identity,
}

impl Session {
    /// Whether the access token has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Kinds of session change pushed by the auth provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// A session was restored or none exists.
    InitialSession,
    /// A user signed in.
    SignedIn,
    /// The user signed out.
    SignedOut,
    /// The access token was renewed.
    TokenRefreshed,
}

/// How far a sign-out reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignOutScope {
    /// Revoke every session of the user.
    #[default]
    Global,
    /// Revoke only the current session.
    Local,
}

impl SignOutScope {
    /// Query string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignOutScope::Global => "global",
            SignOutScope::Local => "local",
        }
    }
}

/// Registration data.
#[derive(Debug, Clone)]
pub struct SignUp {
    /// Login email.
    pub email: String,
    /// Plain-text password.
    pub password: String,
    /// Display name stored as profile metadata.
    pub display_name: String,
}

/// A storage bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Bucket name.
    pub name: String,
    /// Whether objects are readable without a signed URL.
    pub public: bool,
}

/// One entry of a namespace listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    /// Provider-assigned object ID.
    pub id: String,
    /// Name within the namespace (no prefix).
    pub name: String,
    /// When the object was (last) written.
    pub created_at: DateTime<Utc>,
    /// Size in bytes, if known.
    #[serde(default)]
    pub size: Option<u64>,
    /// Content type, if known.
    #[serde(default)]
    pub mimetype: Option<String>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Bytes of a downloaded object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// Object content.
    pub bytes: Vec<u8>,
    /// Content type reported by storage.
    pub content_type: String,
}

/// Persisted association between a storage path and the act of sharing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShareRecord {
    /// Storage path `{owner_id}/{name}`; unique key.
    pub file_path: String,
    /// When the share was (last) created.
    pub created_at: DateTime<Utc>,
    /// Identifier of the shared object.
    pub file_id: String,
    /// Identity that shared the path.
    pub created_by: Option<String>,
}

/// Build the storage path of a file in a namespace.
pub fn object_path(owner_id: &str, name: &str) -> String {
    format!("{owner_id}/{name}")
}

/// Last segment of a storage path.
pub fn path_file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_path() {
        assert_eq!(object_path("u1", "a.pdf"), "u1/a.pdf");
    }

    #[test]
    fn test_path_file_name() {
        assert_eq!(path_file_name("u1/a.pdf"), "a.pdf");
        assert_eq!(path_file_name("a.pdf"), "a.pdf");
        assert_eq!(path_file_name("u1/"), "");
    }

    #[test]
    fn test_sign_out_scope_as_str() {
        assert_eq!(SignOutScope::Global.as_str(), "global");
        assert_eq!(SignOutScope::Local.as_str(), "local");
        assert_eq!(SignOutScope::default(), SignOutScope::Global);
    }

    #[test]
    fn test_session_expiry() {
        let session = Session {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: Utc::now() - chrono::Duration::seconds(1),
            user: Identity {
                id: "u1".to_string(),
                email: "u1@example.com".to_string(),
                display_name: None,
            },
        };
        assert!(session.is_expired());
    }
}
