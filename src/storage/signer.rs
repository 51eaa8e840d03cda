//! Signed object URLs.
//!
//! A signed URL has the form
//! `{public_url}/storage/v1/object/sign/{bucket}/{path}?token={token}&expires={unix}`
//! where `token` is the hex HMAC-SHA256 of bucket, path and expiry keyed by
//! the signing secret.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{FileShareError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Longest lifetime a signed URL may have (52 weeks).
pub const MAX_TTL_SECS: u64 = 604_800 * 52;

/// Creates and checks signed URLs.
#[derive(Clone)]
pub struct UrlSigner {
    secret: String,
    public_url: String,
}

impl UrlSigner {
    /// Create a signer.
    pub fn new(secret: impl Into<String>, public_url: &str) -> Self {
        Self {
            secret: secret.into(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL objects are served from.
    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    fn mac(&self, bucket: &str, path: &str, expires: i64) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| FileShareError::Storage(format!("invalid signing key: {e}")))?;
        mac.update(bucket.as_bytes());
        mac.update(&[0u8]);
        mac.update(path.as_bytes());
        mac.update(&[0u8]);
        mac.update(expires.to_string().as_bytes());
        Ok(mac)
    }

    fn token(&self, bucket: &str, path: &str, expires: i64) -> Result<String> {
        let mac = self.mac(bucket, path, expires)?;
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Build a URL valid for `ttl_secs` seconds.
    ///
    /// Lifetimes above [`MAX_TTL_SECS`] are rejected.
    pub fn sign(&self, bucket: &str, path: &str, ttl_secs: u64) -> Result<String> {
        if ttl_secs > MAX_TTL_SECS {
            return Err(FileShareError::Validation(format!(
                "expiresIn must be at most {MAX_TTL_SECS} seconds"
            )));
        }
        let expires = i64::try_from(ttl_secs)
            .ok()
            .and_then(|ttl| Utc::now().timestamp().checked_add(ttl))
            .ok_or_else(|| FileShareError::Validation("expiresIn is out of range".to_string()))?;

        let token = self.token(bucket, path, expires)?;
        Ok(format!(
            "{}/storage/v1/object/sign/{}/{}?token={}&expires={}",
            self.public_url,
            bucket,
            encode_path(path),
            token,
            expires
        ))
    }

    /// Check a token presented for an object.
    pub fn verify(&self, bucket: &str, path: &str, token: &str, expires: i64) -> Result<()> {
        if expires < Utc::now().timestamp() {
            return Err(FileShareError::Permission("Signed URL has expired".to_string()));
        }
        let invalid = || FileShareError::Permission("Invalid signature".to_string());
        let presented = hex::decode(token).map_err(|_| invalid())?;
        self.mac(bucket, path, expires)?
            .verify_slice(&presented)
            .map_err(|_| invalid())
    }

    /// Public endpoint URL of an object.
    pub fn public_object_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.public_url,
            bucket,
            encode_path(path)
        )
    }
}

/// Percent-encode each path segment, keeping the separators.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
