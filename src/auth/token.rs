//! Access and refresh token issuing.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::db::User;
use crate::{FileShareError, Result};

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID).
    pub sub: String,
    /// Login email.
    pub email: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Issued at timestamp.
    pub iat: u64,
    /// Expiration timestamp.
    pub exp: u64,
    /// JWT ID (unique identifier).
    pub jti: String,
}

/// An issued access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Encoded JWT.
    pub token: String,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies access tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_expiry: u64,
    refresh_token_expiry_days: u64,
}

impl TokenIssuer {
    /// Create an issuer from a secret and lifetimes.
    pub fn new(secret: &str, access_token_expiry: u64, refresh_token_expiry_days: u64) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_token_expiry,
            refresh_token_expiry_days,
        }
    }

    /// Create an issuer from the auth configuration.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            config.access_token_expiry_secs,
            config.refresh_token_expiry_days,
        )
    }

    /// Access token lifetime in seconds.
    pub fn access_token_expiry(&self) -> u64 {
        self.access_token_expiry
    }

    /// Issue an access token for a user.
    pub fn issue_access_token(&self, user: &User) -> Result<AccessToken> {
        let now = Utc::now().timestamp() as u64;
        let exp = now + self.access_token_expiry;
        let claims = JwtClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            name: user.display_name.clone(),
            iat: now,
            exp,
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode JWT: {}", e);
            FileShareError::Auth("Failed to generate token".to_string())
        })?;

        let expires_at = Utc
            .timestamp_opt(exp as i64, 0)
            .single()
            .unwrap_or_else(Utc::now);

        Ok(AccessToken { token, expires_at })
    }

    /// Verify an access token and return its claims.
    pub fn verify(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("JWT validation failed: {}", e);
                FileShareError::Auth("Invalid or expired token".to_string())
            })
    }

    /// Generate an opaque refresh token.
    pub fn generate_refresh_token(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Expiry of a refresh token issued now, as unix seconds.
    pub fn refresh_token_expires_at(&self) -> i64 {
        (Utc::now() + Duration::days(self.refresh_token_expiry_days as i64)).timestamp()
    }
}
