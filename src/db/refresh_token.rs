//! Refresh token repository for session renewal.

use chrono::{DateTime, Utc};

use super::DbPool;
use crate::{FileShareError, Result};

/// Refresh token entity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    /// Token ID.
    pub id: i64,
    /// Owning user ID.
    pub user_id: String,
    /// Token string.
    pub token: String,
    /// Expiration as unix seconds.
    pub expires_at: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Revocation timestamp (None if not revoked).
    pub revoked_at: Option<DateTime<Utc>>,
}

/// New refresh token for creation.
pub struct NewRefreshToken {
    /// Owning user ID.
    pub user_id: String,
    /// Token string.
    pub token: String,
    /// Expiration as unix seconds.
    pub expires_at: i64,
}

/// Repository for refresh token operations.
pub struct RefreshTokenRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> RefreshTokenRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new refresh token.
    pub async fn create(&self, new_token: &NewRefreshToken) -> Result<RefreshToken> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO refresh_tokens (user_id, token, expires_at, created_at)
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(&new_token.user_id)
        .bind(&new_token.token)
        .bind(new_token.expires_at)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| FileShareError::NotFound("refresh token".to_string()))
    }

    /// Get a refresh token by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<RefreshToken>> {
        let token = sqlx::query_as::<_, RefreshToken>(
            "SELECT id, user_id, token, expires_at, created_at, revoked_at
             FROM refresh_tokens WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(token)
    }

    /// Get a valid (not expired, not revoked) refresh token.
    pub async fn get_valid_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let result = sqlx::query_as::<_, RefreshToken>(
            "SELECT id, user_id, token, expires_at, created_at, revoked_at
             FROM refresh_tokens
             WHERE token = ?
               AND revoked_at IS NULL
               AND expires_at > ?",
        )
        .bind(token)
        .bind(Utc::now().timestamp())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Revoke a refresh token.
    pub async fn revoke(&self, token: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = ? WHERE token = ? AND revoked_at IS NULL",
        )
        .bind(Utc::now())
        .bind(token)
        .execute(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Revoke all tokens for a user.
    pub async fn revoke_all_for_user(&self, user_id: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = ? WHERE user_id = ? AND revoked_at IS NULL",
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    /// Delete expired and revoked tokens (cleanup).
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM refresh_tokens WHERE expires_at < ? OR revoked_at IS NOT NULL",
        )
        .bind(Utc::now().timestamp())
        .execute(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
