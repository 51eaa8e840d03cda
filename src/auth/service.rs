//! Account and session operations of the backend service.

use std::sync::Arc;

use tracing::{info, warn};

use super::password::{hash_password, verify_password};
use super::token::TokenIssuer;
use super::validation::validate_sign_up;
use crate::db::{Database, NewRefreshToken, NewUser, RefreshTokenRepository, User, UserRepository};
use crate::model::{Identity, Session, SignOutScope};
use crate::{FileShareError, Result};

const INVALID_CREDENTIALS: &str = "Invalid login credentials";

/// Account and session operations.
#[derive(Clone)]
pub struct AuthService {
    db: Database,
    issuer: Arc<TokenIssuer>,
}

impl AuthService {
    /// Create the service.
    pub fn new(db: Database, issuer: Arc<TokenIssuer>) -> Self {
        Self { db, issuer }
    }

    /// The token issuer.
    pub fn issuer(&self) -> &Arc<TokenIssuer> {
        &self.issuer
    }

    /// Register a user.
    ///
    /// An empty display name is stored as none.
    pub async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<Identity> {
        let email = email.trim();
        let display_name = display_name.trim();
        validate_sign_up(email, password, display_name)?;

        let repo = UserRepository::new(self.db.pool());
        if repo.email_exists(email).await? {
            return Err(FileShareError::Validation(
                "User already registered".to_string(),
            ));
        }

        let hash = hash_password(password)?;
        let mut new_user = NewUser::new(email, hash);
        if !display_name.is_empty() {
            new_user = new_user.with_display_name(display_name);
        }

        let user = repo.create(&new_user).await?;
        info!(user_id = %user.id, "User registered");
        Ok(user.identity())
    }

    /// Exchange credentials for a session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        if email.is_empty() || password.is_empty() {
            return Err(FileShareError::Auth(INVALID_CREDENTIALS.to_string()));
        }

        let repo = UserRepository::new(self.db.pool());
        let user = repo
            .get_by_email(email.trim())
            .await?
            .ok_or_else(|| FileShareError::Auth(INVALID_CREDENTIALS.to_string()))?;

        verify_password(password, &user.password)?;

        let session = self.start_session(&user).await?;
        if let Err(e) = repo.update_last_sign_in(&user.id).await {
            warn!(user_id = %user.id, "Failed to record sign-in: {}", e);
        }

        info!(user_id = %user.id, "User signed in");
        Ok(session)
    }

    /// Rotate a refresh token into a new session.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        let tokens = RefreshTokenRepository::new(self.db.pool());
        let stored = tokens
            .get_valid_token(refresh_token)
            .await?
            .ok_or_else(|| FileShareError::Auth("Invalid Refresh Token".to_string()))?;

        let user = UserRepository::new(self.db.pool())
            .get_by_id(&stored.user_id)
            .await?
            .ok_or_else(|| FileShareError::Auth("User not found".to_string()))?;

        tokens.revoke(refresh_token).await?;
        self.start_session(&user).await
    }

    /// Revoke refresh tokens.
    ///
    /// `Global` revokes every token of the user; `Local` revokes only the
    /// presented one.
    pub async fn sign_out(
        &self,
        user_id: &str,
        scope: SignOutScope,
        refresh_token: Option<&str>,
    ) -> Result<()> {
        let tokens = RefreshTokenRepository::new(self.db.pool());
        match scope {
            SignOutScope::Global => {
                let revoked = tokens.revoke_all_for_user(user_id).await?;
                info!(user_id, revoked, "User signed out globally");
            }
            SignOutScope::Local => {
                if let Some(token) = refresh_token {
                    tokens.revoke(token).await?;
                }
                info!(user_id, "User signed out");
            }
        }
        Ok(())
    }

    /// Current record of a user.
    pub async fn identity(&self, user_id: &str) -> Result<Identity> {
        UserRepository::new(self.db.pool())
            .get_by_id(user_id)
            .await?
            .map(|u| u.identity())
            .ok_or_else(|| FileShareError::Auth("User not found".to_string()))
    }

    /// Delete expired and revoked refresh tokens.
    pub async fn cleanup_expired_tokens(&self) -> Result<u64> {
        RefreshTokenRepository::new(self.db.pool())
            .cleanup_expired()
            .await
    }

    async fn start_session(&self, user: &User) -> Result<Session> {
        let access = self.issuer.issue_access_token(user)?;
        let refresh_token = self.issuer.generate_refresh_token();

        RefreshTokenRepository::new(self.db.pool())
            .create(&NewRefreshToken {
                user_id: user.id.clone(),
                token: refresh_token.clone(),
                expires_at: self.issuer.refresh_token_expires_at(),
            })
            .await?;

        Ok(Session {
            access_token: access.token,
            refresh_token,
            expires_at: access.expires_at,
            user: user.identity(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> AuthService {
        let db = Database::open_in_memory().await.unwrap();
        AuthService::new(db, Arc::new(TokenIssuer::new("test-secret", 3600, 30)))
    }

    #[tokio::test]
    async fn test_sign_up_and_sign_in() {
        let service = setup().await;

        let identity = service
            .sign_up("alice@example.com", "secret1", "Alice")
            .await
            .unwrap();
        assert_eq!(identity.email, "alice@example.com");
        assert_eq!(identity.display_name.as_deref(), Some("Alice"));

        let session = service.sign_in("alice@example.com", "secret1").await.unwrap();
        assert_eq!(session.user.id, identity.id);
        assert!(!session.is_expired());

        let claims = service.issuer().verify(&session.access_token).unwrap();
        let resolved = service.identity(&claims.sub).await.unwrap();
        assert_eq!(resolved, identity);
    }

    #[tokio::test]
    async fn test_sign_up_duplicate_email() {
        let service = setup().await;
        service
            .sign_up("alice@example.com", "secret1", "")
            .await
            .unwrap();

        let result = service.sign_up("ALICE@example.com", "secret1", "").await;
        match result {
            Err(FileShareError::Validation(msg)) => assert_eq!(msg, "User already registered"),
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sign_up_empty_display_name() {
        let service = setup().await;
        let identity = service
            .sign_up("bob@example.com", "secret1", "  ")
            .await
            .unwrap();
        assert!(identity.display_name.is_none());
    }

    #[tokio::test]
    async fn test_sign_up_rejects_short_password() {
        let service = setup().await;
        let result = service.sign_up("bob@example.com", "12345", "Bob").await;
        assert!(matches!(result, Err(FileShareError::Validation(_))));
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password() {
        let service = setup().await;
        service
            .sign_up("alice@example.com", "secret1", "")
            .await
            .unwrap();

        match service.sign_in("alice@example.com", "wrong-pw").await {
            Err(FileShareError::Auth(msg)) => assert_eq!(msg, INVALID_CREDENTIALS),
            other => panic!("Expected Auth error, got {other:?}"),
        }
        assert!(service.sign_in("nobody@example.com", "secret1").await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_rotates_token() {
        let service = setup().await;
        service
            .sign_up("alice@example.com", "secret1", "")
            .await
            .unwrap();
        let session = service.sign_in("alice@example.com", "secret1").await.unwrap();

        let renewed = service.refresh(&session.refresh_token).await.unwrap();
        assert_ne!(renewed.refresh_token, session.refresh_token);

        // The old token is spent
        assert!(service.refresh(&session.refresh_token).await.is_err());
        assert!(service.refresh(&renewed.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_sign_out_scopes() {
        let service = setup().await;
        let identity = service
            .sign_up("alice@example.com", "secret1", "")
            .await
            .unwrap();
        let first = service.sign_in("alice@example.com", "secret1").await.unwrap();
        let second = service.sign_in("alice@example.com", "secret1").await.unwrap();

        service
            .sign_out(&identity.id, SignOutScope::Local, Some(&first.refresh_token))
            .await
            .unwrap();
        assert!(service.refresh(&first.refresh_token).await.is_err());

        let third = service.refresh(&second.refresh_token).await.unwrap();
        service
            .sign_out(&identity.id, SignOutScope::Global, None)
            .await
            .unwrap();
        assert!(service.refresh(&third.refresh_token).await.is_err());

        assert!(service.cleanup_expired_tokens().await.unwrap() >= 3);
    }
}
