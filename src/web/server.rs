//! HTTP server of the backend service.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use super::handlers::AppState;
use super::router::{create_health_router, create_router};
use crate::auth::{AuthService, TokenIssuer};
use crate::config::Config;
use crate::storage::StorageService;
use crate::{Database, FileShareError, Result};

/// HTTP server exposing the auth, storage and share endpoints.
pub struct WebServer {
    addr: SocketAddr,
    app_state: Arc<AppState>,
    config: Config,
}

impl WebServer {
    /// Create a server over an open database.
    pub fn new(config: &Config, db: Database) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| FileShareError::Config(format!("invalid server address: {e}")))?;

        let issuer = Arc::new(TokenIssuer::from_config(&config.auth));
        let auth = AuthService::new(db.clone(), issuer);
        let storage = StorageService::from_config(db, &config.storage)?;

        Ok(Self {
            addr,
            app_state: Arc::new(AppState::new(auth, storage)),
            config: config.clone(),
        })
    }

    /// Configured listen address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Purge expired and revoked refresh tokens every hour.
    fn start_token_cleanup_task(auth: AuthService) {
        tokio::spawn(async move {
            const CLEANUP_INTERVAL_SECS: u64 = 3600;

            let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));
            interval.tick().await;

            loop {
                interval.tick().await;
                match auth.cleanup_expired_tokens().await {
                    Ok(0) => tracing::debug!("No expired refresh tokens to clean up"),
                    Ok(count) => {
                        tracing::info!(deleted_count = count, "Cleaned up expired refresh tokens")
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to clean up refresh tokens"),
                }
            }
        });
    }

    async fn bind(self) -> Result<(TcpListener, axum::Router)> {
        self.app_state.storage.ensure_bucket().await?;

        let auth = self.app_state.auth.clone();
        let router = create_router(self.app_state, &self.config.server, &self.config.auth.api_key)
            .merge(create_health_router())
            .layer(CompressionLayer::new());

        let listener = TcpListener::bind(self.addr).await?;

        Self::start_token_cleanup_task(auth);
        tracing::info!("Token cleanup task started (runs every hour)");
        tracing::info!("Web server listening on http://{}", listener.local_addr()?);

        Ok((listener, router))
    }

    /// Run the server until it fails.
    pub async fn run(self) -> Result<()> {
        let (listener, router) = self.bind().await?;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }

    /// Start the server in the background and return the bound address.
    ///
    /// Binding to port 0 picks a free port.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let (listener, router) = self.bind().await?;
        let local_addr = listener.local_addr()?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config.auth.jwt_secret = "test-secret".to_string();
        config.storage.signing_secret = "sign-secret".to_string();
        config.storage.path = dir.path().join("objects").to_string_lossy().into_owned();
        config
    }

    #[tokio::test]
    async fn test_invalid_address_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.server.host = "not an address".to_string();
        let db = Database::open_in_memory().await.unwrap();

        assert!(matches!(
            WebServer::new(&config, db),
            Err(FileShareError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let db = Database::open_in_memory().await.unwrap();

        let server = WebServer::new(&config, db).unwrap();
        let addr = server.run_with_addr().await.unwrap();

        let resp = reqwest::Client::new()
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();

        assert!(resp.status().is_success());
        assert_eq!(resp.text().await.unwrap(), "OK");
    }
}
