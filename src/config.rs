//! Configuration module for fileshare.

use serde::Deserialize;
use std::path::Path;

use crate::{FileShareError, Result};

/// Backend HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Rate limit for the sign-in endpoint (requests per minute per IP).
    #[serde(default = "default_login_rate_limit")]
    pub login_rate_limit: u32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_login_rate_limit() -> u32 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
            login_rate_limit: default_login_rate_limit(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/fileshare.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Object storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding object bytes.
    #[serde(default = "default_storage_path")]
    pub path: String,
    /// Name of the bucket objects live in.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Secret used to sign object URLs.
    #[serde(default)]
    pub signing_secret: String,
    /// Externally reachable base URL used when building object URLs.
    #[serde(default = "default_public_url")]
    pub public_url: String,
    /// Largest object the service accepts, in bytes.
    #[serde(default = "default_max_object_size")]
    pub max_object_size_bytes: u64,
}

fn default_storage_path() -> String {
    "data/objects".to_string()
}

fn default_bucket() -> String {
    "files".to_string()
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_max_object_size() -> u64 {
    50 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            bucket: default_bucket(),
            signing_secret: String::new(),
            public_url: default_public_url(),
            max_object_size_bytes: default_max_object_size(),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// JWT secret key (must be set for the server).
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token expiry in seconds.
    #[serde(default = "default_access_expiry")]
    pub access_token_expiry_secs: u64,
    /// Refresh token expiry in days.
    #[serde(default = "default_refresh_expiry")]
    pub refresh_token_expiry_days: u64,
    /// Public API key clients must present (empty disables the check).
    #[serde(default)]
    pub api_key: String,
}

fn default_access_expiry() -> u64 {
    3600 // 1 hour
}

fn default_refresh_expiry() -> u64 {
    30
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_expiry_secs: default_access_expiry(),
            refresh_token_expiry_days: default_refresh_expiry(),
            api_key: String::new(),
        }
    }
}

/// File collection behaviour of the application model.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Largest file a user may upload, in bytes.
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: u64,
    /// Maximum number of signed URL requests in flight during a listing.
    #[serde(default = "default_list_concurrency")]
    pub list_concurrency: usize,
    /// Validity of listing URLs in seconds.
    #[serde(default = "default_listing_url_ttl")]
    pub listing_url_ttl_secs: u64,
    /// Validity of share URLs in seconds.
    #[serde(default = "default_share_url_ttl")]
    pub share_url_ttl_secs: u64,
    /// Origin share links are built on (e.g. "https://files.example.com").
    #[serde(default = "default_app_origin")]
    pub app_origin: String,
}

fn default_max_upload() -> u64 {
    3 * 1024 * 1024 // 3MB
}

fn default_list_concurrency() -> usize {
    8
}

fn default_listing_url_ttl() -> u64 {
    60 * 60 // 1 hour
}

fn default_share_url_ttl() -> u64 {
    60 * 60 * 24 * 7 // 7 days
}

fn default_app_origin() -> String {
    "http://localhost:5173".to_string()
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload(),
            list_concurrency: default_list_concurrency(),
            listing_url_ttl_secs: default_listing_url_ttl(),
            share_url_ttl_secs: default_share_url_ttl(),
            app_origin: default_app_origin(),
        }
    }
}

/// Remote backend connection used by the application model.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ClientConfig {
    /// Base URL of the backend service.
    #[serde(default)]
    pub service_url: String,
    /// Public API key sent with every request.
    #[serde(default)]
    pub api_key: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/fileshare.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Backend server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Object storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// File collection configuration.
    #[serde(default)]
    pub files: FilesConfig,
    /// Remote backend connection.
    #[serde(default)]
    pub client: ClientConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FileShareError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FileShareError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FILESHARE_SERVICE_URL`: backend service URL used by the client
    /// - `FILESHARE_API_KEY`: public API key (client and server)
    /// - `FILESHARE_JWT_SECRET`: JWT secret key
    /// - `FILESHARE_SIGNING_SECRET`: object URL signing secret
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = non_empty_env("FILESHARE_SERVICE_URL") {
            self.client.service_url = url;
        }
        if let Some(key) = non_empty_env("FILESHARE_API_KEY") {
            self.client.api_key = key.clone();
            self.auth.api_key = key;
        }
        if let Some(secret) = non_empty_env("FILESHARE_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(secret) = non_empty_env("FILESHARE_SIGNING_SECRET") {
            self.storage.signing_secret = secret;
        }
    }

    /// Validate the configuration for running the backend service.
    ///
    /// Returns an error if:
    /// - the JWT secret or the signing secret is not set
    /// - the upload cap or listing concurrency is zero
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(FileShareError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via FILESHARE_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.storage.signing_secret.is_empty() {
            return Err(FileShareError::Config(
                "signing_secret is not set. \
                 Set it in config.toml or via FILESHARE_SIGNING_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.files.max_upload_bytes == 0 {
            return Err(FileShareError::Config(
                "max_upload_bytes must be greater than zero".to_string(),
            ));
        }
        if self.files.list_concurrency == 0 {
            return Err(FileShareError::Config(
                "list_concurrency must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
