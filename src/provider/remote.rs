//! HTTP client for the backend service.
//!
//! Configured by two strings: the service URL and the public API key. Every
//! request carries the key in the `apikey` header; calls made on behalf of
//! the signed-in user also carry the access token as a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{AuthListener, AuthProvider, ClientSession, ObjectStore, ShareTable, Subscription};
use crate::config::Config;
use crate::model::{
    AuthEvent, Bucket, Download, Identity, Session, ShareRecord, SignOutScope, SignUp,
    StoredObject,
};
use crate::storage::encode_path;
use crate::web::dto::{
    ListRequest, LogoutRequest, RemoveRequest, ShareQuery, ShareRequest, SignRequest,
    SignUpData, SignUpRequest, SignedUrlResponse, TokenRequest, TokenResponse, UploadResponse,
};
use crate::web::error::ErrorBody;
use crate::web::middleware::API_KEY_HEADER;
use crate::{FileShareError, Result};

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Total timeout in seconds.
const TOTAL_TIMEOUT_SECS: u64 = 60;

/// User agent sent with every request.
const USER_AGENT: &str = concat!("fileshare/", env!("CARGO_PKG_VERSION"));

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Backend talking to a remote service over HTTP.
pub struct RemoteBackend {
    client: Client,
    base_url: String,
    api_key: String,
    bucket: String,
    session: ClientSession,
}

impl RemoteBackend {
    /// Create a client for the service at `service_url`.
    pub fn new(service_url: &str, api_key: &str, bucket: &str) -> Result<Self> {
        let parsed = url::Url::parse(service_url)
            .map_err(|e| FileShareError::Config(format!("invalid service URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FileShareError::Config(format!(
                "unsupported service URL scheme: {}",
                parsed.scheme()
            )));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(TOTAL_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FileShareError::Http(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: service_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            bucket: bucket.to_string(),
            session: ClientSession::new(),
        })
    }

    /// Create a client from the `[client]` section.
    pub fn from_config(config: &Config) -> Result<Self> {
        if config.client.service_url.is_empty() {
            return Err(FileShareError::Config(
                "service_url is not set. \
                 Set it in config.toml or via FILESHARE_SERVICE_URL environment variable."
                    .to_string(),
            ));
        }
        Self::new(
            &config.client.service_url,
            &config.client.api_key,
            &config.storage.bucket,
        )
    }

    fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        let mut builder = self.client.request(method, format!("{}{}", self.base_url, path));
        if !self.api_key.is_empty() {
            builder = builder.header(API_KEY_HEADER, &self.api_key);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Access token of the current session, refreshed if needed.
    async fn bearer(&self) -> Result<Option<String>> {
        Ok(self.get_session().await?.map(|s| s.access_token))
    }

    fn object_path(&self, kind: &str, path: &str) -> String {
        format!(
            "/storage/v1/object/{}{}/{}",
            kind,
            urlencoding::encode(&self.bucket),
            encode_path(path)
        )
    }

    async fn token_request(&self, grant_type: &str, body: &TokenRequest) -> Result<Session> {
        let response: TokenResponse = send_json(
            self.request(
                Method::POST,
                &format!("/auth/v1/token?grant_type={grant_type}"),
                None,
            )
            .json(body),
        )
        .await?;
        Ok(response.into_session())
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error.message)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    debug!(status = status.as_u16(), %message, "Service returned an error");
    Err(status_error(status, message))
}

/// Map a failed response back into a [`FileShareError`].
fn status_error(status: StatusCode, message: String) -> FileShareError {
    match status {
        StatusCode::NOT_FOUND => {
            let subject = message
                .strip_suffix(" not found")
                .map(str::to_string)
                .unwrap_or(message);
            FileShareError::NotFound(subject)
        }
        StatusCode::UNAUTHORIZED => FileShareError::Auth(message),
        StatusCode::FORBIDDEN => FileShareError::Permission(message),
        s if s.is_client_error() => FileShareError::Validation(message),
        s => FileShareError::Http(format!("{}: {}", s, message)),
    }
}

async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
    let response = check(builder.send().await?).await?;
    let envelope: Envelope<T> = response.json().await?;
    Ok(envelope.data)
}

async fn send_empty(builder: RequestBuilder) -> Result<()> {
    check(builder.send().await?).await?;
    Ok(())
}

#[async_trait]
impl AuthProvider for RemoteBackend {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let session = self
            .token_request(
                "password",
                &TokenRequest {
                    email: Some(email.to_string()),
                    password: Some(password.to_string()),
                    refresh_token: None,
                },
            )
            .await?;
        self.session
            .replace(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, request: &SignUp) -> Result<Option<Identity>> {
        let body = SignUpRequest {
            email: request.email.clone(),
            password: request.password.clone(),
            data: SignUpData {
                full_name: request.display_name.clone(),
            },
        };
        let identity: Option<Identity> =
            send_json(self.request(Method::POST, "/auth/v1/signup", None).json(&body)).await?;
        Ok(identity)
    }

    async fn sign_out(&self, scope: SignOutScope) -> Result<()> {
        let result = match self.session.current() {
            Some(current) => {
                let body = LogoutRequest {
                    refresh_token: Some(current.refresh_token.clone()),
                };
                send_empty(
                    self.request(
                        Method::POST,
                        &format!("/auth/v1/logout?scope={}", scope.as_str()),
                        Some(&current.access_token),
                    )
                    .json(&body),
                )
                .await
            }
            None => Ok(()),
        };
        self.session.replace(AuthEvent::SignedOut, None);
        result
    }

    async fn get_session(&self) -> Result<Option<Session>> {
        let Some(current) = self.session.current() else {
            return Ok(None);
        };
        if !current.is_expired() {
            return Ok(Some(current));
        }

        let body = TokenRequest {
            refresh_token: Some(current.refresh_token.clone()),
            ..TokenRequest::default()
        };
        match self.token_request("refresh_token", &body).await {
            Ok(renewed) => {
                self.session
                    .replace(AuthEvent::TokenRefreshed, Some(renewed.clone()));
                Ok(Some(renewed))
            }
            Err(e @ FileShareError::Http(_)) => Err(e),
            Err(e) => {
                warn!("Session refresh failed: {}", e);
                self.session.replace(AuthEvent::SignedOut, None);
                Ok(None)
            }
        }
    }

    fn on_auth_state_change(&self, listener: AuthListener) -> Subscription {
        self.session.events().subscribe(listener)
    }

    fn clear_local_session(&self) {
        self.session.clear_local();
    }
}

#[async_trait]
impl ObjectStore for RemoteBackend {
    async fn get_bucket(&self, name: &str) -> Result<Bucket> {
        let bearer = self.bearer().await?;
        send_json(self.request(
            Method::GET,
            &format!("/storage/v1/bucket/{}", urlencoding::encode(name)),
            bearer.as_deref(),
        ))
        .await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>> {
        let bearer = self.bearer().await?;
        let body = ListRequest {
            prefix: prefix.to_string(),
        };
        send_json(
            self.request(
                Method::POST,
                &format!("/storage/v1/object/list/{}", urlencoding::encode(&self.bucket)),
                bearer.as_deref(),
            )
            .json(&body),
        )
        .await
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: Option<&str>) -> Result<()> {
        let bearer = self.bearer().await?;
        let mut builder = self
            .request(Method::POST, &self.object_path("", path), bearer.as_deref())
            .body(bytes);
        if let Some(content_type) = content_type.filter(|c| !c.is_empty()) {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let stored: UploadResponse = send_json(builder).await?;
        debug!(id = %stored.id, path = %stored.path, "Uploaded object");
        Ok(())
    }

    async fn remove(&self, paths: &[String]) -> Result<()> {
        let bearer = self.bearer().await?;
        let body = RemoveRequest {
            prefixes: paths.to_vec(),
        };
        let removed: Vec<String> = send_json(
            self.request(
                Method::DELETE,
                &format!("/storage/v1/object/{}", urlencoding::encode(&self.bucket)),
                bearer.as_deref(),
            )
            .json(&body),
        )
        .await?;
        debug!(count = removed.len(), "Removed objects");
        Ok(())
    }

    async fn create_signed_url(&self, path: &str, ttl: Duration) -> Result<String> {
        let bearer = self.bearer().await?;
        let body = SignRequest {
            expires_in: ttl.as_secs(),
        };
        let response: SignedUrlResponse = send_json(
            self.request(
                Method::POST,
                &self.object_path("sign/", path),
                bearer.as_deref(),
            )
            .json(&body),
        )
        .await?;
        Ok(response.signed_url)
    }

    fn get_public_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, self.object_path("public/", path))
    }

    async fn download(&self, path: &str) -> Result<Download> {
        let bearer = self.bearer().await?;
        let response = check(
            self.request(
                Method::GET,
                &self.object_path("authenticated/", path),
                bearer.as_deref(),
            )
            .send()
            .await?,
        )
        .await?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response.bytes().await?.to_vec();
        Ok(Download {
            bytes,
            content_type,
        })
    }
}

#[async_trait]
impl ShareTable for RemoteBackend {
    async fn upsert(&self, record: &ShareRecord) -> Result<()> {
        let bearer = self.bearer().await?;
        let body = ShareRequest {
            file_path: record.file_path.clone(),
            file_id: record.file_id.clone(),
            created_at: Some(record.created_at),
        };
        let _: ShareRecord = send_json(
            self.request(Method::POST, "/rest/v1/shares", bearer.as_deref())
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn find_by_path(&self, file_path: &str) -> Result<Option<ShareRecord>> {
        let bearer = self.bearer().await?;
        let query = ShareQuery {
            file_path: Some(file_path.to_string()),
            file_id: None,
        };
        send_json(
            self.request(Method::GET, "/rest/v1/shares", bearer.as_deref())
                .query(&query),
        )
        .await
    }

    async fn find_by_file_id(&self, file_id: &str) -> Result<Option<ShareRecord>> {
        let bearer = self.bearer().await?;
        let query = ShareQuery {
            file_path: None,
            file_id: Some(file_id.to_string()),
        };
        send_json(
            self.request(Method::GET, "/rest/v1/shares", bearer.as_deref())
                .query(&query),
        )
        .await
    }
}
