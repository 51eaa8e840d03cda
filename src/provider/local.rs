//! In-process backend.
//!
//! Runs the account, storage and share services directly against a SQLite
//! database and a blob directory. The signed-in session is held in a
//! [`ClientSession`], the same way a remote client holds it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::{AuthListener, AuthProvider, ClientSession, ObjectStore, ShareTable, Subscription};
use crate::auth::{AuthService, TokenIssuer};
use crate::config::Config;
use crate::db::Database;
use crate::model::{
    AuthEvent, Bucket, Download, Identity, Session, ShareRecord, SignOutScope, SignUp,
    StoredObject,
};
use crate::storage::StorageService;
use crate::Result;

/// Backend running the services in-process.
pub struct LocalBackend {
    auth: AuthService,
    storage: StorageService,
    session: ClientSession,
}

impl LocalBackend {
    /// Create a backend over existing services.
    pub fn new(auth: AuthService, storage: StorageService) -> Self {
        Self {
            auth,
            storage,
            session: ClientSession::new(),
        }
    }

    /// Build the services from configuration and make sure the configured
    /// bucket exists.
    pub async fn from_config(db: Database, config: &Config) -> Result<Self> {
        let issuer = Arc::new(TokenIssuer::from_config(&config.auth));
        let auth = AuthService::new(db.clone(), issuer);
        let storage = StorageService::from_config(db, &config.storage)?;
        storage.ensure_bucket().await?;
        Ok(Self::new(auth, storage))
    }

    async fn caller(&self) -> Result<Option<Identity>> {
        Ok(self.get_session().await?.map(|s| s.user))
    }
}

#[async_trait]
impl AuthProvider for LocalBackend {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let session = self.auth.sign_in(email, password).await?;
        self.session
            .replace(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, request: &SignUp) -> Result<Option<Identity>> {
        let identity = self
            .auth
            .sign_up(&request.email, &request.password, &request.display_name)
            .await?;
        Ok(Some(identity))
    }

    async fn sign_out(&self, scope: SignOutScope) -> Result<()> {
        let result = match self.session.current() {
            Some(current) => {
                self.auth
                    .sign_out(&current.user.id, scope, Some(&current.refresh_token))
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

        match self.auth.refresh(&current.refresh_token).await {
            Ok(renewed) => {
                self.session
                    .replace(AuthEvent::TokenRefreshed, Some(renewed.clone()));
                Ok(Some(renewed))
            }
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
impl ObjectStore for LocalBackend {
    async fn get_bucket(&self, name: &str) -> Result<Bucket> {
        self.storage.get_bucket(name).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>> {
        let caller = self.caller().await?;
        self.storage
            .list(caller.as_ref(), self.storage.bucket_name(), prefix)
            .await
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: Option<&str>) -> Result<()> {
        let caller = self.caller().await?;
        self.storage
            .upload(
                caller.as_ref(),
                self.storage.bucket_name(),
                path,
                &bytes,
                content_type,
            )
            .await
            .map(|_| ())
    }

    async fn remove(&self, paths: &[String]) -> Result<()> {
        let caller = self.caller().await?;
        self.storage
            .remove(caller.as_ref(), self.storage.bucket_name(), paths)
            .await
            .map(|_| ())
    }

    async fn create_signed_url(&self, path: &str, ttl: Duration) -> Result<String> {
        let caller = self.caller().await?;
        self.storage
            .create_signed_url(
                caller.as_ref(),
                self.storage.bucket_name(),
                path,
                ttl.as_secs(),
            )
            .await
    }

    fn get_public_url(&self, path: &str) -> String {
        self.storage.public_url(self.storage.bucket_name(), path)
    }

    async fn download(&self, path: &str) -> Result<Download> {
        let caller = self.caller().await?;
        let (record, bytes) = self
            .storage
            .download(caller.as_ref(), self.storage.bucket_name(), path)
            .await?;
        Ok(Download {
            bytes,
            content_type: record.mimetype,
        })
    }
}

#[async_trait]
impl ShareTable for LocalBackend {
    async fn upsert(&self, record: &ShareRecord) -> Result<()> {
        let caller = self.caller().await?;
        self.storage
            .upsert_share(caller.as_ref(), record)
            .await
            .map(|_| ())
    }

    async fn find_by_path(&self, file_path: &str) -> Result<Option<ShareRecord>> {
        self.storage.find_share_by_path(file_path).await
    }

    async fn find_by_file_id(&self, file_id: &str) -> Result<Option<ShareRecord>> {
        self.storage.find_share_by_file_id(file_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{BlobStore, UrlSigner};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    async fn setup() -> (TempDir, LocalBackend) {
        let dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let auth = AuthService::new(
            db.clone(),
            Arc::new(TokenIssuer::new("test-secret", 3600, 30)),
        );
        let storage = StorageService::new(
            db,
            BlobStore::new(dir.path().join("objects")).unwrap(),
            UrlSigner::new("sign", "http://localhost:8080"),
            "files",
            50 * 1024 * 1024,
        );
        storage.ensure_bucket().await.unwrap();
        (dir, LocalBackend::new(auth, storage))
    }

    fn sign_up(email: &str) -> SignUp {
        SignUp {
            email: email.to_string(),
            password: "secret1".to_string(),
            display_name: "Tester".to_string(),
        }
    }

    #[tokio::test]
    async fn test_sign_in_publishes_event() {
        let (_dir, backend) = setup().await;
        backend.sign_up(&sign_up("a@example.com")).await.unwrap();

        let events = Arc::new(AtomicUsize::new(0));
        let counter = events.clone();
        let _sub = backend.on_auth_state_change(Arc::new(
            move |event: AuthEvent, session: Option<&Session>| {
                if event == AuthEvent::SignedIn {
                    assert!(session.is_some());
                }
                counter.fetch_add(1, Ordering::SeqCst);
            },
        ));

        backend
            .sign_in_with_password("a@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(events.load(Ordering::SeqCst), 1);
        assert!(backend.get_session().await.unwrap().is_some());

        backend.sign_out(SignOutScope::Global).await.unwrap();
        assert_eq!(events.load(Ordering::SeqCst), 2);
        assert!(backend.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_local_session_is_silent() {
        let (_dir, backend) = setup().await;
        backend.sign_up(&sign_up("a@example.com")).await.unwrap();
        backend
            .sign_in_with_password("a@example.com", "secret1")
            .await
            .unwrap();

        let events = Arc::new(AtomicUsize::new(0));
        let counter = events.clone();
        let _sub = backend.on_auth_state_change(Arc::new(
            move |_: AuthEvent, _: Option<&Session>| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        ));

        backend.clear_local_session();
        assert!(backend.get_session().await.unwrap().is_none());
        assert_eq!(events.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_storage_requires_session() {
        let (_dir, backend) = setup().await;
        let result = backend.list("u1").await;
        assert!(matches!(result, Err(crate::FileShareError::Auth(_))));
    }

    #[tokio::test]
    async fn test_upload_and_download_own_file() {
        let (_dir, backend) = setup().await;
        let identity = backend
            .sign_up(&sign_up("a@example.com"))
            .await
            .unwrap()
            .unwrap();
        backend
            .sign_in_with_password("a@example.com", "secret1")
            .await
            .unwrap();

        let path = format!("{}/notes.txt", identity.id);
        backend
            .upload(&path, b"hello".to_vec(), Some("text/plain"))
            .await
            .unwrap();

        let listed = backend.list(&identity.id).await.unwrap();
        assert_eq!(listed.len(), 1);

        let download = backend.download(&path).await.unwrap();
        assert_eq!(download.bytes, b"hello");
        assert_eq!(download.content_type, "text/plain");

        let url = backend
            .create_signed_url(&path, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(url.contains("token="));
        assert!(backend.get_public_url(&path).contains("/object/public/files/"));
    }
}
