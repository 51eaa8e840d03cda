//! Collaborator seams of the application model.
//!
//! The application never talks to a database or a disk directly. It goes
//! through three traits:
//! - [`AuthProvider`]: sign-in, registration, sign-out and session push
//! - [`ObjectStore`]: namespace listing, upload, removal and URL signing
//! - [`ShareTable`]: share metadata keyed by storage path
//!
//! Two backends implement all three: [`LocalBackend`] (in-process) and
//! [`RemoteBackend`] (HTTP client for the backend service).

mod events;
mod local;
mod remote;

pub use events::{AuthEvents, AuthListener, ClientSession, Subscription};
pub use local::LocalBackend;
pub use remote::RemoteBackend;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::model::{
    Bucket, Download, Identity, Session, ShareRecord, SignOutScope, SignUp, StoredObject,
};
use crate::Result;

/// Authentication collaborator.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Exchange credentials for a session. Emits `SignedIn`.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;

    /// Register a user. Returns the created user, if the provider reports one.
    async fn sign_up(&self, request: &SignUp) -> Result<Option<Identity>>;

    /// Invalidate sessions. Emits `SignedOut`.
    async fn sign_out(&self, scope: SignOutScope) -> Result<()>;

    /// The current session, refreshed if its access token has expired.
    async fn get_session(&self) -> Result<Option<Session>>;

    /// Subscribe to session changes.
    fn on_auth_state_change(&self, listener: AuthListener) -> Subscription;

    /// Drop locally held session artifacts without contacting the provider.
    fn clear_local_session(&self);
}

/// Object storage collaborator.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Look up a bucket; `NotFound` if it does not exist.
    async fn get_bucket(&self, name: &str) -> Result<Bucket>;

    /// List the objects directly under `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>>;

    /// Write an object, replacing any object at the same path.
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: Option<&str>) -> Result<()>;

    /// Remove objects. Missing paths are ignored.
    async fn remove(&self, paths: &[String]) -> Result<()>;

    /// Create a URL that grants read access for `ttl`.
    async fn create_signed_url(&self, path: &str, ttl: Duration) -> Result<String>;

    /// URL of the object on the public endpoint. Never fails.
    fn get_public_url(&self, path: &str) -> String;

    /// Fetch an object's bytes.
    async fn download(&self, path: &str) -> Result<Download>;
}

/// Share metadata collaborator.
#[async_trait]
pub trait ShareTable: Send + Sync {
    /// Insert or replace the record for `record.file_path`.
    async fn upsert(&self, record: &ShareRecord) -> Result<()>;

    /// Record for an exact storage path.
    async fn find_by_path(&self, file_path: &str) -> Result<Option<ShareRecord>>;

    /// Record for a shared object ID.
    async fn find_by_file_id(&self, file_id: &str) -> Result<Option<ShareRecord>>;
}

/// Handles to the three collaborators, typically backed by one backend.
#[derive(Clone)]
pub struct Providers {
    /// Authentication.
    pub auth: Arc<dyn AuthProvider>,
    /// Object storage.
    pub store: Arc<dyn ObjectStore>,
    /// Share metadata.
    pub shares: Arc<dyn ShareTable>,
}

impl Providers {
    /// Use one backend for all three seams.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: AuthProvider + ObjectStore + ShareTable + 'static,
    {
        Self {
            auth: backend.clone(),
            store: backend.clone(),
            shares: backend,
        }
    }
}
