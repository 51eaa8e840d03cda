//! In-memory backend for unit tests of the application model.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::model::{
    AuthEvent, Bucket, Download, Identity, Session, ShareRecord, SignOutScope, SignUp,
    StoredObject,
};
use crate::provider::{
    AuthListener, AuthProvider, ClientSession, ObjectStore, ShareTable, Subscription,
};
use crate::{FileShareError, Result};

const BUCKET: &str = "files";

struct MemoryObject {
    id: String,
    bytes: Vec<u8>,
    content_type: Option<String>,
    created_at: DateTime<Utc>,
}

struct MemoryState {
    users: Vec<(Identity, String)>,
    objects: BTreeMap<String, MemoryObject>,
    shares: HashMap<String, ShareRecord>,
    bucket_exists: bool,
    sign_up_returns_user: bool,
    failures: HashMap<&'static str, FileShareError>,
    calls: HashMap<&'static str, usize>,
    next_id: u64,
}

/// Current and highest number of overlapping calls.
#[derive(Default)]
struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) -> InFlightGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard(self)
    }
}

struct InFlightGuard<'a>(&'a InFlight);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Backend keeping users, objects and shares in memory.
///
/// Every trait call is counted by name, and a failure can be queued for
/// the next call of a given name with [`MemoryBackend::fail_next`].
pub(crate) struct MemoryBackend {
    session: ClientSession,
    state: Mutex<MemoryState>,
    signing: InFlight,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            session: ClientSession::new(),
            state: Mutex::new(MemoryState {
                users: Vec::new(),
                objects: BTreeMap::new(),
                shares: HashMap::new(),
                bucket_exists: true,
                sign_up_returns_user: true,
                failures: HashMap::new(),
                calls: HashMap::new(),
                next_id: 0,
            }),
            signing: InFlight::default(),
        }
    }

    pub fn add_user(&self, id: &str, email: &str, password: &str) {
        let identity = Identity {
            id: id.to_string(),
            email: email.to_string(),
            display_name: None,
        };
        self.state.lock().users.push((identity, password.to_string()));
    }

    pub fn set_sign_up_returns_user(&self, returns_user: bool) {
        self.state.lock().sign_up_returns_user = returns_user;
    }

    pub fn set_bucket_exists(&self, exists: bool) {
        self.state.lock().bucket_exists = exists;
    }

    /// Make the next call named `op` fail with `err`.
    pub fn fail_next(&self, op: &'static str, err: FileShareError) {
        self.state.lock().failures.insert(op, err);
    }

    /// Number of calls named `op` so far.
    pub fn calls(&self, op: &str) -> usize {
        self.state.lock().calls.get(op).copied().unwrap_or(0)
    }

    /// Highest number of `create_signed_url` calls that were in progress
    /// at the same time.
    pub fn peak_signing(&self) -> usize {
        self.signing.peak.load(Ordering::SeqCst)
    }

    /// Delete an object behind the application's back.
    pub fn remove_object(&self, path: &str) {
        self.state.lock().objects.remove(path);
    }

    fn enter(&self, op: &'static str) -> Result<()> {
        let mut state = self.state.lock();
        *state.calls.entry(op).or_insert(0) += 1;
        match state.failures.remove(op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.state.lock();
        state.next_id += 1;
        format!("{prefix}-{:04}", state.next_id)
    }

    fn caller(&self) -> Result<Identity> {
        self.session
            .current()
            .map(|s| s.user)
            .ok_or_else(|| FileShareError::Auth("Not signed in".to_string()))
    }
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        self.enter("sign_in_with_password")?;
        let identity = self
            .state
            .lock()
            .users
            .iter()
            .find(|(user, secret)| user.email == email && secret == password)
            .map(|(user, _)| user.clone())
            .ok_or_else(|| FileShareError::Auth("Invalid login credentials".to_string()))?;

        let session = Session {
            access_token: format!("access-{}", identity.id),
            refresh_token: format!("refresh-{}", identity.id),
            expires_at: Utc::now() + chrono::Duration::hours(1),
            user: identity,
        };
        self.session
            .replace(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, request: &SignUp) -> Result<Option<Identity>> {
        self.enter("sign_up")?;
        if self
            .state
            .lock()
            .users
            .iter()
            .any(|(user, _)| user.email == request.email)
        {
            return Err(FileShareError::Auth("User already registered".to_string()));
        }

        let identity = Identity {
            id: self.next_id("user"),
            email: request.email.clone(),
            display_name: Some(request.display_name.clone()),
        };
        let mut state = self.state.lock();
        state
            .users
            .push((identity.clone(), request.password.clone()));
        Ok(state.sign_up_returns_user.then_some(identity))
    }

    async fn sign_out(&self, _scope: SignOutScope) -> Result<()> {
        let result = self.enter("sign_out");
        self.session.replace(AuthEvent::SignedOut, None);
        result
    }

    async fn get_session(&self) -> Result<Option<Session>> {
        self.enter("get_session")?;
        Ok(self.session.current())
    }

    fn on_auth_state_change(&self, listener: AuthListener) -> Subscription {
        self.session.events().subscribe(listener)
    }

    fn clear_local_session(&self) {
        self.session.clear_local();
    }
}

#[async_trait]
impl ObjectStore for MemoryBackend {
    async fn get_bucket(&self, name: &str) -> Result<Bucket> {
        self.enter("get_bucket")?;
        if name == BUCKET && self.state.lock().bucket_exists {
            Ok(Bucket {
                name: name.to_string(),
                public: false,
            })
        } else {
            Err(FileShareError::NotFound("Bucket".to_string()))
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>> {
        self.enter("list")?;
        let namespace = format!("{}/", prefix.trim_matches('/'));
        let state = self.state.lock();
        Ok(state
            .objects
            .iter()
            .filter_map(|(path, object)| {
                let name = path.strip_prefix(&namespace)?;
                Some(StoredObject {
                    id: object.id.clone(),
                    name: name.to_string(),
                    created_at: object.created_at,
                    size: Some(object.bytes.len() as u64),
                    mimetype: object.content_type.clone(),
                    metadata: None,
                })
            })
            .collect())
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: Option<&str>) -> Result<()> {
        self.enter("upload")?;
        let caller = self.caller()?;
        if !path.starts_with(&format!("{}/", caller.id)) {
            return Err(FileShareError::Permission(
                "Cannot write outside your own folder".to_string(),
            ));
        }

        let object = MemoryObject {
            id: self.next_id("obj"),
            bytes,
            content_type: content_type.map(str::to_string),
            created_at: Utc::now(),
        };
        self.state.lock().objects.insert(path.to_string(), object);
        Ok(())
    }

    async fn remove(&self, paths: &[String]) -> Result<()> {
        self.enter("remove")?;
        let mut state = self.state.lock();
        for path in paths {
            state.objects.remove(path);
        }
        Ok(())
    }

    async fn create_signed_url(&self, path: &str, ttl: Duration) -> Result<String> {
        self.enter("create_signed_url")?;
        let _signing = self.signing.enter();
        // Let other buffered calls start before this one finishes.
        tokio::task::yield_now().await;
        if !self.state.lock().objects.contains_key(path) {
            return Err(FileShareError::NotFound("Object".to_string()));
        }
        Ok(format!("memory://sign/{path}?ttl={}", ttl.as_secs()))
    }

    fn get_public_url(&self, path: &str) -> String {
        format!("memory://public/{path}")
    }

    async fn download(&self, path: &str) -> Result<Download> {
        self.enter("download")?;
        let state = self.state.lock();
        let object = state
            .objects
            .get(path)
            .ok_or_else(|| FileShareError::NotFound("Object".to_string()))?;
        Ok(Download {
            bytes: object.bytes.clone(),
            content_type: object
                .content_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_string()),
        })
    }
}

#[async_trait]
impl ShareTable for MemoryBackend {
    async fn upsert(&self, record: &ShareRecord) -> Result<()> {
        self.enter("upsert")?;
        self.state
            .lock()
            .shares
            .insert(record.file_path.clone(), record.clone());
        Ok(())
    }

    async fn find_by_path(&self, file_path: &str) -> Result<Option<ShareRecord>> {
        self.enter("find_by_path")?;
        Ok(self.state.lock().shares.get(file_path).cloned())
    }

    async fn find_by_file_id(&self, file_id: &str) -> Result<Option<ShareRecord>> {
        self.enter("find_by_file_id")?;
        Ok(self
            .state
            .lock()
            .shares
            .values()
            .find(|r| r.file_id == file_id)
            .cloned())
    }
}
