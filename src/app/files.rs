//! The signed-in user's file listing and the operations on it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::{future, stream, StreamExt};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::filter::{FilterSpec, FilterUpdate};
use super::notify::{Notice, Notifier};
use super::selection::Selection;
use super::session::{failure_message, SessionState};
use crate::config::Config;
use crate::model::{object_path, ShareRecord, StoredObject};
use crate::provider::{ObjectStore, ShareTable};
use crate::FileShareError;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file in the listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileDescriptor {
    /// Provider-assigned identifier.
    pub id: String,
    /// Name, unique within the owner's namespace.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Content type.
    pub content_type: String,
    /// When the file was (last) uploaded.
    pub created_at: DateTime<Utc>,
    /// Storage path `{owner_id}/{name}`.
    pub path: String,
    /// Time-limited retrieval URL.
    pub url: String,
    /// Owning identity.
    pub owner_id: String,
    /// Free-form metadata reported by storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl FileDescriptor {
    fn from_object(object: StoredObject, owner_id: &str, url: String) -> Self {
        Self {
            path: object_path(owner_id, &object.name),
            id: object.id,
            name: object.name,
            size: object.size.unwrap_or(0),
            content_type: object
                .mimetype
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            created_at: object.created_at,
            url,
            owner_id: owner_id.to_string(),
            metadata: object.metadata,
        }
    }
}

/// A file picked for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// File name; becomes the last path segment.
    pub name: String,
    /// Content.
    pub bytes: Vec<u8>,
    /// Declared content type.
    pub content_type: Option<String>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
            content_type: None,
        }
    }

    /// Set the declared content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// What the UI needs to start a download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadLink {
    /// Retrieval URL.
    pub url: String,
    /// Suggested file name.
    pub file_name: String,
}

/// Tunables of the file collection.
#[derive(Debug, Clone)]
pub struct CollectionSettings {
    /// Bucket holding the files.
    pub bucket: String,
    /// Largest accepted upload in bytes.
    pub max_upload_bytes: u64,
    /// Signed URL requests in flight during a listing.
    pub list_concurrency: usize,
    /// Validity of listing URLs.
    pub listing_url_ttl: Duration,
    /// Validity of the storage URL created when sharing.
    pub share_url_ttl: Duration,
    /// Origin share links are built on.
    pub app_origin: String,
}

impl CollectionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            bucket: config.storage.bucket.clone(),
            max_upload_bytes: config.files.max_upload_bytes,
            list_concurrency: config.files.list_concurrency,
            listing_url_ttl: Duration::from_secs(config.files.listing_url_ttl_secs),
            share_url_ttl: Duration::from_secs(config.files.share_url_ttl_secs),
            app_origin: config.files.app_origin.clone(),
        }
    }
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Default)]
struct Listing {
    owner_id: Option<String>,
    files: Vec<FileDescriptor>,
    selection: Selection,
    filter: FilterSpec,
}

impl Listing {
    fn visible(&self) -> Vec<FileDescriptor> {
        self.filter.apply(self.files.clone())
    }

    fn find(&self, id: &str) -> Option<&FileDescriptor> {
        self.files.iter().find(|f| f.id == id)
    }
}

struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// File listing of the signed-in user.
///
/// The stored listing is the raw fetch result; search and sort are
/// applied when it is read, so [`FileCollection::set_filter`] takes effect
/// without another fetch.
pub struct FileCollection {
    store: Arc<dyn ObjectStore>,
    shares: Arc<dyn ShareTable>,
    session: Arc<SessionState>,
    notifier: Arc<dyn Notifier>,
    settings: CollectionSettings,
    listing: RwLock<Listing>,
    loading: AtomicBool,
}

impl FileCollection {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        shares: Arc<dyn ShareTable>,
        session: Arc<SessionState>,
        notifier: Arc<dyn Notifier>,
        settings: CollectionSettings,
    ) -> Self {
        Self {
            store,
            shares,
            session,
            notifier,
            settings,
            listing: RwLock::new(Listing::default()),
            loading: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &CollectionSettings {
        &self.settings
    }

    /// Files matching the filter, in filter order.
    pub fn files(&self) -> Vec<FileDescriptor> {
        self.listing.read().visible()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Current filter.
    pub fn filter(&self) -> FilterSpec {
        self.listing.read().filter.clone()
    }

    /// Selected ids present in the listing.
    pub fn selected_files(&self) -> Vec<String> {
        let listing = self.listing.read();
        listing
            .selection
            .view(listing.files.iter().map(|f| f.id.as_str()))
    }

    /// Reload the listing from storage.
    pub async fn fetch_files(&self) {
        let Some(identity) = self.session.identity() else {
            self.replace_files(None, Vec::new());
            return;
        };
        let owner = Some(identity.id.as_str());
        let _loading = self.begin_loading();

        match self.store.get_bucket(&self.settings.bucket).await {
            Ok(_) => {}
            Err(FileShareError::NotFound(_)) => {
                error!(bucket = %self.settings.bucket, "Bucket does not exist");
                self.notifier
                    .notify(Notice::error("Storage is not properly configured"));
                self.replace_files(owner, Vec::new());
                return;
            }
            Err(e) => warn!("Error checking bucket: {}", e),
        }

        let objects = match self.store.list(&identity.id).await {
            Ok(objects) => objects,
            Err(FileShareError::NotFound(_)) => {
                debug!(user_id = %identity.id, "User folder does not exist yet");
                self.replace_files(owner, Vec::new());
                return;
            }
            Err(e) => {
                error!(user_id = %identity.id, "Error listing files: {}", e);
                self.notifier
                    .notify(Notice::error(format!("Error loading files: {}", e.message())));
                self.replace_files(owner, Vec::new());
                return;
            }
        };

        let store = &self.store;
        let owner_id = identity.id.as_str();
        let ttl = self.settings.listing_url_ttl;
        let files: Vec<FileDescriptor> = stream::iter(objects)
            .map(|object| async move {
                let path = object_path(owner_id, &object.name);
                match store.create_signed_url(&path, ttl).await {
                    Ok(url) => Some(FileDescriptor::from_object(object, owner_id, url)),
                    Err(e) => {
                        warn!(path = %path, "Error creating URL for file: {}", e);
                        None
                    }
                }
            })
            .buffered(self.settings.list_concurrency.max(1))
            .filter_map(future::ready)
            .collect()
            .await;

        debug!(count = files.len(), "Files fetched");
        self.replace_files(owner, files);
    }

    /// Upload a file into the user's namespace, replacing any file of the
    /// same name. Returns whether the upload succeeded.
    pub async fn upload_file(&self, file: UploadFile) -> bool {
        let Some(identity) = self.session.identity() else {
            return false;
        };

        if file.size() > self.settings.max_upload_bytes {
            self.notifier.notify(Notice::error(format!(
                "File size exceeds the {}MB limit",
                self.settings.max_upload_bytes / (1024 * 1024)
            )));
            return false;
        }

        let _loading = self.begin_loading();
        let path = object_path(&identity.id, &file.name);
        let size = file.size();

        match self
            .store
            .upload(&path, file.bytes, file.content_type.as_deref())
            .await
        {
            Ok(()) => {
                info!(path = %path, size, "File uploaded");
                self.notifier.notify(Notice::success("File uploaded successfully"));
                self.fetch_files().await;
                true
            }
            Err(e) => {
                warn!(path = %path, "Error uploading file: {}", e);
                self.notifier
                    .notify(Notice::error(failure_message(&e, "Failed to upload file")));
                false
            }
        }
    }

    /// Remove files by id. The selection is cleared whatever the outcome.
    pub async fn delete_files(&self, ids: &[String]) {
        self.listing.write().selection.clear();
        if ids.is_empty() || self.session.identity().is_none() {
            return;
        }
        let _loading = self.begin_loading();

        let paths: Vec<String> = {
            let listing = self.listing.read();
            listing
                .files
                .iter()
                .filter(|f| ids.contains(&f.id))
                .map(|f| f.path.clone())
                .collect()
        };
        if paths.is_empty() {
            debug!("No listed file matches the ids to delete");
            return;
        }

        match self.store.remove(&paths).await {
            Ok(()) => {
                info!(count = paths.len(), "Files deleted");
                self.notifier.notify(Notice::success(format!(
                    "{} file(s) deleted successfully",
                    paths.len()
                )));
                self.fetch_files().await;
            }
            Err(e) => {
                warn!("Error deleting files: {}", e);
                self.notifier
                    .notify(Notice::error(failure_message(&e, "Failed to delete files")));
            }
        }
    }

    /// Download link for a listed file.
    pub fn download_file(&self, file: &FileDescriptor) -> DownloadLink {
        DownloadLink {
            url: file.url.clone(),
            file_name: file.name.clone(),
        }
    }

    /// Share a listed file.
    ///
    /// Returns the share page URL, or an empty string on failure.
    pub async fn share_file(&self, id: &str) -> String {
        let Some(file) = self.listing.read().find(id).cloned() else {
            self.notifier.notify(Notice::error("File not found"));
            return String::new();
        };

        if let Err(e) = self
            .store
            .create_signed_url(&file.path, self.settings.share_url_ttl)
            .await
        {
            warn!(path = %file.path, "Error creating share URL: {}", e);
            self.notifier.notify(Notice::error(failure_message(
                &e,
                "Failed to create shareable link",
            )));
            return String::new();
        }

        let record = ShareRecord {
            file_path: file.path.clone(),
            created_at: Utc::now(),
            file_id: file.id.clone(),
            created_by: self.session.identity().map(|i| i.id),
        };
        if let Err(e) = self.shares.upsert(&record).await {
            warn!(path = %file.path, "Error recording share: {}", e);
            self.notifier
                .notify(Notice::error(failure_message(&e, "Failed to share file")));
            return String::new();
        }

        info!(path = %file.path, "File shared");
        share_url(&self.settings.app_origin, &file.path)
    }

    pub fn toggle_select_file(&self, id: &str) {
        self.listing.write().selection.toggle(id);
    }

    /// Select every visible file, or clear when all are selected.
    pub fn select_all_files(&self) {
        let mut listing = self.listing.write();
        let visible = listing.visible();
        listing
            .selection
            .select_all(visible.iter().map(|f| f.id.as_str()));
    }

    pub fn clear_selected_files(&self) {
        self.listing.write().selection.clear();
    }

    /// Merge a partial filter.
    ///
    /// Search and sort are applied whenever the listing is read, so the
    /// next [`files`](Self::files) call reflects the change. No
    /// [`fetch_files`](Self::fetch_files) is needed, and none is made.
    pub fn set_filter(&self, update: FilterUpdate) {
        self.listing.write().filter.merge(update);
    }

    /// User the listing was last fetched for.
    pub fn listed_owner(&self) -> Option<String> {
        self.listing.read().owner_id.clone()
    }

    fn replace_files(&self, owner_id: Option<&str>, files: Vec<FileDescriptor>) {
        let mut listing = self.listing.write();
        listing.owner_id = owner_id.map(str::to_string);
        listing.files = files;
        let Listing {
            files, selection, ..
        } = &mut *listing;
        selection.prune(files.iter().map(|f| f.id.as_str()));
    }

    fn begin_loading(&self) -> LoadingGuard<'_> {
        self.loading.store(true, Ordering::SeqCst);
        LoadingGuard(&self.loading)
    }
}

/// Share page URL for a storage path.
pub fn share_url(origin: &str, path: &str) -> String {
    format!(
        "{}/share/{}",
        origin.trim_end_matches('/'),
        urlencoding::encode(path)
    )
}
