//! Resolution of share links.

use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use super::files::{FileCollection, FileDescriptor, UploadFile};
use super::notify::{Notice, Notifier};
use super::session::{failure_message, SessionState};
use crate::model::path_file_name;
use crate::provider::{ObjectStore, ShareTable};
use crate::{FileShareError, Result};

/// Name given to a saved shared file whose path has no last segment.
const FALLBACK_FILE_NAME: &str = "shared-file";

/// Looks up shared files and copies them into the signed-in user's files.
pub struct ShareResolver {
    store: Arc<dyn ObjectStore>,
    shares: Arc<dyn ShareTable>,
    session: Arc<SessionState>,
    files: Arc<FileCollection>,
    notifier: Arc<dyn Notifier>,
}

impl ShareResolver {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        shares: Arc<dyn ShareTable>,
        session: Arc<SessionState>,
        files: Arc<FileCollection>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            shares,
            session,
            files,
            notifier,
        }
    }

    /// Descriptor of a shared file.
    ///
    /// `share_id` is the URL-encoded storage path. Paths that were never
    /// shared yield `None`.
    pub async fn get_file_by_share_id(&self, share_id: &str) -> Option<FileDescriptor> {
        let path = match urlencoding::decode(share_id) {
            Ok(path) => path.into_owned(),
            Err(e) => {
                warn!(share_id, "Share id is not valid UTF-8: {}", e);
                return None;
            }
        };
        let public_url = self.store.get_public_url(&path);

        let record = match self.shares.find_by_path(&path).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                info!(path = %path, "No share record for path");
                return None;
            }
            Err(e) => {
                warn!(path = %path, "Error getting shared file: {}", e);
                return None;
            }
        };

        let ttl = self.files.settings().listing_url_ttl;
        let url = match self.store.create_signed_url(&path, ttl).await {
            Ok(url) => url,
            Err(e) => {
                debug!(path = %path, "Falling back to public URL: {}", e);
                public_url
            }
        };

        Some(FileDescriptor {
            id: record.file_id,
            name: path_file_name(&path).to_string(),
            size: 0,
            content_type: String::new(),
            created_at: record.created_at,
            url,
            owner_id: record.created_by.unwrap_or_default(),
            metadata: None,
            path,
        })
    }

    /// Copy a shared file into the signed-in user's namespace.
    ///
    /// Goes through the normal upload path, so the size cap and overwrite
    /// rule apply. Returns whether the copy was stored.
    pub async fn add_shared_file_to_my_files(&self, file_id: &str) -> bool {
        if self.session.identity().is_none() {
            return false;
        }

        let record = match self.shares.find_by_file_id(file_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(file_id, "No share record for file");
                self.notifier
                    .notify(Notice::error("Failed to add file to your collection"));
                return false;
            }
            Err(e) => {
                warn!(file_id, "Error finding shared file: {}", e);
                self.notify_failure(&e);
                return false;
            }
        };

        let download = match self.store.download(&record.file_path).await {
            Ok(download) => download,
            Err(e) => {
                warn!(path = %record.file_path, "Error downloading shared file: {}", e);
                self.notify_failure(&e);
                return false;
            }
        };

        let name = match path_file_name(&record.file_path) {
            "" => FALLBACK_FILE_NAME,
            name => name,
        };
        let mut upload = UploadFile::new(name, download.bytes);
        if !download.content_type.is_empty() {
            upload = upload.with_content_type(download.content_type);
        }

        if !self.files.upload_file(upload).await {
            return false;
        }
        info!(path = %record.file_path, "Shared file saved");
        self.notifier
            .notify(Notice::success("File added to your files successfully"));
        true
    }

    fn notify_failure(&self, err: &FileShareError) {
        self.notifier.notify(Notice::error(failure_message(
            err,
            "Failed to add file to your collection",
        )));
    }
}

/// Extract the share id from a pasted share link.
///
/// The id is the part of the link's path after `/share/`, still
/// URL-encoded.
pub fn parse_share_link(link: &str) -> Result<String> {
    let invalid = || FileShareError::Validation("Invalid share link".to_string());

    let url = Url::parse(link.trim()).map_err(|_| invalid())?;
    match url.path().split_once("/share/") {
        Some((_, id)) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(invalid()),
    }
}
