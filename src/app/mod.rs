//! Application model.
//!
//! [`App`] is the root object a UI drives. It owns one [`SessionState`],
//! one [`FileCollection`] and one [`ShareResolver`], all built once over
//! the same [`Providers`] and shared by `Arc`.

mod files;
mod filter;
mod notify;
mod routes;
mod selection;
mod session;
mod share;

#[cfg(test)]
mod test_support;

pub use files::{
    share_url, CollectionSettings, DownloadLink, FileCollection, FileDescriptor, UploadFile,
};
pub use filter::{FilterSpec, FilterUpdate, SortDirection, SortField, SortSpec};
pub use notify::{Notice, NoticeLevel, NoticeLog, Notifier, TracingNotifier};
pub use routes::{resolve, GuardDecision, Navigation, Resolution, Route, RouteGuard, Screen};
pub use selection::Selection;
pub use session::{SessionSnapshot, SessionState};
pub use share::{parse_share_link, ShareResolver};

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::provider::Providers;

/// What the share screen shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareView {
    /// The shared file; `None` renders the not-found state.
    pub file: Option<FileDescriptor>,
    /// Whether "save to my files" is offered.
    pub can_save: bool,
}

/// Root of the application model.
pub struct App {
    notifier: Arc<dyn Notifier>,
    session: Arc<SessionState>,
    files: Arc<FileCollection>,
    shares: ShareResolver,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl App {
    /// Build the model over a set of collaborators.
    pub fn new(
        providers: Providers,
        settings: CollectionSettings,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let session = Arc::new(SessionState::new(
            providers.auth.clone(),
            notifier.clone(),
        ));
        let files = Arc::new(FileCollection::new(
            providers.store.clone(),
            providers.shares.clone(),
            session.clone(),
            notifier.clone(),
            settings,
        ));
        let shares = ShareResolver::new(
            providers.store,
            providers.shares,
            session.clone(),
            files.clone(),
            notifier.clone(),
        );

        Self {
            notifier,
            session,
            files,
            shares,
            watcher: Mutex::new(None),
        }
    }

    /// Read the existing session, load the listing if signed in, and
    /// reload the listing whenever the signed-in user changes.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(&self) {
        self.session.start().await;

        if self.session.identity().is_some() {
            self.files.fetch_files().await;
        }

        let mut rx = self.session.watch();
        let files = self.files.clone();
        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let user = rx.borrow_and_update().identity.as_ref().map(|i| i.id.clone());
                if user != files.listed_owner() {
                    debug!(?user, "Signed-in user changed, reloading files");
                    files.fetch_files().await;
                }
            }
        });

        if let Some(previous) = self.watcher.lock().replace(handle) {
            previous.abort();
        }
        info!("Application started");
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub fn files(&self) -> &Arc<FileCollection> {
        &self.files
    }

    pub fn shares(&self) -> &ShareResolver {
        &self.shares
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Screen or redirect for a location.
    pub fn resolve(&self, location: &str) -> Resolution {
        resolve(location, &self.session.snapshot())
    }

    /// Load the share screen for a share id.
    pub async fn open_share(&self, share_id: &str) -> ShareView {
        let file = self.shares.get_file_by_share_id(share_id).await;
        let can_save = file.is_some() && self.session.identity().is_some();
        ShareView { file, can_save }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(handle) = self.watcher.lock().take() {
            handle.abort();
        }
    }
}
