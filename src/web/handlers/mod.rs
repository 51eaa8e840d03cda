//! HTTP API handlers.

pub mod auth;
pub mod shares;
pub mod storage;

pub use auth::*;
pub use shares::*;
pub use storage::*;

use crate::auth::AuthService;
use crate::storage::StorageService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Account and session operations.
    pub auth: AuthService,
    /// Object and share operations.
    pub storage: StorageService,
}

impl AppState {
    /// Create the state.
    pub fn new(auth: AuthService, storage: StorageService) -> Self {
        Self { auth, storage }
    }
}
