//! fileshare - personal file storage with time-limited share links.
//!
//! The crate has three layers:
//! - [`app`]: the application model a UI drives (session, file listing,
//!   share resolution, route guards)
//! - [`provider`]: the collaborator traits the model talks to, with an
//!   in-process backend and an HTTP client backend
//! - [`web`]: the backend HTTP service the client backend talks to

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod provider;
pub mod storage;
pub mod web;

pub use app::App;
pub use config::Config;
pub use db::Database;
pub use error::{FileShareError, Result};
pub use provider::{LocalBackend, Providers, RemoteBackend};
