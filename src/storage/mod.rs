//! Object storage for the backend service.
//!
//! - [`BlobStore`]: object bytes on disk
//! - [`UrlSigner`]: signed and public object URLs
//! - [`StorageService`]: listing, writes and reads with access control

mod blob;
mod service;
mod signer;

pub use blob::BlobStore;
pub use service::{split_path, StorageService};
pub use signer::{encode_path, UrlSigner, MAX_TTL_SECS};
