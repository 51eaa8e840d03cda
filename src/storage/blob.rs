//! On-disk blob store.
//!
//! Object bytes are stored under UUID-based names in a sharded directory
//! structure:
//! ```text
//! {base_path}/
//! ├── ab/
//! │   └── ab12cd34-5678-90ab-cdef-123456789012.pdf
//! ├── cd/
//! │   └── cd90ab12-3456-7890-abcd-ef1234567890.bin
//! └── ...
//! ```

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::{FileShareError, Result};

/// Blob store rooted at a directory.
#[derive(Debug, Clone)]
pub struct BlobStore {
    base_path: PathBuf,
}

impl BlobStore {
    /// Create a store; the base directory is created if missing.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Write content under a fresh name derived from `original_name`'s
    /// extension. Returns the stored name.
    pub async fn save(&self, content: &[u8], original_name: &str) -> Result<String> {
        let stored_name = Self::generate_stored_name(original_name);
        let file_path = self.file_path(&stored_name);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&file_path, content).await?;

        Ok(stored_name)
    }

    /// Read a blob.
    pub async fn load(&self, stored_name: &str) -> Result<Vec<u8>> {
        match fs::read(self.file_path(stored_name)).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(FileShareError::NotFound(format!("Blob {stored_name}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a blob. Returns `false` if it didn't exist.
    pub async fn delete(&self, stored_name: &str) -> Result<bool> {
        match fs::remove_file(self.file_path(stored_name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a blob exists.
    pub async fn exists(&self, stored_name: &str) -> bool {
        fs::try_exists(self.file_path(stored_name))
            .await
            .unwrap_or(false)
    }

    /// Full path of a blob: `{base_path}/{shard}/{stored_name}`.
    pub fn file_path(&self, stored_name: &str) -> PathBuf {
        self.base_path
            .join(Self::shard(stored_name))
            .join(stored_name)
    }

    /// First two characters of the stored name.
    fn shard(stored_name: &str) -> &str {
        stored_name.get(..2).unwrap_or(stored_name)
    }

    /// Extension of a file name, or "bin" if it has none usable.
    fn extension(filename: &str) -> String {
        Path::new(filename)
            .extension()
            .and_then(|s| s.to_str())
            .filter(|ext| !ext.is_empty() && ext.len() <= 16)
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_else(|| "bin".to_string())
    }

    /// New UUID-based stored name keeping the extension.
    fn generate_stored_name(original_name: &str) -> String {
        format!("{}.{}", Uuid::new_v4(), Self::extension(original_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, BlobStore) {
        let dir = TempDir::new().unwrap();
        let store = BlobStore::new(dir.path().join("objects")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (_dir, store) = store();

        let name = store.save(b"hello", "greeting.txt").await.unwrap();
        assert!(name.ends_with(".txt"));
        assert!(store.exists(&name).await);
        assert_eq!(store.load(&name).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_sharded_layout() {
        let (_dir, store) = store();

        let name = store.save(b"x", "a.pdf").await.unwrap();
        let path = store.file_path(&name);
        let shard = path.parent().unwrap().file_name().unwrap().to_str().unwrap();
        assert_eq!(shard, &name[..2]);
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, store) = store();

        let name = store.save(b"x", "a.pdf").await.unwrap();
        assert!(store.delete(&name).await.unwrap());
        assert!(!store.delete(&name).await.unwrap());
        assert!(store.load(&name).await.unwrap_err().is_not_found());
    }

    #[test]
    fn test_extension_sanitized() {
        assert_eq!(BlobStore::extension("a.PDF"), "pdf");
        assert_eq!(BlobStore::extension("noext"), "bin");
        assert_eq!(BlobStore::extension("weird.p$f"), "bin");
        assert_eq!(BlobStore::extension(".hidden"), "bin");
    }
}
