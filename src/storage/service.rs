//! Object storage operations with access control.
//!
//! Callers may list, write and remove only under their own namespace
//! (`{user_id}/`). Reads are granted to the owner, or to anyone once the
//! path has a share record.

use mime_guess::MimeGuess;
use tracing::{debug, info, warn};

use super::blob::BlobStore;
use super::signer::UrlSigner;
use crate::config::StorageConfig;
use crate::db::{Database, NewObject, ObjectRecord, ObjectRepository, ShareRepository};
use crate::model::{Bucket, Identity, ShareRecord, StoredObject};
use crate::{FileShareError, Result};

/// Storage operations of the backend service.
#[derive(Clone)]
pub struct StorageService {
    db: Database,
    blobs: BlobStore,
    signer: UrlSigner,
    bucket: String,
    max_object_size: u64,
}

impl StorageService {
    /// Create the service.
    pub fn new(
        db: Database,
        blobs: BlobStore,
        signer: UrlSigner,
        bucket: impl Into<String>,
        max_object_size: u64,
    ) -> Self {
        Self {
            db,
            blobs,
            signer,
            bucket: bucket.into(),
            max_object_size,
        }
    }

    /// Create the service from configuration.
    pub fn from_config(db: Database, config: &StorageConfig) -> Result<Self> {
        Ok(Self::new(
            db,
            BlobStore::new(&config.path)?,
            UrlSigner::new(config.signing_secret.clone(), &config.public_url),
            config.bucket.clone(),
            config.max_object_size_bytes,
        ))
    }

    /// Name of the configured bucket.
    pub fn bucket_name(&self) -> &str {
        &self.bucket
    }

    /// Largest accepted object in bytes.
    pub fn max_object_size(&self) -> u64 {
        self.max_object_size
    }

    /// The URL signer.
    pub fn signer(&self) -> &UrlSigner {
        &self.signer
    }

    /// Create the configured bucket if missing.
    pub async fn ensure_bucket(&self) -> Result<()> {
        ObjectRepository::new(self.db.pool())
            .ensure_bucket(&self.bucket, false)
            .await?;
        debug!(bucket = %self.bucket, "Bucket ready");
        Ok(())
    }

    /// Look up a bucket.
    pub async fn get_bucket(&self, name: &str) -> Result<Bucket> {
        ObjectRepository::new(self.db.pool())
            .get_bucket(name)
            .await?
            .ok_or_else(|| FileShareError::NotFound("Bucket".to_string()))
    }

    /// List a caller's namespace.
    pub async fn list(
        &self,
        caller: Option<&Identity>,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<StoredObject>> {
        let caller = require_caller(caller)?;
        let namespace = prefix.trim_matches('/');
        if namespace != caller.id {
            return Err(FileShareError::Permission(
                "Cannot list another user's files".to_string(),
            ));
        }
        self.get_bucket(bucket).await?;

        let records = ObjectRepository::new(self.db.pool())
            .list_by_prefix(bucket, namespace)
            .await?;
        Ok(records.iter().map(ObjectRecord::to_stored_object).collect())
    }

    /// Write an object into the caller's namespace, replacing any object at
    /// the same path.
    pub async fn upload(
        &self,
        caller: Option<&Identity>,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<ObjectRecord> {
        let caller = require_caller(caller)?;
        let (owner, name) = split_path(path)?;
        if owner != caller.id {
            return Err(FileShareError::Permission(
                "Cannot write outside your own folder".to_string(),
            ));
        }
        if bytes.len() as u64 > self.max_object_size {
            return Err(FileShareError::Validation(
                "The object exceeded the maximum allowed size".to_string(),
            ));
        }
        self.get_bucket(bucket).await?;

        let mimetype = match content_type.map(str::trim).filter(|c| !c.is_empty()) {
            Some(c) => c.to_string(),
            None => MimeGuess::from_path(name)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        };

        let stored_name = self.blobs.save(bytes, name).await?;
        let result = ObjectRepository::new(self.db.pool())
            .upsert(&NewObject {
                bucket: bucket.to_string(),
                owner_id: owner.to_string(),
                name: name.to_string(),
                stored_name: stored_name.clone(),
                size: bytes.len() as i64,
                mimetype,
            })
            .await;

        let (record, replaced) = match result {
            Ok(r) => r,
            Err(e) => {
                let _ = self.blobs.delete(&stored_name).await;
                return Err(e);
            }
        };

        if let Some(old) = replaced {
            if let Err(e) = self.blobs.delete(&old).await {
                warn!(blob = %old, "Failed to delete replaced blob: {}", e);
            }
        }

        info!(path = %record.path, size = record.size, "Object stored");
        Ok(record)
    }

    /// Remove objects from the caller's namespace. Missing paths are
    /// skipped. Returns the removed objects.
    pub async fn remove(
        &self,
        caller: Option<&Identity>,
        bucket: &str,
        paths: &[String],
    ) -> Result<Vec<ObjectRecord>> {
        let caller = require_caller(caller)?;
        for path in paths {
            let (owner, _) = split_path(path)?;
            if owner != caller.id {
                return Err(FileShareError::Permission(
                    "Cannot remove another user's files".to_string(),
                ));
            }
        }

        let repo = ObjectRepository::new(self.db.pool());
        let mut removed = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(record) = repo.delete(bucket, path).await? {
                if let Err(e) = self.blobs.delete(&record.stored_name).await {
                    warn!(blob = %record.stored_name, "Failed to delete blob: {}", e);
                }
                removed.push(record);
            }
        }

        info!(count = removed.len(), "Objects removed");
        Ok(removed)
    }

    /// Create a signed URL for an object the caller may read.
    pub async fn create_signed_url(
        &self,
        caller: Option<&Identity>,
        bucket: &str,
        path: &str,
        ttl_secs: u64,
    ) -> Result<String> {
        self.readable(caller, bucket, path).await?;
        self.signer.sign(bucket, path, ttl_secs)
    }

    /// Public endpoint URL of an object.
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        self.signer.public_object_url(bucket, path)
    }

    /// Read an object the caller may read.
    pub async fn download(
        &self,
        caller: Option<&Identity>,
        bucket: &str,
        path: &str,
    ) -> Result<(ObjectRecord, Vec<u8>)> {
        let record = self.readable(caller, bucket, path).await?;
        let bytes = self.blobs.load(&record.stored_name).await?;
        Ok((record, bytes))
    }

    /// Read an object through a signed URL.
    pub async fn download_signed(
        &self,
        bucket: &str,
        path: &str,
        token: &str,
        expires: i64,
    ) -> Result<(ObjectRecord, Vec<u8>)> {
        self.signer.verify(bucket, path, token, expires)?;
        let record = self.object(bucket, path).await?;
        let bytes = self.blobs.load(&record.stored_name).await?;
        Ok((record, bytes))
    }

    /// Read a shared object through the public endpoint.
    ///
    /// Paths without a share record are reported as missing.
    pub async fn download_public(&self, bucket: &str, path: &str) -> Result<(ObjectRecord, Vec<u8>)> {
        if !ShareRepository::new(self.db.pool()).is_shared(path).await? {
            return Err(FileShareError::NotFound("Object".to_string()));
        }
        let record = self.object(bucket, path).await?;
        let bytes = self.blobs.load(&record.stored_name).await?;
        Ok((record, bytes))
    }

    /// Record that the caller shares one of their paths.
    ///
    /// `created_by` is always the caller. An existing record for the path
    /// is replaced.
    pub async fn upsert_share(
        &self,
        caller: Option<&Identity>,
        record: &ShareRecord,
    ) -> Result<ShareRecord> {
        let caller = require_caller(caller)?;
        let (owner, _) = split_path(&record.file_path)?;
        if owner != caller.id {
            return Err(FileShareError::Permission(
                "Cannot share another user's files".to_string(),
            ));
        }

        let record = ShareRecord {
            created_by: Some(caller.id.clone()),
            ..record.clone()
        };
        ShareRepository::new(self.db.pool()).upsert(&record).await?;
        info!(path = %record.file_path, "Share recorded");
        Ok(record)
    }

    /// Share record for a storage path.
    pub async fn find_share_by_path(&self, file_path: &str) -> Result<Option<ShareRecord>> {
        ShareRepository::new(self.db.pool())
            .find_by_path(file_path)
            .await
    }

    /// Share record for a shared object ID.
    pub async fn find_share_by_file_id(&self, file_id: &str) -> Result<Option<ShareRecord>> {
        ShareRepository::new(self.db.pool())
            .find_by_file_id(file_id)
            .await
    }

    async fn object(&self, bucket: &str, path: &str) -> Result<ObjectRecord> {
        ObjectRepository::new(self.db.pool())
            .get_by_path(bucket, path)
            .await?
            .ok_or_else(|| FileShareError::NotFound("Object".to_string()))
    }

    async fn readable(&self, caller: Option<&Identity>, bucket: &str, path: &str) -> Result<ObjectRecord> {
        let record = self.object(bucket, path).await?;
        if caller.is_some_and(|c| c.id == record.owner_id) {
            return Ok(record);
        }
        if ShareRepository::new(self.db.pool()).is_shared(path).await? {
            return Ok(record);
        }
        Err(FileShareError::Permission(
            "Object is not shared".to_string(),
        ))
    }
}

fn require_caller(caller: Option<&Identity>) -> Result<&Identity> {
    caller.ok_or_else(|| FileShareError::Auth("Not authenticated".to_string()))
}

/// Split `{owner}/{name}`; the name may not contain further separators.
pub fn split_path(path: &str) -> Result<(&str, &str)> {
    match path.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => Err(FileShareError::Validation(format!(
            "Invalid object path: {path}"
        ))),
    }
}
