//! Object index repository.
//!
//! Object bytes live on disk (see `storage::BlobStore`); this table maps a
//! bucket path to its blob and carries the listing metadata.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::DbPool;
use crate::model::{Bucket, StoredObject};
use crate::{FileShareError, Result};

/// Indexed object.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ObjectRecord {
    /// Object ID (UUID v4).
    pub id: String,
    /// Bucket the object lives in.
    pub bucket: String,
    /// Full path `{owner_id}/{name}`.
    pub path: String,
    /// Owning user ID.
    pub owner_id: String,
    /// File name within the owner's namespace.
    pub name: String,
    /// Blob file name on disk.
    pub stored_name: String,
    /// Size in bytes.
    pub size: i64,
    /// Content type.
    pub mimetype: String,
    /// When the object was written.
    pub created_at: DateTime<Utc>,
    /// When the object was last replaced.
    pub updated_at: DateTime<Utc>,
}

impl ObjectRecord {
    /// Listing entry for this object.
    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject {
            id: self.id.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
            size: Some(self.size.max(0) as u64),
            mimetype: Some(self.mimetype.clone()),
            metadata: Some(serde_json::json!({
                "size": self.size,
                "mimetype": self.mimetype,
            })),
        }
    }
}

/// Data for writing an object.
#[derive(Debug, Clone)]
pub struct NewObject {
    /// Target bucket.
    pub bucket: String,
    /// Owning user ID.
    pub owner_id: String,
    /// File name within the owner's namespace.
    pub name: String,
    /// Blob file name on disk.
    pub stored_name: String,
    /// Size in bytes.
    pub size: i64,
    /// Content type.
    pub mimetype: String,
}

impl NewObject {
    /// Full path of the object.
    pub fn path(&self) -> String {
        crate::model::object_path(&self.owner_id, &self.name)
    }
}

/// Repository for buckets and the object index.
pub struct ObjectRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> ObjectRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a bucket if it does not exist yet.
    pub async fn ensure_bucket(&self, name: &str, public: bool) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO buckets (name, public, created_at) VALUES (?, ?, ?)")
            .bind(name)
            .bind(public)
            .bind(Utc::now())
            .execute(self.pool)
            .await
            .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(())
    }

    /// Get a bucket by name.
    pub async fn get_bucket(&self, name: &str) -> Result<Option<Bucket>> {
        let row: Option<(String, bool)> =
            sqlx::query_as("SELECT name, public FROM buckets WHERE name = ?")
                .bind(name)
                .fetch_optional(self.pool)
                .await
                .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(row.map(|(name, public)| Bucket { name, public }))
    }

    /// Insert an object or replace the one at the same path.
    ///
    /// A replaced object gets a fresh ID and creation time. Returns the new
    /// record and the blob name of the replaced object, if any.
    pub async fn upsert(&self, new_object: &NewObject) -> Result<(ObjectRecord, Option<String>)> {
        let path = new_object.path();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| FileShareError::Database(e.to_string()))?;

        let previous: Option<String> =
            sqlx::query_scalar("SELECT stored_name FROM objects WHERE bucket = ? AND path = ?")
                .bind(&new_object.bucket)
                .bind(&path)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| FileShareError::Database(e.to_string()))?;

        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO objects
                (id, bucket, path, owner_id, name, stored_name, size, mimetype, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (bucket, path) DO UPDATE SET
                id = excluded.id,
                stored_name = excluded.stored_name,
                size = excluded.size,
                mimetype = excluded.mimetype,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at",
        )
        .bind(&id)
        .bind(&new_object.bucket)
        .bind(&path)
        .bind(&new_object.owner_id)
        .bind(&new_object.name)
        .bind(&new_object.stored_name)
        .bind(new_object.size)
        .bind(&new_object.mimetype)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| FileShareError::Database(e.to_string()))?;

        let record = self
            .get_by_path(&new_object.bucket, &path)
            .await?
            .ok_or_else(|| FileShareError::NotFound("object".to_string()))?;

        Ok((record, previous))
    }

    /// Get an object by bucket and path.
    pub async fn get_by_path(&self, bucket: &str, path: &str) -> Result<Option<ObjectRecord>> {
        let result = sqlx::query_as::<_, ObjectRecord>(
            "SELECT id, bucket, path, owner_id, name, stored_name, size, mimetype, created_at, updated_at
             FROM objects WHERE bucket = ? AND path = ?",
        )
        .bind(bucket)
        .bind(path)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(result)
    }

    /// List the objects directly under `prefix`, ordered by name.
    pub async fn list_by_prefix(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectRecord>> {
        let prefix = normalize_prefix(prefix);
        let pattern = format!("{}%", escape_like(&prefix));

        let rows = sqlx::query_as::<_, ObjectRecord>(
            "SELECT id, bucket, path, owner_id, name, stored_name, size, mimetype, created_at, updated_at
             FROM objects
             WHERE bucket = ? AND path LIKE ? ESCAPE '\\'
             ORDER BY name",
        )
        .bind(bucket)
        .bind(pattern)
        .fetch_all(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter(|r| match r.path.strip_prefix(prefix.as_str()) {
                // LIKE ignores ASCII case
                Some(rest) => !rest.contains('/'),
                None => false,
            })
            .collect())
    }

    /// Delete an object. Returns the removed record, if it existed.
    pub async fn delete(&self, bucket: &str, path: &str) -> Result<Option<ObjectRecord>> {
        let Some(record) = self.get_by_path(bucket, path).await? else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM objects WHERE bucket = ? AND path = ?")
            .bind(bucket)
            .bind(path)
            .execute(self.pool)
            .await
            .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(Some(record))
    }
}

/// Treat `u1` and `u1/` alike; the empty prefix lists the bucket root.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
