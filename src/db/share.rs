//! Share record repository.

use super::DbPool;
use crate::model::ShareRecord;
use crate::{FileShareError, Result};

/// Repository for share records, keyed by storage path.
pub struct ShareRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> ShareRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a record or replace the one for the same path.
    pub async fn upsert(&self, record: &ShareRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO shares (file_path, created_at, file_id, created_by)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (file_path) DO UPDATE SET
                created_at = excluded.created_at,
                file_id = excluded.file_id,
                created_by = excluded.created_by",
        )
        .bind(&record.file_path)
        .bind(record.created_at)
        .bind(&record.file_id)
        .bind(&record.created_by)
        .execute(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(())
    }

    /// Find the record for an exact storage path.
    pub async fn find_by_path(&self, file_path: &str) -> Result<Option<ShareRecord>> {
        let result = sqlx::query_as::<_, ShareRecord>(
            "SELECT file_path, created_at, file_id, created_by FROM shares WHERE file_path = ?",
        )
        .bind(file_path)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Find the most recent record for a shared object ID.
    pub async fn find_by_file_id(&self, file_id: &str) -> Result<Option<ShareRecord>> {
        let result = sqlx::query_as::<_, ShareRecord>(
            "SELECT file_path, created_at, file_id, created_by FROM shares
             WHERE file_id = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(file_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| FileShareError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Whether a path has been shared.
    pub async fn is_shared(&self, file_path: &str) -> Result<bool> {
        Ok(self.find_by_path(file_path).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::Utc;

    fn record(path: &str, file_id: &str, by: &str) -> ShareRecord {
        ShareRecord {
            file_path: path.to_string(),
            created_at: Utc::now(),
            file_id: file_id.to_string(),
            created_by: Some(by.to_string()),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_find() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = ShareRepository::new(db.pool());

        repo.upsert(&record("u1/a.pdf", "f1", "u1")).await.unwrap();

        let found = repo.find_by_path("u1/a.pdf").await.unwrap().unwrap();
        assert_eq!(found.file_id, "f1");
        assert_eq!(found.created_by.as_deref(), Some("u1"));

        let by_id = repo.find_by_file_id("f1").await.unwrap().unwrap();
        assert_eq!(by_id.file_path, "u1/a.pdf");
    }

    #[tokio::test]
    async fn test_upsert_last_write_wins() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = ShareRepository::new(db.pool());

        repo.upsert(&record("u1/a.pdf", "f1", "u1")).await.unwrap();
        repo.upsert(&record("u1/a.pdf", "f2", "u2")).await.unwrap();

        let found = repo.find_by_path("u1/a.pdf").await.unwrap().unwrap();
        assert_eq!(found.file_id, "f2");
        assert_eq!(found.created_by.as_deref(), Some("u2"));
        assert!(repo.find_by_file_id("f1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_path() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = ShareRepository::new(db.pool());

        assert!(repo.find_by_path("u1/none.pdf").await.unwrap().is_none());
        assert!(!repo.is_shared("u1/none.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_path_match_is_exact() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = ShareRepository::new(db.pool());
        repo.upsert(&record("u1/a.pdf", "f1", "u1")).await.unwrap();

        assert!(repo.find_by_path("u1/A.pdf").await.unwrap().is_none());
        assert!(repo.find_by_path("u1").await.unwrap().is_none());
    }
}
