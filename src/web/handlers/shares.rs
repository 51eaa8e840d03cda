//! Share table handlers.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use super::AppState;
use crate::model::ShareRecord;
use crate::web::dto::{ApiResponse, ShareQuery, ShareRequest, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

/// POST /rest/v1/shares - Record a share, replacing any record for the path.
pub async fn upsert_share(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<ShareRequest>,
) -> Result<Json<ApiResponse<ShareRecord>>, ApiError> {
    let record = ShareRecord {
        file_path: req.file_path,
        created_at: req.created_at.unwrap_or_else(Utc::now),
        file_id: req.file_id,
        created_by: None,
    };
    let stored = state
        .storage
        .upsert_share(Some(&user.identity()), &record)
        .await?;
    Ok(Json(ApiResponse::new(stored)))
}

/// GET /rest/v1/shares - Look up one record by `file_path` or `file_id`.
///
/// A missing record yields `data: null`.
pub async fn get_share(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ShareQuery>,
) -> Result<Json<ApiResponse<Option<ShareRecord>>>, ApiError> {
    let record = match (query.file_path, query.file_id) {
        (Some(path), None) => state.storage.find_share_by_path(&path).await?,
        (None, Some(id)) => state.storage.find_share_by_file_id(&id).await?,
        _ => {
            return Err(ApiError::bad_request(
                "Exactly one of file_path or file_id is required",
            ))
        }
    };
    Ok(Json(ApiResponse::new(record)))
}
