//! Object storage handlers.

use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{header, HeaderMap, Response},
    Json,
};
use std::sync::Arc;

use super::AppState;
use crate::db::ObjectRecord;
use crate::model::{Bucket, StoredObject};
use crate::web::dto::{
    ApiResponse, ListRequest, RemoveRequest, SignRequest, SignedUrlQuery, SignedUrlResponse,
    UploadResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::{AuthUser, OptionalAuthUser};

/// Build a Content-Disposition value for a download.
///
/// Control characters are dropped, quotes and backslashes replaced in the
/// plain `filename`, and non-ASCII names are also sent as RFC 5987
/// `filename*`.
fn content_disposition(file_name: &str) -> String {
    let plain = file_name.is_ascii()
        && !file_name
            .chars()
            .any(|c| c.is_control() || c == '"' || c == '\\');
    if plain {
        return format!("attachment; filename=\"{}\"", file_name);
    }

    let fallback: String = file_name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            c if !c.is_ascii() => '_',
            c => c,
        })
        .collect();
    let cleaned: String = file_name.chars().filter(|c| !c.is_control()).collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(&cleaned)
    )
}

fn object_response(record: ObjectRecord, bytes: Vec<u8>) -> Result<Response<Body>, ApiError> {
    Response::builder()
        .header(header::CONTENT_TYPE, record.mimetype.as_str())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&record.name),
        )
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(header::CACHE_CONTROL, "private, max-age=60")
        .body(Body::from(bytes))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// GET /storage/v1/bucket/:name - Bucket existence.
pub async fn get_bucket(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<Bucket>>, ApiError> {
    let bucket = state.storage.get_bucket(&name).await?;
    Ok(Json(ApiResponse::new(bucket)))
}

/// POST /storage/v1/object/list/:bucket - List the caller's namespace.
pub async fn list_objects(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(bucket): Path<String>,
    Json(req): Json<ListRequest>,
) -> Result<Json<ApiResponse<Vec<StoredObject>>>, ApiError> {
    let objects = state
        .storage
        .list(Some(&user.identity()), &bucket, &req.prefix)
        .await?;
    Ok(Json(ApiResponse::new(objects)))
}

/// POST /storage/v1/object/:bucket/*path - Upload, replacing any object at
/// the path.
pub async fn upload_object(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path((bucket, path)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<UploadResponse>>, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let record = state
        .storage
        .upload(Some(&user.identity()), &bucket, &path, &body, content_type)
        .await?;

    Ok(Json(ApiResponse::new(UploadResponse {
        id: record.id,
        path: record.path,
    })))
}

/// DELETE /storage/v1/object/:bucket - Remove objects. Returns the removed
/// paths.
pub async fn remove_objects(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(bucket): Path<String>,
    ValidatedJson(req): ValidatedJson<RemoveRequest>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let removed = state
        .storage
        .remove(Some(&user.identity()), &bucket, &req.prefixes)
        .await?;
    Ok(Json(ApiResponse::new(
        removed.into_iter().map(|r| r.path).collect(),
    )))
}

/// POST /storage/v1/object/sign/:bucket/*path - Create a signed URL.
pub async fn create_signed_url(
    State(state): State<Arc<AppState>>,
    user: OptionalAuthUser,
    Path((bucket, path)): Path<(String, String)>,
    ValidatedJson(req): ValidatedJson<SignRequest>,
) -> Result<Json<ApiResponse<SignedUrlResponse>>, ApiError> {
    let signed_url = state
        .storage
        .create_signed_url(user.identity().as_ref(), &bucket, &path, req.expires_in)
        .await?;
    Ok(Json(ApiResponse::new(SignedUrlResponse { signed_url })))
}

/// GET /storage/v1/object/sign/:bucket/*path - Fetch through a signed URL.
pub async fn get_signed_object(
    State(state): State<Arc<AppState>>,
    Path((bucket, path)): Path<(String, String)>,
    Query(query): Query<SignedUrlQuery>,
) -> Result<Response<Body>, ApiError> {
    let (record, bytes) = state
        .storage
        .download_signed(&bucket, &path, &query.token, query.expires)
        .await?;
    object_response(record, bytes)
}

/// GET /storage/v1/object/public/:bucket/*path - Fetch a shared object.
pub async fn get_public_object(
    State(state): State<Arc<AppState>>,
    Path((bucket, path)): Path<(String, String)>,
) -> Result<Response<Body>, ApiError> {
    let (record, bytes) = state.storage.download_public(&bucket, &path).await?;
    object_response(record, bytes)
}

/// GET /storage/v1/object/authenticated/:bucket/*path - Download an object
/// the caller owns or that is shared.
pub async fn get_authenticated_object(
    State(state): State<Arc<AppState>>,
    user: OptionalAuthUser,
    Path((bucket, path)): Path<(String, String)>,
) -> Result<Response<Body>, ApiError> {
    let (record, bytes) = state
        .storage
        .download(user.identity().as_ref(), &bucket, &path)
        .await?;
    object_response(record, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition("report 2024.pdf"),
            "attachment; filename=\"report 2024.pdf\""
        );
    }

    #[test]
    fn test_content_disposition_unicode() {
        let value = content_disposition("日本.txt");
        assert!(value.starts_with("attachment; filename=\"__.txt\""));
        assert!(value.contains("filename*=UTF-8''%E6%97%A5%E6%9C%AC.txt"));
    }

    #[test]
    fn test_content_disposition_strips_injection() {
        let value = content_disposition("a\"\r\nX-Evil: 1.txt");
        assert!(!value.contains('\r'));
        assert!(!value.contains('\n'));
        assert!(value.contains("filename=\"a_X-Evil: 1.txt\""));
    }
}
