use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use suuq_types::api::{Claims, UploadResponse};
use suuq_types::i18n::Text;
use suuq_types::models::Bucket;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body cap for the upload route: the largest bucket limit plus
/// room so oversized files still reach the per-bucket check.
pub const UPLOAD_BODY_LIMIT: usize = 11 * 1024 * 1024;

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    pub filename: Option<String>,
}

fn bucket_from_path(bucket: &str) -> Result<Bucket, ApiError> {
    bucket.parse().map_err(|_| ApiError::NotFound)
}

/// POST /uploads/{bucket}: raw file bytes, stored under the caller's
/// folder with a fresh name. The extension follows the accepted MIME type;
/// the client's `filename` is only logged.
pub async fn upload(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(bucket): Path<String>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let bucket = bucket_from_path(&bucket)?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let Some(ext) = bucket.extension(&content_type) else {
        return Err(ApiError::UnsupportedMediaType(content_type));
    };
    if bytes.is_empty() {
        return Err(ApiError::validation("Faylku waa madhan yahay", "The file is empty"));
    }
    if bytes.len() > bucket.max_size() {
        return Err(ApiError::PayloadTooLarge {
            limit: bucket.max_size(),
        });
    }

    let relative = format!("{}/{}.{}", claims.sub, Uuid::new_v4(), ext);
    let stored = state
        .storage
        .save(bucket, &relative, &bytes)
        .await
        .map_err(|e| {
            error!("Failed to store upload {}/{}: {}", bucket, relative, e);
            ApiError::Internal(e)
        })?;

    info!(
        "{} ({}) uploaded {}/{} ({} bytes, client name {:?})",
        claims.email,
        claims.sub,
        bucket,
        stored.path,
        stored.size,
        query.filename.as_deref().unwrap_or("-")
    );

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            url: state.public_file_url(bucket.as_str(), &stored.path),
            path: stored.path,
            size: stored.size,
            sha256: stored.sha256,
        }),
    ))
}

/// DELETE /uploads/{bucket}/{user_id}/{file}: callers may only remove
/// files in their own folder.
pub async fn delete_upload(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((bucket, owner, file)): Path<(String, Uuid, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let bucket = bucket_from_path(&bucket)?;
    if owner != claims.sub {
        return Err(ApiError::Forbidden(Text::new(
            "Faylkan adiga ma lihid",
            "You do not own this file",
        )));
    }
    if file.is_empty() || file.contains(['/', '\\']) || file.starts_with('.') {
        return Err(ApiError::validation("Magaca faylka sax ma aha", "Invalid file name"));
    }

    let relative = format!("{}/{}", owner, file);
    if !state.storage.delete(bucket, &relative).await? {
        return Err(ApiError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}
