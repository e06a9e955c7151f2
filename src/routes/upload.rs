use axum::Json;
use axum::extract::{Multipart, State};
use chrono::Utc;
use serde::Serialize;

use crate::cache::fingerprint::content_hash;
use crate::error::ServiceError;
use crate::image_processing;
use crate::routes::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub key: String,
}

/// Multipart selfie upload from the extension popup. The stored image gets
/// a content-addressed key and is served back under `/static`.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ServiceError> {
    let mut file_name = None;
    let mut content_type = None;
    let mut bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ServiceError::Validation(format!("reading form failed: {err}")))?
    {
        if field.name() == Some("file") {
            content_type = field.content_type().map(|value| value.to_string());
            file_name = Some(field.file_name().unwrap_or("").to_string());
            bytes = Some(field.bytes().await.map_err(|err| {
                ServiceError::Validation(format!("reading file failed: {err}"))
            })?);
            break;
        }
    }

    if let Some(content_type) = content_type.as_deref() {
        if !content_type.starts_with("image/") {
            return Err(ServiceError::Validation(
                "unsupported file type, expected an image".to_string(),
            ));
        }
    }
    let file_name =
        file_name.ok_or_else(|| ServiceError::Validation("no file field in form".to_string()))?;
    let bytes =
        bytes.ok_or_else(|| ServiceError::Validation("no file field in form".to_string()))?;
    if bytes.is_empty() {
        return Err(ServiceError::Validation("uploaded file is empty".to_string()));
    }

    let ext = resolve_extension(&file_name, content_type.as_deref());
    let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let hash = content_hash(&format!("upload:{timestamp}:{file_name}:{}", bytes.len()));
    let key = format!("uploads/{hash}.{ext}");
    state
        .assets
        .put(&key, bytes.as_ref())
        .await
        .map_err(|err| ServiceError::Internal(format!("saving upload failed: {err}")))?;

    Ok(Json(UploadResponse {
        url: state.assets.public_url(&key),
        key,
    }))
}

fn extension_from_filename(file_name: &str) -> Option<String> {
    if let Some((_, ext)) = file_name.rsplit_once('.') {
        let trimmed = ext.trim();
        if !trimmed.is_empty() && trimmed != file_name {
            return Some(trimmed.to_lowercase());
        }
    }
    None
}

fn resolve_extension(file_name: &str, content_type: Option<&str>) -> String {
    if let Some(ext) = extension_from_filename(file_name) {
        return ext;
    }
    if let Some(content_type) = content_type {
        let ext = image_processing::extension_for_mime(content_type);
        if ext != "bin" {
            return ext.to_string();
        }
    }
    "bin".to_string()
}
