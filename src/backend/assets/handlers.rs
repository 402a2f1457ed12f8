/**
 * Asset Handlers
 *
 * - POST /uploads/{name} - authenticated upload, 201 with `{src, key}`
 * - GET /uploads/{key} - public download
 */

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::{is_valid_asset_key, AssetGateway};
use crate::backend::error::BackendError;
use crate::backend::middleware::AuthIdentity;

/// Assets never change once stored, so they can be cached for a long time
const ASSET_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Upload an asset (POST /uploads/{name})
pub async fn upload_asset(
    State(assets): State<AssetGateway>,
    AuthIdentity(identity): AuthIdentity,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, BackendError> {
    if name.is_empty() {
        return Err(BackendError::bad_request("asset name is required"));
    }
    if body.len() > assets.max_upload_bytes() {
        return Err(BackendError::handler(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("upload exceeds {} bytes", assets.max_upload_bytes()),
        ));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    tracing::debug!(name = %name, uploader = %identity.label(), "[Assets] Upload requested");
    let uploaded = assets.upload(&name, body, content_type).await?;

    Ok((StatusCode::CREATED, Json(uploaded)).into_response())
}

/// Download an asset (GET /uploads/{key})
pub async fn download_asset(
    State(assets): State<AssetGateway>,
    Path(key): Path<String>,
) -> Result<Response, BackendError> {
    if !is_valid_asset_key(&key) {
        return Err(BackendError::bad_request("invalid asset key"));
    }

    let Some(object) = assets.download(&key).await? else {
        return Err(BackendError::handler(StatusCode::NOT_FOUND, "asset not found"));
    };

    let content_type = object
        .content_type
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, object.body.len())
        .header(header::CACHE_CONTROL, ASSET_CACHE_CONTROL)
        .body(Body::from(object.body))
        .map_err(|e| BackendError::handler(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
