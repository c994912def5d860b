//! # GET /api/file/url/{fileId}
//!
//! ファイルの閲覧用URLを返す。

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use filegate_types::FileUrlResponse;

use crate::config::GatewayState;
use crate::error::GatewayError;

/// GET /api/file/url/{fileId} — 閲覧URLの発行。
/// URLの形式（公開URLか署名付きURLか）はバックエンドによる。
pub async fn handle_get_file_url(
    State(state): State<Arc<GatewayState>>,
    Path(file_id): Path<String>,
) -> Result<Json<FileUrlResponse>, GatewayError> {
    let file_url = state.storage.file_url(&state.bucket_id, &file_id).await?;
    Ok(Json(FileUrlResponse { file_url }))
}
