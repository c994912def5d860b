//! # DELETE /api/file/{fileId}
//!
//! ファイルを削除する。

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use filegate_types::MessageResponse;

use crate::config::GatewayState;
use crate::error::GatewayError;

/// DELETE /api/file/{fileId} — ファイル削除。
pub async fn handle_delete_file(
    State(state): State<Arc<GatewayState>>,
    Path(file_id): Path<String>,
) -> Result<Json<MessageResponse>, GatewayError> {
    state
        .storage
        .delete_object(&state.bucket_id, &file_id)
        .await?;

    tracing::info!(file_id = %file_id, "ファイルを削除");

    Ok(Json(MessageResponse {
        message: "File deleted successfully".to_string(),
    }))
}
