//! # GET /api/file/metadata/{fileId}
//!
//! ファイルのメタデータ（サイズ、MIMEタイプ、作成日時等）を返す。

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use filegate_types::MetadataResponse;

use crate::config::GatewayState;
use crate::error::GatewayError;

/// GET /api/file/metadata/{fileId} — メタデータ取得。
/// バックエンドのレコードは加工せずに返す。
pub async fn handle_get_metadata(
    State(state): State<Arc<GatewayState>>,
    Path(file_id): Path<String>,
) -> Result<Json<MetadataResponse>, GatewayError> {
    let metadata = state
        .storage
        .fetch_metadata(&state.bucket_id, &file_id)
        .await?;

    Ok(Json(MetadataResponse { metadata }))
}
