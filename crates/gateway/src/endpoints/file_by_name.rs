//! # GET /api/file/byname/{fileName}
//!
//! 名前でファイルを検索し、本体を返す。

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Response;

use super::file::file_response;
use crate::config::GatewayState;
use crate::content_type::content_type_for;
use crate::error::GatewayError;

/// GET /api/file/byname/{fileName} — 名前によるファイル取得。
///
/// 名前一致の一覧を取得し、バックエンドの返却順で先頭のものを返す。
/// 同名ファイルが複数ある場合の選択はバックエンドの並び順に依存する。
/// Content-Typeは要求されたファイル名の拡張子から決める。
pub async fn handle_get_file_by_name(
    State(state): State<Arc<GatewayState>>,
    Path(file_name): Path<String>,
) -> Result<Response, GatewayError> {
    if file_name.trim().is_empty() {
        return Err(GatewayError::Validation("File name is required".to_string()));
    }

    let matches = state
        .storage
        .list_objects(&state.bucket_id, &file_name)
        .await?;
    let Some(first) = matches.first() else {
        return Err(GatewayError::NotFound("File not found".to_string()));
    };
    if matches.len() > 1 {
        tracing::warn!(
            file_name = %file_name,
            count = matches.len(),
            file_id = %first.id,
            matched_name = %first.name,
            "同名のファイルが複数存在するため先頭を使用"
        );
    }

    let stored = state
        .storage
        .fetch_bytes(&state.bucket_id, &first.id)
        .await?;

    Ok(file_response(stored.bytes, content_type_for(&file_name)))
}
