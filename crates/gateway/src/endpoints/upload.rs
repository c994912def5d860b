//! # POST /api/upload
//!
//! マルチパートの `file` パートをステージングし、バックエンドに新規オブジェクトとして登録する。

use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use filegate_types::UploadResponse;

use crate::config::GatewayState;
use crate::error::GatewayError;
use crate::staging::stage_file_part;
use crate::storage::{NewObject, UNIQUE_ID};

const NO_FILE_MESSAGE: &str = "No file uploaded";

/// POST /api/upload — ファイルアップロード。
///
/// `file` パートが無い場合はバックエンドを呼ばずに400を返す。
/// ステージングした一時ファイルは成功・失敗どちらの経路でもスコープ終了時に解放される。
pub async fn handle_upload(
    State(state): State<Arc<GatewayState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), GatewayError> {
    // multipart/form-data でないリクエストもファイル無しとして扱う
    let Ok(mut multipart) = multipart else {
        return Err(GatewayError::Validation(NO_FILE_MESSAGE.to_string()));
    };

    let incoming = stage_file_part(&mut multipart, &state.staging)
        .await?
        .ok_or_else(|| GatewayError::Validation(NO_FILE_MESSAGE.to_string()))?;

    let object = NewObject {
        bytes: incoming.read_bytes().await?,
        file_name: incoming.file_name.clone(),
        mime_type: incoming.mime_type.clone(),
    };
    let size = object.bytes.len();

    let file_id = state
        .storage
        .create_object(&state.bucket_id, UNIQUE_ID, object)
        .await
        .map_err(|e| match e {
            // 作成時の404は対象バケットが存在しないことを意味する
            GatewayError::NotFound(message) => GatewayError::Backend(message),
            other => other,
        })?;
    drop(incoming);

    tracing::info!(
        file_id = %file_id,
        size,
        "ファイルをアップロード"
    );

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "File uploaded successfully".to_string(),
            file_id,
        }),
    ))
}
