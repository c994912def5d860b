//! # GET /api/file/{fileId}
//!
//! IDでファイル本体を取得する。

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::config::GatewayState;
use crate::content_type::DEFAULT_CONTENT_TYPE;
use crate::error::GatewayError;

/// バイト列をContent-Type付きのレスポンスにする。
/// ヘッダー値として不正なContent-Typeは既定値に置き換える。
pub(crate) fn file_response(bytes: Bytes, content_type: &str) -> Response {
    let content_type = HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
}

/// GET /api/file/{fileId} — ファイル本体の取得。
///
/// Content-Typeはバックエンドが保持しているMIMEタイプを使う。
/// 報告されない場合は `application/octet-stream`。
pub async fn handle_get_file(
    State(state): State<Arc<GatewayState>>,
    Path(file_id): Path<String>,
) -> Result<Response, GatewayError> {
    let stored = state
        .storage
        .fetch_bytes(&state.bucket_id, &file_id)
        .await?;
    let content_type = stored
        .content_type
        .as_deref()
        .unwrap_or(DEFAULT_CONTENT_TYPE);

    Ok(file_response(stored.bytes, content_type))
}
