//! # Gateway エラー型
//!
//! 全エンドポイントで共通のエラー型。ボディは常に `{"error": "..."}`。

use axum::http::StatusCode;
use axum::Json;
use filegate_types::ErrorResponse;

/// Gatewayエラー型。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 必須入力の欠落・空値
    #[error("{0}")]
    Validation(String),
    /// リクエストボディが上限を超えた
    #[error("{0}")]
    PayloadTooLarge(String),
    /// 対象オブジェクトが存在しない
    #[error("{0}")]
    NotFound(String),
    /// ストレージバックエンドの失敗（ネットワーク、認証、クォータ等）。
    /// バックエンドのメッセージをそのまま保持する。
    #[error("{0}")]
    Backend(String),
    /// ローカル処理の失敗（一時ファイルI/O等）
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTPステータスコードへの対応。
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Backend(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "リクエスト処理に失敗");
        }
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
