//! # Filegate 共有型定義
//!
//! Gateway の HTTP API がやり取りする JSON ボディを Rust 構造体として提供する。
//!
//! ## フィールド名の規則
//! - JSON 側は camelCase（`fileId`, `fileUrl`）
//! - メタデータはストレージバックエンドのレコードをそのまま `serde_json::Value` で保持する

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// 成功レスポンス
// ---------------------------------------------------------------------------

/// POST /api/upload のレスポンス。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// 完了メッセージ
    pub message: String,
    /// バックエンドが割り当てたファイルID
    pub file_id: String,
}

/// メッセージのみを返すレスポンス（削除完了など）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// GET /api/file/metadata/{fileId} のレスポンス。
/// バックエンドのレコードを加工せずに包む。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataResponse {
    pub metadata: serde_json::Value,
}

/// GET /api/file/url/{fileId} のレスポンス。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUrlResponse {
    /// ファイル閲覧用URL（バックエンドによっては署名付き）
    pub file_url: String,
}

// ---------------------------------------------------------------------------
// エラーレスポンス
// ---------------------------------------------------------------------------

/// 全エンドポイント共通のエラーボディ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
