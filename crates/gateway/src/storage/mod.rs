//! # オブジェクトストレージ
//!
//! Gatewayが委譲するクラウドオブジェクトストレージの抽象インターフェース。
//!
//! 現在の実装:
//! - `appwrite` — Appwrite Storage REST API
//! - `s3` — S3互換API（AWS S3, MinIO, Cloudflare R2 等）
//! - `memory` — プロセス内メモリ（ローカル開発・テスト用）

pub mod appwrite;
pub mod memory;
#[cfg(feature = "vendor-aws")]
pub mod s3;

pub use appwrite::AppwriteStorage;
pub use memory::MemoryStorage;
#[cfg(feature = "vendor-aws")]
pub use s3::S3Storage;

use bytes::Bytes;

use crate::error::GatewayError;

/// バックエンドに一意なIDの採番を依頼する特殊値。
pub const UNIQUE_ID: &str = "unique()";

/// 新規作成するオブジェクトの内容。
#[derive(Debug, Clone)]
pub struct NewObject {
    /// ファイル本体
    pub bytes: Bytes,
    /// 元のファイル名
    pub file_name: String,
    /// 申告されたMIMEタイプ
    pub mime_type: String,
}

/// `fetch_bytes` の結果。
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Bytes,
    /// バックエンドが保持しているMIMEタイプ（報告されない場合はNone）
    pub content_type: Option<String>,
}

/// 名前検索でヒットしたオブジェクト。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub id: String,
    pub name: String,
}

/// オブジェクトストレージの抽象インターフェース。
///
/// コンテナ（バケット）IDは呼び出しごとに渡す。実装はコンテナIDを保持しない。
#[async_trait::async_trait]
pub trait ObjectStorage: Send + Sync {
    /// オブジェクトを作成し、割り当てられたIDを返す。
    ///
    /// `file_id` に [`UNIQUE_ID`] を渡すとバックエンド側で一意なIDが採番される。
    async fn create_object(
        &self,
        bucket_id: &str,
        file_id: &str,
        object: NewObject,
    ) -> Result<String, GatewayError>;

    /// オブジェクトの生バイト列を取得する。
    async fn fetch_bytes(&self, bucket_id: &str, file_id: &str)
        -> Result<StoredObject, GatewayError>;

    /// オブジェクトのメタデータレコードを取得する。レコードは加工しない。
    async fn fetch_metadata(
        &self,
        bucket_id: &str,
        file_id: &str,
    ) -> Result<serde_json::Value, GatewayError>;

    /// 名前が一致するオブジェクトを列挙する。順序はバックエンドの返却順。
    async fn list_objects(
        &self,
        bucket_id: &str,
        name: &str,
    ) -> Result<Vec<ObjectSummary>, GatewayError>;

    /// オブジェクトを削除する。
    async fn delete_object(&self, bucket_id: &str, file_id: &str) -> Result<(), GatewayError>;

    /// オブジェクトの閲覧用URLを返す。
    async fn file_url(&self, bucket_id: &str, file_id: &str) -> Result<String, GatewayError>;
}

/// [`UNIQUE_ID`] が指定された場合にローカルでIDを採番する。
/// Appwrite以外のバックエンドで使用する。
pub(crate) fn resolve_file_id(file_id: &str) -> String {
    if file_id == UNIQUE_ID {
        uuid::Uuid::new_v4().simple().to_string()
    } else {
        file_id.to_string()
    }
}
