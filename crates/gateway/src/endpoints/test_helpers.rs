//! # エンドポイントテスト用共通ヘルパー
//!
//! 実際のルーターをメモリストレージで組み立て、`oneshot` でリクエストを流す。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use bytes::Bytes;
use filegate_types::UploadResponse;
use tower::ServiceExt;

use crate::config::GatewayState;
use crate::error::GatewayError;
use crate::staging::StagingMode;
use crate::storage::{MemoryStorage, NewObject, ObjectStorage, ObjectSummary, StoredObject};

pub const TEST_BUCKET: &str = "test-bucket";
const BOUNDARY: &str = "filegate-test-boundary";

/// 呼び出し回数を数えるストレージ。内部はMemoryStorage。
pub struct CountingStorage {
    inner: MemoryStorage,
    calls: Arc<AtomicUsize>,
}

impl CountingStorage {
    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl ObjectStorage for CountingStorage {
    async fn create_object(
        &self,
        bucket_id: &str,
        file_id: &str,
        object: NewObject,
    ) -> Result<String, GatewayError> {
        self.hit();
        self.inner.create_object(bucket_id, file_id, object).await
    }

    async fn fetch_bytes(
        &self,
        bucket_id: &str,
        file_id: &str,
    ) -> Result<StoredObject, GatewayError> {
        self.hit();
        self.inner.fetch_bytes(bucket_id, file_id).await
    }

    async fn fetch_metadata(
        &self,
        bucket_id: &str,
        file_id: &str,
    ) -> Result<serde_json::Value, GatewayError> {
        self.hit();
        self.inner.fetch_metadata(bucket_id, file_id).await
    }

    async fn list_objects(
        &self,
        bucket_id: &str,
        name: &str,
    ) -> Result<Vec<ObjectSummary>, GatewayError> {
        self.hit();
        self.inner.list_objects(bucket_id, name).await
    }

    async fn delete_object(&self, bucket_id: &str, file_id: &str) -> Result<(), GatewayError> {
        self.hit();
        self.inner.delete_object(bucket_id, file_id).await
    }

    async fn file_url(&self, bucket_id: &str, file_id: &str) -> Result<String, GatewayError> {
        self.hit();
        self.inner.file_url(bucket_id, file_id).await
    }
}

/// 全操作が同じバックエンドエラーを返すストレージ。
pub struct FailingStorage(pub &'static str);

#[async_trait::async_trait]
impl ObjectStorage for FailingStorage {
    async fn create_object(&self, _: &str, _: &str, _: NewObject) -> Result<String, GatewayError> {
        Err(GatewayError::Backend(self.0.to_string()))
    }

    async fn fetch_bytes(&self, _: &str, _: &str) -> Result<StoredObject, GatewayError> {
        Err(GatewayError::Backend(self.0.to_string()))
    }

    async fn fetch_metadata(&self, _: &str, _: &str) -> Result<serde_json::Value, GatewayError> {
        Err(GatewayError::Backend(self.0.to_string()))
    }

    async fn list_objects(&self, _: &str, _: &str) -> Result<Vec<ObjectSummary>, GatewayError> {
        Err(GatewayError::Backend(self.0.to_string()))
    }

    async fn delete_object(&self, _: &str, _: &str) -> Result<(), GatewayError> {
        Err(GatewayError::Backend(self.0.to_string()))
    }

    async fn file_url(&self, _: &str, _: &str) -> Result<String, GatewayError> {
        Err(GatewayError::Backend(self.0.to_string()))
    }
}

/// テスト用GatewayStateを構築する。戻り値の2つ目はバックエンド呼び出し回数。
pub fn test_state(staging: StagingMode) -> (Arc<GatewayState>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let storage = CountingStorage {
        inner: MemoryStorage::new(),
        calls: calls.clone(),
    };
    let state = Arc::new(GatewayState {
        storage: Box::new(storage),
        bucket_id: TEST_BUCKET.to_string(),
        staging,
    });
    (state, calls)
}

/// 失敗するバックエンドを持つGatewayStateを構築する。
pub fn failing_state(message: &'static str) -> Arc<GatewayState> {
    Arc::new(GatewayState {
        storage: Box::new(FailingStorage(message)),
        bucket_id: TEST_BUCKET.to_string(),
        staging: StagingMode::Memory,
    })
}

pub fn test_router(state: Arc<GatewayState>) -> axum::Router {
    crate::build_router(state, 1024 * 1024)
}

/// マルチパートボディを組み立てる。
/// 各パートは (フィールド名, ファイル名, Content-Type, 内容)。
pub fn multipart_request(
    uri: &str,
    parts: &[(&str, Option<&str>, Option<&str>, &str)],
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, file_name, content_type, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{name}\"");
        if let Some(file_name) = file_name {
            disposition.push_str(&format!("; filename=\"{file_name}\""));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(data.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// ルーターにリクエストを送り、ステータス・ヘッダー・ボディを返す。
pub async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body)
}

/// /api/upload 経由でファイルを登録し、fileIdを返す。
pub async fn upload(router: &axum::Router, file_name: &str, mime_type: &str, data: &str) -> String {
    let request = multipart_request(
        "/api/upload",
        &[("file", Some(file_name), Some(mime_type), data)],
    );
    let (status, _, body) = send(router, request).await;
    assert_eq!(status, StatusCode::CREATED);
    let response: UploadResponse = serde_json::from_slice(&body).unwrap();
    response.file_id
}

/// エラーボディの `error` を取り出す。
pub fn error_message(body: &[u8]) -> String {
    let parsed: filegate_types::ErrorResponse = serde_json::from_slice(body).unwrap();
    parsed.error
}
