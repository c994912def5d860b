//! # インメモリ オブジェクトストレージ
//!
//! 外部サービスなしでGatewayを動かすための実装。
//! `STORAGE_BACKEND=memory` で選択する。プロセス終了で内容は失われる。

use std::collections::HashMap;

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::RwLock;

use super::{resolve_file_id, NewObject, ObjectStorage, ObjectSummary, StoredObject};
use crate::error::GatewayError;

/// 保存済みオブジェクト。
struct MemoryObject {
    id: String,
    name: String,
    mime_type: String,
    bytes: Bytes,
    created_at: DateTime<Utc>,
}

impl MemoryObject {
    fn metadata(&self, bucket_id: &str) -> serde_json::Value {
        serde_json::json!({
            "$id": self.id,
            "bucketId": bucket_id,
            "name": self.name,
            "mimeType": self.mime_type,
            "sizeOriginal": self.bytes.len(),
            "$createdAt": self.created_at.to_rfc3339_opts(SecondsFormat::Millis, false),
        })
    }
}

/// プロセス内メモリに保持するオブジェクトストレージ。
/// バケットごとに挿入順を保持する（名前検索の「先頭一致」を決定的にするため）。
#[derive(Default)]
pub struct MemoryStorage {
    buckets: RwLock<HashMap<String, Vec<MemoryObject>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(bucket_id: &str, file_id: &str) -> GatewayError {
    GatewayError::NotFound(format!(
        "File with the requested ID could not be found: {bucket_id}/{file_id}"
    ))
}

#[async_trait::async_trait]
impl ObjectStorage for MemoryStorage {
    async fn create_object(
        &self,
        bucket_id: &str,
        file_id: &str,
        object: NewObject,
    ) -> Result<String, GatewayError> {
        let id = resolve_file_id(file_id);
        let created_at = Utc::now();

        let mut buckets = self.buckets.write().await;
        let objects = buckets.entry(bucket_id.to_string()).or_default();
        if objects.iter().any(|o| o.id == id) {
            return Err(GatewayError::Backend(format!(
                "A file with the same ID already exists: {id}"
            )));
        }
        objects.push(MemoryObject {
            id: id.clone(),
            name: object.file_name,
            mime_type: object.mime_type,
            bytes: object.bytes,
            created_at,
        });
        Ok(id)
    }

    async fn fetch_bytes(
        &self,
        bucket_id: &str,
        file_id: &str,
    ) -> Result<StoredObject, GatewayError> {
        let buckets = self.buckets.read().await;
        buckets
            .get(bucket_id)
            .and_then(|objects| objects.iter().find(|o| o.id == file_id))
            .map(|o| StoredObject {
                bytes: o.bytes.clone(),
                content_type: Some(o.mime_type.clone()),
            })
            .ok_or_else(|| not_found(bucket_id, file_id))
    }

    async fn fetch_metadata(
        &self,
        bucket_id: &str,
        file_id: &str,
    ) -> Result<serde_json::Value, GatewayError> {
        let buckets = self.buckets.read().await;
        buckets
            .get(bucket_id)
            .and_then(|objects| objects.iter().find(|o| o.id == file_id))
            .map(|o| o.metadata(bucket_id))
            .ok_or_else(|| not_found(bucket_id, file_id))
    }

    async fn list_objects(
        &self,
        bucket_id: &str,
        name: &str,
    ) -> Result<Vec<ObjectSummary>, GatewayError> {
        let buckets = self.buckets.read().await;
        Ok(buckets
            .get(bucket_id)
            .map(|objects| {
                objects
                    .iter()
                    .filter(|o| o.name == name)
                    .map(|o| ObjectSummary {
                        id: o.id.clone(),
                        name: o.name.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_object(&self, bucket_id: &str, file_id: &str) -> Result<(), GatewayError> {
        let mut buckets = self.buckets.write().await;
        let objects = buckets
            .get_mut(bucket_id)
            .ok_or_else(|| not_found(bucket_id, file_id))?;
        let index = objects
            .iter()
            .position(|o| o.id == file_id)
            .ok_or_else(|| not_found(bucket_id, file_id))?;
        objects.remove(index);
        Ok(())
    }

    async fn file_url(&self, bucket_id: &str, file_id: &str) -> Result<String, GatewayError> {
        let buckets = self.buckets.read().await;
        let exists = buckets
            .get(bucket_id)
            .is_some_and(|objects| objects.iter().any(|o| o.id == file_id));
        if !exists {
            return Err(not_found(bucket_id, file_id));
        }
        Ok(format!("memory://{bucket_id}/{file_id}"))
    }
}
