//! # S3互換 オブジェクトストレージ実装
//!
//! AWS S3, MinIO, Cloudflare R2 等のS3互換APIを使用する実装。
//!
//! オブジェクトキーは `{file_id}/{file_name}`。ID検索は `{file_id}/` プレフィックスの
//! 一覧、名前検索はバケット全体の一覧をキー末尾で絞り込む。

use bytes::Bytes;

use super::{resolve_file_id, NewObject, ObjectStorage, ObjectSummary, StoredObject};
use crate::error::GatewayError;

/// S3互換ストレージの接続設定。
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    /// クライアント向けエンドポイント（署名付きURL生成用）
    pub public_endpoint: Option<String>,
    /// 明示的なリージョン。Noneの場合はエンドポイントから推定する。
    pub region: Option<String>,
    /// 署名付きURLの有効期限（秒）
    pub presign_expiry_secs: u32,
}

/// S3互換ストレージによるオブジェクトストレージ実装。
pub struct S3Storage {
    /// 内部通信用の接続設定
    settings: S3Settings,
    /// 認証情報（バケットごとにBucketを構築する際に使用）
    credentials: s3::creds::Credentials,
}

/// AWS S3エンドポイント（s3.REGION.amazonaws.com）からリージョンを推定する。
/// 非AWSエンドポイントではus-east-1を返す。
fn detect_region(endpoint: &str) -> String {
    endpoint
        .find("s3.")
        .and_then(|start| {
            let rest = &endpoint[start + 3..];
            rest.find(".amazonaws.com").map(|end| rest[..end].to_string())
        })
        .unwrap_or_else(|| "us-east-1".to_string())
}

/// オブジェクトキー `{file_id}/{file_name}` を組み立てる。
fn object_key(file_id: &str, file_name: &str) -> String {
    format!("{file_id}/{file_name}")
}

/// キー `{file_id}/{file_name}` を分解する。
fn split_key(key: &str) -> Option<(&str, &str)> {
    key.split_once('/')
}

/// 一覧からIDが一致する最初のオブジェクトを選ぶ。
fn first_with_id<T>(
    objects: impl IntoIterator<Item = T>,
    file_id: &str,
    key_of: impl Fn(&T) -> &str,
) -> Result<T, GatewayError> {
    objects
        .into_iter()
        .find(|o| split_key(key_of(o)).is_some_and(|(id, _)| id == file_id))
        .ok_or_else(|| {
            GatewayError::NotFound(format!(
                "File with the requested ID could not be found: {file_id}"
            ))
        })
}

/// 一覧のキーのうち、ファイル名部分が `name` と一致するものを返す。
fn summaries_named<'a>(keys: impl IntoIterator<Item = &'a str>, name: &str) -> Vec<ObjectSummary> {
    keys.into_iter()
        .filter_map(|key| {
            let (id, file_name) = split_key(key)?;
            (file_name == name).then(|| ObjectSummary {
                id: id.to_string(),
                name: file_name.to_string(),
            })
        })
        .collect()
}

fn s3_error(context: &str, e: s3::error::S3Error) -> GatewayError {
    GatewayError::Backend(format!("{context}: {e}"))
}

fn check_status(context: &str, status: u16) -> Result<(), GatewayError> {
    match status {
        200..=299 => Ok(()),
        404 => Err(GatewayError::NotFound(format!("{context}: HTTP 404"))),
        _ => Err(GatewayError::Backend(format!("{context}: HTTP {status}"))),
    }
}

impl S3Storage {
    pub fn new(settings: S3Settings) -> anyhow::Result<Self> {
        let credentials = s3::creds::Credentials::new(
            Some(settings.access_key.as_str()),
            Some(settings.secret_key.as_str()),
            None,
            None,
            None,
        )?;
        if let Some(public_ep) = &settings.public_endpoint {
            tracing::info!(
                s3_public_endpoint = %public_ep,
                "クライアント向けS3エンドポイントを設定"
            );
        }
        Ok(Self {
            settings,
            credentials,
        })
    }

    fn init_bucket(&self, endpoint: &str, bucket_name: &str) -> Result<s3::Bucket, GatewayError> {
        let region = s3::Region::Custom {
            region: self
                .settings
                .region
                .clone()
                .unwrap_or_else(|| detect_region(endpoint)),
            endpoint: endpoint.to_string(),
        };

        let bucket = s3::Bucket::new(bucket_name, region, self.credentials.clone())
            .map_err(|e| s3_error("バケットの初期化に失敗", e))?
            .with_path_style();

        Ok(*bucket)
    }

    fn bucket(&self, bucket_name: &str) -> Result<s3::Bucket, GatewayError> {
        self.init_bucket(&self.settings.endpoint, bucket_name)
    }

    /// 署名付きURL用のバケット。公開エンドポイント未設定時は内部エンドポイントを使う。
    fn public_bucket(&self, bucket_name: &str) -> Result<s3::Bucket, GatewayError> {
        match &self.settings.public_endpoint {
            Some(public_ep) => self.init_bucket(public_ep, bucket_name),
            None => self.bucket(bucket_name),
        }
    }

    /// IDに対応するオブジェクトを探す。
    async fn find_object(
        &self,
        bucket: &s3::Bucket,
        file_id: &str,
    ) -> Result<s3::serde_types::Object, GatewayError> {
        let results = bucket
            .list(format!("{file_id}/"), None)
            .await
            .map_err(|e| s3_error("オブジェクト一覧の取得に失敗", e))?;

        first_with_id(
            results.into_iter().flat_map(|r| r.contents),
            file_id,
            |o| o.key.as_str(),
        )
    }
}

#[async_trait::async_trait]
impl ObjectStorage for S3Storage {
    async fn create_object(
        &self,
        bucket_id: &str,
        file_id: &str,
        object: NewObject,
    ) -> Result<String, GatewayError> {
        let bucket = self.bucket(bucket_id)?;
        let id = resolve_file_id(file_id);
        let key = object_key(&id, &object.file_name);

        let response = bucket
            .put_object_with_content_type(&key, &object.bytes, &object.mime_type)
            .await
            .map_err(|e| s3_error("オブジェクトの作成に失敗", e))?;
        check_status("オブジェクトの作成に失敗", response.status_code())?;

        Ok(id)
    }

    async fn fetch_bytes(
        &self,
        bucket_id: &str,
        file_id: &str,
    ) -> Result<StoredObject, GatewayError> {
        let bucket = self.bucket(bucket_id)?;
        let key = self.find_object(&bucket, file_id).await?.key;

        let response = bucket
            .get_object(&key)
            .await
            .map_err(|e| s3_error("オブジェクトの取得に失敗", e))?;
        check_status("オブジェクトの取得に失敗", response.status_code())?;

        let content_type = response.headers().get("content-type").cloned();
        Ok(StoredObject {
            bytes: Bytes::from(response.bytes().to_vec()),
            content_type,
        })
    }

    async fn fetch_metadata(
        &self,
        bucket_id: &str,
        file_id: &str,
    ) -> Result<serde_json::Value, GatewayError> {
        let bucket = self.bucket(bucket_id)?;
        let object = self.find_object(&bucket, file_id).await?;

        let (head, status) = bucket
            .head_object(&object.key)
            .await
            .map_err(|e| s3_error("メタデータの取得に失敗", e))?;
        check_status("メタデータの取得に失敗", status)?;

        let name = split_key(&object.key).map(|(_, name)| name).unwrap_or_default();
        Ok(serde_json::json!({
            "$id": file_id,
            "bucketId": bucket_id,
            "name": name,
            "mimeType": head.content_type,
            "sizeOriginal": object.size,
            "$updatedAt": object.last_modified,
            "etag": object.e_tag,
        }))
    }

    async fn list_objects(
        &self,
        bucket_id: &str,
        name: &str,
    ) -> Result<Vec<ObjectSummary>, GatewayError> {
        let bucket = self.bucket(bucket_id)?;
        let results = bucket
            .list(String::new(), None)
            .await
            .map_err(|e| s3_error("オブジェクト一覧の取得に失敗", e))?;

        Ok(summaries_named(
            results
                .iter()
                .flat_map(|r| r.contents.iter())
                .map(|o| o.key.as_str()),
            name,
        ))
    }

    async fn delete_object(&self, bucket_id: &str, file_id: &str) -> Result<(), GatewayError> {
        let bucket = self.bucket(bucket_id)?;
        let key = self.find_object(&bucket, file_id).await?.key;

        let response = bucket
            .delete_object(&key)
            .await
            .map_err(|e| s3_error("オブジェクトの削除に失敗", e))?;
        check_status("オブジェクトの削除に失敗", response.status_code())
    }

    /// 署名付きダウンロードURL（GET）を生成する。
    async fn file_url(&self, bucket_id: &str, file_id: &str) -> Result<String, GatewayError> {
        let key = self.find_object(&self.bucket(bucket_id)?, file_id).await?.key;
        self.public_bucket(bucket_id)?
            .presign_get(&key, self.settings.presign_expiry_secs, None)
            .await
            .map_err(|e| s3_error("署名付きダウンロードURL生成失敗", e))
    }
}
