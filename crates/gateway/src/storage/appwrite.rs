//! # Appwrite Storage 実装
//!
//! Appwrite Storage REST API (`/storage/buckets/{bucketId}/files`) を
//! reqwest で直接呼び出すオブジェクトストレージ実装。
//! 認証は `X-Appwrite-Project` / `X-Appwrite-Key` ヘッダーで行う。

use bytes::Bytes;
use reqwest::{Method, StatusCode, Url};

use super::{NewObject, ObjectStorage, ObjectSummary, StoredObject};
use crate::error::GatewayError;

/// Appwriteのエラーレスポンス。
#[derive(Debug, serde::Deserialize)]
struct AppwriteErrorBody {
    message: String,
}

/// `GET /files` のレスポンス。
#[derive(Debug, serde::Deserialize)]
struct FileListBody {
    files: Vec<serde_json::Value>,
}

/// Appwrite Storageによるオブジェクトストレージ実装。
pub struct AppwriteStorage {
    /// HTTPクライアント
    http_client: reqwest::Client,
    /// APIエンドポイント（例: `https://cloud.appwrite.io/v1`）
    endpoint: Url,
    /// プロジェクトID
    project_id: String,
    /// サーバーAPIキー
    api_key: String,
}

impl AppwriteStorage {
    pub fn new(
        http_client: reqwest::Client,
        endpoint: &str,
        project_id: String,
        api_key: String,
    ) -> anyhow::Result<Self> {
        let endpoint = Url::parse(endpoint)?;
        if endpoint.cannot_be_a_base() {
            anyhow::bail!("Appwriteエンドポイントが不正です: {endpoint}");
        }
        Ok(Self {
            http_client,
            endpoint,
            project_id,
            api_key,
        })
    }

    /// `{endpoint}/storage/buckets/{bucket_id}/files/{extra...}` を組み立てる。
    /// パスセグメントはパーセントエンコードされる。
    fn files_url(&self, bucket_id: &str, extra: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::Internal("エンドポイントURLの組み立てに失敗".to_string()))?
            .pop_if_empty()
            .extend(["storage", "buckets", bucket_id, "files"])
            .extend(extra);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, url)
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Key", &self.api_key)
    }

    /// リクエストを送信し、非2xxレスポンスをGatewayErrorに変換する。
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, GatewayError> {
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Backend(format!("Appwriteへの送信に失敗: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<AppwriteErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or_else(|_| format!("Appwriteがエラーを返しました: HTTP {status} - {body}"));

        tracing::debug!(%status, message = %message, "Appwriteエラーレスポンス");

        if status == StatusCode::NOT_FOUND {
            Err(GatewayError::NotFound(message))
        } else {
            Err(GatewayError::Backend(message))
        }
    }

    async fn json(response: reqwest::Response) -> Result<serde_json::Value, GatewayError> {
        response
            .json()
            .await
            .map_err(|e| GatewayError::Backend(format!("Appwriteレスポンスのパースに失敗: {e}")))
    }
}

#[async_trait::async_trait]
impl ObjectStorage for AppwriteStorage {
    async fn create_object(
        &self,
        bucket_id: &str,
        file_id: &str,
        object: NewObject,
    ) -> Result<String, GatewayError> {
        let part = reqwest::multipart::Part::bytes(object.bytes.to_vec())
            .file_name(object.file_name)
            .mime_str(&object.mime_type)
            .map_err(|e| GatewayError::Validation(format!("不正なContent-Type: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .text("fileId", file_id.to_string())
            .part("file", part);

        let url = self.files_url(bucket_id, &[])?;
        let response = self.send(self.request(Method::POST, url).multipart(form)).await?;
        let record = Self::json(response).await?;

        record
            .get("$id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| GatewayError::Backend("Appwriteレスポンスに$idがありません".to_string()))
    }

    async fn fetch_bytes(
        &self,
        bucket_id: &str,
        file_id: &str,
    ) -> Result<StoredObject, GatewayError> {
        let url = self.files_url(bucket_id, &[file_id, "view"])?;
        let response = self.send(self.request(Method::GET, url)).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes: Bytes = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Backend(format!("ファイル本体の読み取りに失敗: {e}")))?;

        Ok(StoredObject {
            bytes,
            content_type,
        })
    }

    async fn fetch_metadata(
        &self,
        bucket_id: &str,
        file_id: &str,
    ) -> Result<serde_json::Value, GatewayError> {
        let url = self.files_url(bucket_id, &[file_id])?;
        let response = self.send(self.request(Method::GET, url)).await?;
        Self::json(response).await
    }

    async fn list_objects(
        &self,
        bucket_id: &str,
        name: &str,
    ) -> Result<Vec<ObjectSummary>, GatewayError> {
        let query = serde_json::json!({
            "method": "equal",
            "attribute": "name",
            "values": [name],
        })
        .to_string();

        let url = self.files_url(bucket_id, &[])?;
        let response = self
            .send(self.request(Method::GET, url).query(&[("queries[]", query)]))
            .await?;
        let list: FileListBody = response
            .json()
            .await
            .map_err(|e| GatewayError::Backend(format!("ファイル一覧のパースに失敗: {e}")))?;

        Ok(list
            .files
            .iter()
            .filter_map(|file| {
                Some(ObjectSummary {
                    id: file.get("$id")?.as_str()?.to_string(),
                    name: file.get("name")?.as_str()?.to_string(),
                })
            })
            .collect())
    }

    async fn delete_object(&self, bucket_id: &str, file_id: &str) -> Result<(), GatewayError> {
        let url = self.files_url(bucket_id, &[file_id])?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    /// Appwriteの閲覧URLはプロジェクトIDをクエリに含む公開URL。バックエンド呼び出しは行わない。
    async fn file_url(&self, bucket_id: &str, file_id: &str) -> Result<String, GatewayError> {
        let mut url = self.files_url(bucket_id, &[file_id, "view"])?;
        url.query_pairs_mut().append_pair("project", &self.project_id);
        Ok(url.to_string())
    }
}
