//! # Gateway設定・共有状態
//!
//! 環境変数からの設定読み込みとGatewayの共有状態の定義。
//! 設定は起動時に一度だけ構築し、`Arc<GatewayState>` として各ハンドラに渡す。

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

use crate::staging::StagingMode;
#[cfg(feature = "vendor-aws")]
use crate::storage::s3::{S3Settings, S3Storage};
use crate::storage::{AppwriteStorage, MemoryStorage, ObjectStorage};

/// Appwriteの既定エンドポイント。
const DEFAULT_APPWRITE_ENDPOINT: &str = "https://cloud.appwrite.io/v1";
/// メモリバックエンドの既定バケットID。
const DEFAULT_MEMORY_BUCKET: &str = "local";
/// 既定のアップロード上限（50 MiB）。
const DEFAULT_MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

/// ストレージバックエンドの接続設定。
#[derive(Debug, Clone)]
pub enum BackendConfig {
    /// Appwrite Storage
    Appwrite {
        endpoint: String,
        project_id: String,
        api_key: String,
    },
    /// S3互換ストレージ
    S3 {
        endpoint: String,
        access_key: String,
        secret_key: String,
        public_endpoint: Option<String>,
        region: Option<String>,
    },
    /// プロセス内メモリ
    Memory,
}

/// Gateway設定。
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// 待ち受けアドレス
    pub listen_addr: SocketAddr,
    /// 全操作の対象コンテナ（バケット）ID
    pub bucket_id: String,
    /// ストレージバックエンド
    pub backend: BackendConfig,
    /// アップロードのステージング方式
    pub staging: StagingMode,
    /// リクエストボディの上限（バイト）
    pub max_upload_size: usize,
    /// 署名付きURLの有効期限（秒）
    pub file_url_expiry_secs: u32,
}

impl GatewayConfig {
    /// 環境変数から構築する。
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意のキー参照関数から構築する。空文字列は未設定として扱う。
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // 複数の名前を順に探す（旧名との互換用）
        let get = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(*key))
                .find(|v| !v.trim().is_empty())
        };
        let require = |keys: &[&str]| {
            get(keys).with_context(|| format!("{}が設定されていません", keys[0]))
        };

        let host = get(&["BIND_ADDR"]).unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = get(&["PORT"])
            .map(|p| p.parse())
            .transpose()
            .context("PORTは0〜65535の整数である必要があります")?
            .unwrap_or(5000);
        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("待ち受けアドレスが不正です: {host}:{port}"))?;

        let backend_name = get(&["STORAGE_BACKEND"]).unwrap_or_else(|| "appwrite".to_string());
        let backend = match backend_name.to_ascii_lowercase().as_str() {
            "appwrite" => BackendConfig::Appwrite {
                endpoint: get(&["APPWRITE_ENDPOINT", "NEXT_PUBLIC_ENDPOINT"])
                    .unwrap_or_else(|| DEFAULT_APPWRITE_ENDPOINT.to_string()),
                project_id: require(&["APPWRITE_PROJECT_ID", "NEXT_PUBLIC_PROJECT_ID"])?,
                api_key: require(&["APPWRITE_API_KEY", "USER_API_KEY"])?,
            },
            "s3" => BackendConfig::S3 {
                endpoint: get(&["S3_ENDPOINT"])
                    .unwrap_or_else(|| "http://localhost:9000".to_string()),
                access_key: get(&["S3_ACCESS_KEY"]).unwrap_or_else(|| "minioadmin".to_string()),
                secret_key: get(&["S3_SECRET_KEY"]).unwrap_or_else(|| "minioadmin".to_string()),
                public_endpoint: get(&["S3_PUBLIC_ENDPOINT"]),
                region: get(&["S3_REGION"]),
            },
            "memory" => BackendConfig::Memory,
            other => anyhow::bail!("未対応のSTORAGE_BACKENDです: {other}"),
        };

        let bucket_id = match backend {
            BackendConfig::Appwrite { .. } => require(&["BUCKET_ID"])?,
            BackendConfig::S3 { .. } => {
                get(&["BUCKET_ID", "S3_BUCKET"]).unwrap_or_else(|| "filegate-uploads".to_string())
            }
            BackendConfig::Memory => {
                get(&["BUCKET_ID"]).unwrap_or_else(|| DEFAULT_MEMORY_BUCKET.to_string())
            }
        };

        let staging = match get(&["UPLOAD_STAGING"])
            .unwrap_or_else(|| "disk".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "disk" => StagingMode::Disk {
                dir: PathBuf::from(get(&["UPLOAD_DIR"]).unwrap_or_else(|| "uploads".to_string())),
            },
            "memory" => StagingMode::Memory,
            other => anyhow::bail!("未対応のUPLOAD_STAGINGです: {other}"),
        };

        let max_upload_size: usize = get(&["MAX_UPLOAD_SIZE"])
            .map(|v| v.parse())
            .transpose()
            .context("MAX_UPLOAD_SIZEはバイト数である必要があります")?
            .unwrap_or(DEFAULT_MAX_UPLOAD_SIZE);
        let file_url_expiry_secs: u32 = get(&["FILE_URL_EXPIRY_SECS"])
            .map(|v| v.parse())
            .transpose()
            .context("FILE_URL_EXPIRY_SECSは秒数である必要があります")?
            .unwrap_or(3600);

        Ok(Self {
            listen_addr,
            bucket_id,
            backend,
            staging,
            max_upload_size,
            file_url_expiry_secs,
        })
    }
}

/// Gatewayの共有状態。リクエスト間で変更されない。
pub struct GatewayState {
    /// オブジェクトストレージ（トレイトで抽象化）
    pub storage: Box<dyn ObjectStorage>,
    /// 全操作の対象コンテナ（バケット）ID
    pub bucket_id: String,
    /// アップロードのステージング方式
    pub staging: StagingMode,
}

impl GatewayState {
    /// 設定からストレージクライアントを構築する。
    pub fn from_config(config: &GatewayConfig) -> anyhow::Result<Self> {
        let storage: Box<dyn ObjectStorage> = match &config.backend {
            BackendConfig::Appwrite {
                endpoint,
                project_id,
                api_key,
            } => {
                tracing::info!(endpoint = %endpoint, project_id = %project_id, "Appwriteストレージを使用");
                Box::new(AppwriteStorage::new(
                    reqwest::Client::new(),
                    endpoint,
                    project_id.clone(),
                    api_key.clone(),
                )?)
            }
            #[cfg(feature = "vendor-aws")]
            BackendConfig::S3 {
                endpoint,
                access_key,
                secret_key,
                public_endpoint,
                region,
            } => {
                tracing::info!(endpoint = %endpoint, "S3互換ストレージを使用");
                Box::new(S3Storage::new(S3Settings {
                    endpoint: endpoint.clone(),
                    access_key: access_key.clone(),
                    secret_key: secret_key.clone(),
                    public_endpoint: public_endpoint.clone(),
                    region: region.clone(),
                    presign_expiry_secs: config.file_url_expiry_secs,
                })?)
            }
            #[cfg(not(feature = "vendor-aws"))]
            BackendConfig::S3 { .. } => {
                anyhow::bail!("S3バックエンドは vendor-aws フィーチャー無しではビルドされていません")
            }
            BackendConfig::Memory => {
                tracing::warn!("メモリストレージを使用します（開発環境用、再起動で内容は失われます）");
                Box::new(MemoryStorage::new())
            }
        };

        Ok(Self {
            storage,
            bucket_id: config.bucket_id.clone(),
            staging: config.staging.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<GatewayConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GatewayConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_appwrite_defaults() {
        let config = config_from(&[
            ("APPWRITE_PROJECT_ID", "proj"),
            ("APPWRITE_API_KEY", "key"),
            ("BUCKET_ID", "bucket"),
        ])
        .unwrap();

        assert_eq!(
            config.listen_addr,
            "0.0.0.0:5000".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(config.bucket_id, "bucket");
        assert_eq!(
            config.staging,
            StagingMode::Disk {
                dir: PathBuf::from("uploads")
            }
        );
        assert_eq!(config.max_upload_size, DEFAULT_MAX_UPLOAD_SIZE);
        match config.backend {
            BackendConfig::Appwrite {
                endpoint,
                project_id,
                api_key,
            } => {
                assert_eq!(endpoint, DEFAULT_APPWRITE_ENDPOINT);
                assert_eq!(project_id, "proj");
                assert_eq!(api_key, "key");
            }
            other => panic!("unexpected backend: {other:?}"),
        }
    }

    /// 旧来の環境変数名も受け付ける
    #[test]
    fn test_legacy_variable_names() {
        let config = config_from(&[
            ("NEXT_PUBLIC_ENDPOINT", "https://appwrite.example.com/v1"),
            ("NEXT_PUBLIC_PROJECT_ID", "proj"),
            ("USER_API_KEY", "key"),
            ("BUCKET_ID", "bucket"),
            ("PORT", "8080"),
        ])
        .unwrap();

        assert_eq!(config.listen_addr.port(), 8080);
        assert!(matches!(
            config.backend,
            BackendConfig::Appwrite { ref endpoint, .. } if endpoint == "https://appwrite.example.com/v1"
        ));
    }

    #[test]
    fn test_appwrite_requires_credentials_and_bucket() {
        assert!(config_from(&[("APPWRITE_API_KEY", "key"), ("BUCKET_ID", "b")]).is_err());
        assert!(config_from(&[("APPWRITE_PROJECT_ID", "p"), ("BUCKET_ID", "b")]).is_err());
        assert!(config_from(&[("APPWRITE_PROJECT_ID", "p"), ("APPWRITE_API_KEY", "k")]).is_err());
        // 空文字列は未設定扱い
        assert!(config_from(&[
            ("APPWRITE_PROJECT_ID", "p"),
            ("APPWRITE_API_KEY", "k"),
            ("BUCKET_ID", "  "),
        ])
        .is_err());
    }

    #[test]
    fn test_memory_backend_and_staging() {
        let config = config_from(&[
            ("STORAGE_BACKEND", "memory"),
            ("UPLOAD_STAGING", "memory"),
            ("MAX_UPLOAD_SIZE", "1024"),
        ])
        .unwrap();

        assert!(matches!(config.backend, BackendConfig::Memory));
        assert_eq!(config.bucket_id, DEFAULT_MEMORY_BUCKET);
        assert_eq!(config.staging, StagingMode::Memory);
        assert_eq!(config.max_upload_size, 1024);

        let state = GatewayState::from_config(&config).unwrap();
        assert_eq!(state.bucket_id, DEFAULT_MEMORY_BUCKET);
    }

    #[test]
    fn test_s3_backend() {
        let config = config_from(&[
            ("STORAGE_BACKEND", "S3"),
            ("S3_BUCKET", "uploads"),
            ("S3_REGION", "ap-northeast-1"),
        ])
        .unwrap();
        assert_eq!(config.bucket_id, "uploads");
        assert!(matches!(
            config.backend,
            BackendConfig::S3 { ref region, .. } if region.as_deref() == Some("ap-northeast-1")
        ));
    }

    #[test]
    fn test_invalid_values() {
        assert!(config_from(&[("STORAGE_BACKEND", "ftp")]).is_err());
        assert!(config_from(&[("STORAGE_BACKEND", "memory"), ("UPLOAD_STAGING", "tape")]).is_err());
        assert!(config_from(&[("STORAGE_BACKEND", "memory"), ("PORT", "http")]).is_err());
        assert!(config_from(&[("STORAGE_BACKEND", "memory"), ("MAX_UPLOAD_SIZE", "-1")]).is_err());
    }
}
