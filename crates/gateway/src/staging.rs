//! # アップロードのローカルステージング
//!
//! マルチパートの `file` パートを、バックエンドへ渡す前に一時的に保持する。
//!
//! - `Disk` — `UPLOAD_DIR` 内の一時ファイルへストリーム書き込み
//! - `Memory` — メモリ上のバッファ
//!
//! 一時ファイルは [`StagedFile`] のスコープ終了時に必ず削除される。
//! 削除に失敗してもレスポンスには影響させず、ログにのみ残す。

use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use axum::extract::Multipart;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;

use crate::content_type::DEFAULT_CONTENT_TYPE;
use crate::error::GatewayError;

/// ファイルを受け取るマルチパートのフィールド名。
pub const FILE_FIELD: &str = "file";

/// メモリステージング時、ファイル名が無いパートに付ける名前。
const FALLBACK_FILE_NAME: &str = "upload";

/// ステージング方式。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagingMode {
    /// 指定ディレクトリ内の一時ファイル
    Disk { dir: PathBuf },
    /// メモリ上のバッファ
    Memory,
}

/// ディスク上の一時ファイル。ドロップ時に削除する。
pub struct StagedFile {
    file: Option<tempfile::NamedTempFile>,
}

impl StagedFile {
    fn new(file: tempfile::NamedTempFile) -> Self {
        Self { file: Some(file) }
    }

    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(|f| f.path())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        let Some(file) = self.file.take() else {
            return;
        };
        let path = file.path().to_path_buf();
        match file.close() {
            Ok(()) => tracing::debug!(path = %path.display(), "一時ファイルを削除"),
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "一時ファイルの削除に失敗"
            ),
        }
    }
}

enum StagedContent {
    Memory(Bytes),
    Disk(StagedFile),
}

/// 受信したファイル。リクエストの処理中のみ有効。
pub struct IncomingFile {
    /// 元のファイル名
    pub file_name: String,
    /// 申告されたMIMEタイプ
    pub mime_type: String,
    content: StagedContent,
}

impl IncomingFile {
    /// 全内容をメモリに読み込む。
    pub async fn read_bytes(&self) -> Result<Bytes, GatewayError> {
        match &self.content {
            StagedContent::Memory(bytes) => Ok(bytes.clone()),
            StagedContent::Disk(staged) => {
                let path = staged
                    .path()
                    .ok_or_else(|| GatewayError::Internal("一時ファイルが解放済み".to_string()))?;
                let bytes = tokio::fs::read(path).await.map_err(|e| {
                    GatewayError::Internal(format!("一時ファイルの読み込みに失敗: {e}"))
                })?;
                Ok(Bytes::from(bytes))
            }
        }
    }

    /// ディスクステージング時の一時ファイルパス。
    pub fn staged_path(&self) -> Option<&Path> {
        match &self.content {
            StagedContent::Memory(_) => None,
            StagedContent::Disk(staged) => staged.path(),
        }
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> GatewayError {
    let message = format!("マルチパートの読み取りに失敗: {}", e.body_text());
    if e.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
        GatewayError::PayloadTooLarge(message)
    } else {
        GatewayError::Validation(message)
    }
}

/// マルチパートから `file` パートを探してステージングする。
/// `file` パートが無ければ `Ok(None)`。他のフィールドは読み捨てる。
pub async fn stage_file_part(
    multipart: &mut Multipart,
    mode: &StagingMode,
) -> Result<Option<IncomingFile>, GatewayError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let mime_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let incoming = match mode {
            StagingMode::Memory => {
                let bytes = field.bytes().await.map_err(multipart_error)?;
                IncomingFile {
                    file_name: file_name.unwrap_or_else(|| FALLBACK_FILE_NAME.to_string()),
                    mime_type,
                    content: StagedContent::Memory(bytes),
                }
            }
            StagingMode::Disk { dir } => {
                let staged = write_to_disk(field, dir).await?;
                let file_name = file_name.unwrap_or_else(|| {
                    staged
                        .path()
                        .and_then(|p| p.file_name())
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
                });
                IncomingFile {
                    file_name,
                    mime_type,
                    content: StagedContent::Disk(staged),
                }
            }
        };

        tracing::debug!(
            file_name = %incoming.file_name,
            mime_type = %incoming.mime_type,
            staged_path = ?incoming.staged_path(),
            "アップロードをステージング"
        );
        return Ok(Some(incoming));
    }

    Ok(None)
}

/// パートを一時ファイルへストリーム書き込みする。
/// 途中で失敗した場合も `StagedFile` のドロップで一時ファイルは削除される。
async fn write_to_disk(mut field: Field<'_>, dir: &Path) -> Result<StagedFile, GatewayError> {
    let temp = tempfile::Builder::new()
        .prefix("upload-")
        .tempfile_in(dir)
        .map_err(|e| GatewayError::Internal(format!("一時ファイルの作成に失敗: {e}")))?;
    let std_file = temp
        .as_file()
        .try_clone()
        .map_err(|e| GatewayError::Internal(format!("一時ファイルのオープンに失敗: {e}")))?;
    let staged = StagedFile::new(temp);

    let mut out = tokio::fs::File::from_std(std_file);
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        out.write_all(&chunk)
            .await
            .map_err(|e| GatewayError::Internal(format!("一時ファイルへの書き込みに失敗: {e}")))?;
    }
    out.flush()
        .await
        .map_err(|e| GatewayError::Internal(format!("一時ファイルへの書き込みに失敗: {e}")))?;

    Ok(staged)
}
