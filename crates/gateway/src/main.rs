//! # Filegate Gateway
//!
//! クラウドオブジェクトストレージへのファイル操作を中継するHTTPゲートウェイ。
//!
//! ## 役割
//! - アップロードのローカルステージング（一時ファイル / メモリ）
//! - ストレージバックエンドへの委譲（作成・取得・メタデータ・一覧・削除）
//! - 名前検索時のContent-Type推定
//!
//! ## API エンドポイント
//! - `POST /api/upload` — ファイルアップロード
//! - `GET /api/file/{fileId}` — IDでファイル取得
//! - `GET /api/file/byname/{fileName}` — 名前でファイル取得
//! - `GET /api/file/metadata/{fileId}` — メタデータ取得
//! - `GET /api/file/url/{fileId}` — 閲覧URL発行
//! - `DELETE /api/file/{fileId}` — ファイル削除

mod config;
mod content_type;
mod endpoints;
mod error;
mod staging;
mod storage;

use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::{GatewayConfig, GatewayState};
use crate::endpoints::*;
use crate::staging::StagingMode;

// ---------------------------------------------------------------------------
// ルーター
// ---------------------------------------------------------------------------

/// Gatewayのルーターを構築する。全ルートは `/api` 配下。
pub(crate) fn build_router(state: Arc<GatewayState>, max_upload_size: usize) -> axum::Router {
    let api = axum::Router::new()
        .route("/upload", post(handle_upload))
        .route(
            "/file/{file_id}",
            get(handle_get_file).delete(handle_delete_file),
        )
        .route("/file/byname/{file_name}", get(handle_get_file_by_name))
        .route("/file/metadata/{file_id}", get(handle_get_metadata))
        .route("/file/url/{file_id}", get(handle_get_file_url));

    axum::Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(max_upload_size))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// エントリポイント
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = GatewayConfig::from_env()?;

    if let StagingMode::Disk { dir } = &config.staging {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("アップロードディレクトリの作成に失敗: {}", dir.display()))?;
        tracing::info!(upload_dir = %dir.display(), "ディスクステージングを使用");
    }

    let state = Arc::new(GatewayState::from_config(&config)?);
    tracing::info!(bucket_id = %state.bucket_id, "対象バケット");

    let app = build_router(state, config.max_upload_size);

    tracing::info!("Gatewayを {} で起動します", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Ctrl+C を待つ。
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("シグナルハンドラの登録に失敗: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("シャットダウンします");
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------
