//! # Gatewayエンドポイント
//!
//! 各ハンドラはストレージバックエンドへの呼び出しを行い、結果をそのまま整形して返す。
//! ハンドラ間の呼び出しやリクエスト間の状態保持はない。

pub mod delete;
pub mod file;
pub mod file_by_name;
pub mod file_url;
pub mod metadata;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use delete::handle_delete_file;
pub use file::handle_get_file;
pub use file_by_name::handle_get_file_by_name;
pub use file_url::handle_get_file_url;
pub use metadata::handle_get_metadata;
pub use upload::handle_upload;
