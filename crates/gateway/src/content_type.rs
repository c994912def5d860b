//! # ファイル名からのContent-Type推定
//!
//! 名前でファイルを取得する場合、バックエンドの報告値ではなく
//! 拡張子からMIMEタイプを決める。対応表にない拡張子は汎用バイナリ扱い。

/// 既定のMIMEタイプ。
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// ファイル名の最後の拡張子（大文字小文字を区別しない）からMIMEタイプを返す。
///
/// `.` を含まない名前は拡張子なしとして既定値を返す。名前全体を拡張子とは
/// みなさないため、`json` という名前は `application/json` にならない。
pub fn content_type_for(file_name: &str) -> &'static str {
    let Some((_, extension)) = file_name.rsplit_once('.') else {
        return DEFAULT_CONTENT_TYPE;
    };

    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "html" => "text/html",
        "json" => "application/json",
        _ => DEFAULT_CONTENT_TYPE,
    }
}
