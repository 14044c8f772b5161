//! 请求构造与响应解析的纯函数，不涉及网络 I/O。

use serde::Deserialize;

use crate::error::AppError;

/// `POST {base}/upload` 成功时的响应体。
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub id: String,
    pub url: String,
    #[serde(rename = "deleteUrl")]
    pub delete_url: String,
}

/// 按扩展名选择 multipart 的 Content-Type，识别不了的一律按 JPEG。
pub fn content_type_for(filename: &str) -> &'static str {
    let extension = std::path::Path::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// 拼出上传地址 `{base}/upload`。
pub fn upload_endpoint(base: &str) -> Result<reqwest::Url, AppError> {
    let trimmed = base.trim().trim_end_matches('/');
    let endpoint = format!("{}/upload", trimmed);
    let url = reqwest::Url::parse(&endpoint)
        .map_err(|e| AppError::InvalidUrl(format!("{}: {}", endpoint, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AppError::InvalidUrl(format!("不支持的协议 {}：{}", other, endpoint))),
    }
}

/// 解析上传响应；JSON 非法、字段缺失或为空串均视为无效响应。
pub fn parse_upload_response(body: &[u8]) -> Result<UploadResponse, AppError> {
    let response: UploadResponse = serde_json::from_slice(body)
        .map_err(|e| AppError::InvalidResponse(format!("无法解析响应：{}", e)))?;

    for (field, value) in [
        ("id", &response.id),
        ("url", &response.url),
        ("deleteUrl", &response.delete_url),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::InvalidResponse(format!("字段 {} 为空", field)));
        }
    }

    Ok(response)
}

/// 失败响应体作为附加说明，空白时省略。
pub fn body_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// 网络层错误统一映射为 `Network`，消息中不带 URL。
pub fn map_reqwest_error(error: reqwest::Error) -> AppError {
    if error.is_timeout() {
        AppError::Network(format!("请求超时：{}", error.without_url()))
    } else if error.is_connect() {
        AppError::Network(format!("无法连接：{}", error.without_url()))
    } else {
        AppError::Network(format!("请求失败：{}", error.without_url()))
    }
}

/// 日志里只保留协议、主机、端口与路径。
pub fn redact_url_for_log(url: &str) -> String {
    let Ok(parsed) = reqwest::Url::parse(url) else {
        return "<invalid-url>".to_string();
    };

    let host = parsed.host_str().unwrap_or("<unknown-host>");
    let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();

    format!("{}://{}{}{}", parsed.scheme(), host, port, parsed.path())
}

/// 缩放重编码后的文件名：保留主名，扩展名换成 `.jpg`。
pub fn jpeg_filename(filename: &str) -> String {
    let stem = std::path::Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "image".to_string());
    format!("{}.jpg", stem)
}
