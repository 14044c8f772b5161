//! # 分享交接加载模块
//!
//! ## 设计思路
//!
//! 分享交接可能给出本地文件路径，也可能直接给出 Base64 / Data URL。
//! 本模块把这些来源统一转换为 [`SharedImage`]，并在缺少文件名时根据文件签名推断扩展名。
//!
//! ## 实现思路
//!
//! - 文件：存在性 + 非空检查 + 读取；文件名取路径最后一段。
//! - Base64：支持 `data:image/...;base64,` 前缀与纯 Base64，先估算体积再解码。
//! - 文件名推断：`infer` 识别 magic bytes，识别不了时回退 `image.jpg`。
//! - 不在这里拒绝非图片内容：服务端才是最终裁决者。

use base64::{Engine as _, engine::general_purpose};
use std::path::Path;

use super::{ImageError, SharedImage};

const FALLBACK_STEM: &str = "image";

impl SharedImage {
    /// 从本地路径加载分享文件。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let path = path.as_ref();
        log::info!("📁 开始读取分享文件 - 路径: {}", path.display());

        if !path.exists() {
            return Err(ImageError::FileSystem(format!("文件不存在：{}", path.display())));
        }

        let bytes = std::fs::read(path)
            .map_err(|e| ImageError::FileSystem(format!("无法读取文件：{}", e)))?;

        if bytes.is_empty() {
            return Err(ImageError::InvalidFormat("图片内容为空".to_string()));
        }

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| suggest_filename(&bytes));

        log::debug!("✅ 分享文件读取完成 - {} bytes, 文件名: {}", bytes.len(), filename);

        Ok(Self::new(bytes, filename))
    }

    /// 从 Base64（Data URL 或纯 Base64）加载；`filename` 为空时按签名推断。
    pub fn from_base64(
        data: &str,
        filename: Option<&str>,
        max_bytes: u64,
    ) -> Result<Self, ImageError> {
        log::info!("📝 开始处理 base64 分享数据");

        let bytes = parse_base64_with_limit(data, max_bytes)?;
        if bytes.is_empty() {
            return Err(ImageError::InvalidFormat("图片内容为空".to_string()));
        }

        let filename = filename
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| suggest_filename(&bytes));

        Ok(Self::new(bytes, filename))
    }
}

/// 根据文件签名推断文件名，如 `image.png`；识别失败时为 `image.jpg`。
pub fn suggest_filename(bytes: &[u8]) -> String {
    let extension = infer::get(bytes)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .map(|kind| kind.extension())
        .unwrap_or("jpg");
    format!("{}.{}", FALLBACK_STEM, extension)
}

fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, ImageError> {
    let len = base64_data.trim().len() as u64;
    let groups = len
        .checked_add(3)
        .ok_or_else(|| ImageError::ResourceLimit("Base64 输入长度溢出".to_string()))?
        / 4;

    groups
        .checked_mul(3)
        .ok_or_else(|| ImageError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
}

fn parse_base64_with_limit(data: &str, max_bytes: u64) -> Result<Vec<u8>, ImageError> {
    let normalized = data.trim();

    let payload = if normalized.starts_with("data:") {
        let base64_start = normalized
            .find(";base64,")
            .ok_or_else(|| ImageError::InvalidFormat("缺少 base64 标记".to_string()))?;
        &normalized[base64_start + 8..]
    } else {
        normalized
    };

    let estimated_len = estimate_base64_decoded_upper_bound_len(payload)?;
    if estimated_len > max_bytes {
        return Err(ImageError::ResourceLimit(format!(
            "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
            estimated_len as f64 / 1024.0 / 1024.0,
            max_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| ImageError::Decode(format!("Base64 解码失败：{}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: [u8; 12] = [137, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13];

    #[test]
    fn suggest_filename_from_signature() {
        assert_eq!(suggest_filename(&PNG_SIGNATURE), "image.png");
        assert_eq!(suggest_filename(b"GIF89a......"), "image.gif");
        assert_eq!(suggest_filename(b"plain text"), "image.jpg");
    }

    #[test]
    fn from_base64_accepts_data_url_and_infers_name() {
        let encoded = general_purpose::STANDARD.encode(PNG_SIGNATURE);
        let data_url = format!("data:image/png;base64,{}", encoded);

        let shared = SharedImage::from_base64(&data_url, None, 1024).expect("parse data url");
        assert_eq!(shared.filename, "image.png");
        assert_eq!(&shared.bytes[..], &PNG_SIGNATURE[..]);

        let named =
            SharedImage::from_base64(&encoded, Some("shot.png"), 1024).expect("parse plain");
        assert_eq!(named.filename, "shot.png");
    }

    #[test]
    fn from_base64_rejects_large_payload_before_decode() {
        let huge = "A".repeat(1024 * 1024);
        let result = SharedImage::from_base64(&huge, None, 32);
        assert!(matches!(result, Err(ImageError::ResourceLimit(_))));
    }

    #[test]
    fn from_file_uses_path_name() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("holiday.webp");
        std::fs::write(&path, PNG_SIGNATURE).expect("write file");

        let shared = SharedImage::from_file(&path).expect("load file");
        assert_eq!(shared.filename, "holiday.webp");
        assert_eq!(shared.len(), PNG_SIGNATURE.len());
    }

    #[test]
    fn from_file_rejects_missing_and_empty() {
        let dir = tempfile::tempdir().expect("create temp dir");
        assert!(matches!(
            SharedImage::from_file(dir.path().join("missing.png")),
            Err(ImageError::FileSystem(_))
        ));

        let empty = dir.path().join("empty.png");
        std::fs::write(&empty, b"").expect("write empty");
        assert!(matches!(SharedImage::from_file(&empty), Err(ImageError::InvalidFormat(_))));
    }
}
