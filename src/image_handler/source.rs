//! # 分享数据模型
//!
//! ## 设计思路
//!
//! 系统分享机制交给我们的只有“字节 + 建议文件名”。`SharedImage` 就是这份交接物，
//! 字节使用 `Bytes` 保存，在状态机与重试路径之间传递时只做引用计数拷贝。

use bytes::Bytes;

/// 分享交接得到的原始图片。
#[derive(Debug, Clone)]
pub struct SharedImage {
    /// 原始图片字节（未经任何处理）。
    pub bytes: Bytes,
    /// 建议文件名（含扩展名）。
    pub filename: String,
}

impl SharedImage {
    pub fn new(bytes: impl Into<Bytes>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 体积（MB，按 1024 × 1024 计）。
    pub fn size_mb(&self) -> f64 {
        self.bytes.len() as f64 / 1024.0 / 1024.0
    }
}
