//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `ImageConfig`，保证缩放、压缩、缩略图行为可观测、可调整、可测试。
//! 默认值即对外约定的常量：上传最长边 4096、上传质量 0.85、缩略图 200 / 0.7。

use image::imageops::FilterType;

/// 上传时默认的最长边（像素）。
pub const DEFAULT_MAX_UPLOAD_DIMENSION: u32 = 4096;
/// 上传 JPEG 默认质量。
pub const DEFAULT_UPLOAD_QUALITY: f32 = 0.85;
/// 缩略图最长边（像素）。
pub const THUMBNAIL_MAX_DIMENSION: u32 = 200;
/// 缩略图 JPEG 质量。
pub const THUMBNAIL_QUALITY: f32 = 0.7;

/// 图片处理配置。
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// “缩放后上传”时的最长边。
    pub max_upload_dimension: u32,
    /// “缩放后上传”时的 JPEG 质量（0~1）。
    pub upload_quality: f32,
    /// 缩略图最长边。
    pub thumbnail_max_dimension: u32,
    /// 缩略图 JPEG 质量（0~1）。
    pub thumbnail_quality: f32,
    /// 解码后的像素上限（`width * height`），超过则拒绝完整解码。
    pub max_decoded_pixels: u64,
    /// 缩放滤镜策略。
    pub resize_filter: FilterType,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_upload_dimension: DEFAULT_MAX_UPLOAD_DIMENSION,
            upload_quality: DEFAULT_UPLOAD_QUALITY,
            thumbnail_max_dimension: THUMBNAIL_MAX_DIMENSION,
            thumbnail_quality: THUMBNAIL_QUALITY,
            max_decoded_pixels: 120_000_000,
            resize_filter: FilterType::Triangle,
        }
    }
}
