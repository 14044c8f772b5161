//! # 图片预处理模块（image_handler）
//!
//! ## 设计思路
//!
//! 上传流水线本身不缩放图片，是否缩放由调用方决定。本模块提供调用方需要的纯处理能力：
//! 等比缩放、按质量压缩、生成缩略图、“缩放 + 压缩”组合，以及分享交接的加载。
//!
//! - `config`：阈值与质量常量、`ImageConfig`
//! - `handler`：`ImageProcessor` 与两条编排链路（缩略图 / 缩放后上传）
//! - `pipeline`：解码、像素限制、缩放、JPEG 编码
//! - `loader`：文件 / Base64 加载与文件名推断
//! - `source`：分享交接数据模型
//! - `error`：图片链路错误
//!
//! ## 调用链
//!
//! ```text
//! 分享交接 ─ loader.rs ─→ SharedImage
//!                              │
//!     大文件? ── 是 ── handler.rs::prepare_upload_bytes ─┐
//!        │                                              ↓
//!        └─ 否 ────────────────────────────────→ upload 流水线
//!                                                       │
//!                          handler.rs::thumbnail_for ←──┘（上传成功后）
//! ```

mod config;
mod error;
mod handler;
mod loader;
mod pipeline;
mod source;

pub use config::{
    ImageConfig, DEFAULT_MAX_UPLOAD_DIMENSION, DEFAULT_UPLOAD_QUALITY, THUMBNAIL_MAX_DIMENSION,
    THUMBNAIL_QUALITY,
};
pub use error::ImageError;
pub use handler::ImageProcessor;
pub use loader::suggest_filename;
pub use source::SharedImage;
