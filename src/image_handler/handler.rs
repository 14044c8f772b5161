//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageProcessor` 只负责流程编排与配置管理，不持有任何图片状态。
//! 两条对外链路：
//! 1. 缩略图：字节 → 解码 → 缩放到 200 → 0.7 质量 JPEG（失败返回 `None`）
//! 2. 缩放后上传：字节 → 解码 → 缩放到 4096 → 0.85 质量 JPEG
//!
//! ## 实现思路
//!
//! - 配置放在 `Arc<RwLock<ImageConfig>>` 中，克隆的处理器共享同一份配置。
//! - 单次调用内使用“同一配置快照”，避免处理中途配置漂移。
//! - 记录 `decode/encode/total` 阶段耗时，便于性能诊断。

use std::sync::{Arc, RwLock};
use std::time::Instant;

use super::{ImageConfig, ImageError};

/// 图片预处理器。
#[derive(Debug, Clone, Default)]
pub struct ImageProcessor {
    pub(super) config: Arc<RwLock<ImageConfig>>,
}

impl ImageProcessor {
    pub fn new(config: ImageConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
        }
    }

    /// 获取配置快照。
    pub fn config_snapshot(&self) -> Result<ImageConfig, ImageError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| ImageError::ResourceLimit("配置读取锁已中毒".to_string()))
    }

    /// 按配置生成缩略图。
    pub fn thumbnail_for(&self, bytes: &[u8]) -> Option<Vec<u8>> {
        let config = match self.config_snapshot() {
            Ok(config) => config,
            Err(err) => {
                log::warn!("⚠️ 读取图片配置失败，跳过缩略图：{}", err);
                return None;
            }
        };
        self.generate_thumbnail(bytes, config.thumbnail_max_dimension)
    }

    /// “缩放后上传”完整链路：解码 → 缩放 → 压缩。
    pub fn prepare_upload_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>, ImageError> {
        let config = self.config_snapshot()?;
        let total_start = Instant::now();

        let decode_start = Instant::now();
        let image = self.decode(bytes)?;
        let decode_elapsed = decode_start.elapsed();

        let encode_start = Instant::now();
        let output =
            self.prepare_for_upload(image, config.max_upload_dimension, config.upload_quality)?;
        let encode_elapsed = encode_start.elapsed();

        log::info!(
            "✅ 上传预处理完成 - {} bytes -> {} bytes decode={}ms encode={}ms total={}ms",
            bytes.len(),
            output.len(),
            decode_elapsed.as_millis(),
            encode_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(output)
    }
}
