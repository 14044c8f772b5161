//! # 解码与变换流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 图像 → 缩放 → JPEG”的过程集中管理，并在解码前增加资源上限控制。
//! 优先读取 header 尺寸，再进行完整解码，降低超大输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 猜测格式并读取 header 尺寸，按像素上限快速拒绝
//! 2. 完整解码
//! 3. 仅当任一边超过上限时等比缩小（从不放大）
//! 4. 去除 alpha 后按质量编码 JPEG

use fast_image_resize as fr;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageBuffer, ImageReader, Rgba};
use std::io::Cursor;

use super::{ImageError, ImageProcessor};

impl ImageProcessor {
    /// 解码图片字节，解码前先做像素上限检查。
    pub fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, ImageError> {
        let config = self.config_snapshot()?;

        let (header_width, header_height) = Self::inspect_dimensions_from_memory(bytes)?;
        let pixels = (header_width as u64)
            .checked_mul(header_height as u64)
            .ok_or_else(|| ImageError::ResourceLimit("图片像素数溢出".to_string()))?;

        if pixels > config.max_decoded_pixels {
            return Err(ImageError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, config.max_decoded_pixels
            )));
        }

        image::load_from_memory(bytes).map_err(|e| ImageError::Decode(format!("图片解码失败：{}", e)))
    }

    /// 等比缩小到最长边不超过 `max_dimension`；不会放大。
    pub fn resize(
        &self,
        image: DynamicImage,
        max_dimension: u32,
    ) -> Result<DynamicImage, ImageError> {
        let (width, height) = image.dimensions();
        let Some((target_width, target_height)) = Self::fit_within(width, height, max_dimension)
        else {
            return Ok(image);
        };

        let filter = self.config_snapshot()?.resize_filter;

        log::debug!(
            "🧩 等比缩放：{}x{} -> {}x{}（filter={:?}）",
            width,
            height,
            target_width,
            target_height,
            filter
        );

        match Self::resize_with_fast_image_resize(&image, target_width, target_height, filter) {
            Ok(resized) => Ok(resized),
            Err(err) => {
                log::warn!("⚠️ fast_image_resize 缩放失败，回退 image::resize_exact：{}", err);
                Ok(image.resize_exact(target_width, target_height, filter))
            }
        }
    }

    /// 以给定质量（0~1）编码为 JPEG。
    pub fn compress(&self, image: &DynamicImage, quality: f32) -> Result<Vec<u8>, ImageError> {
        let rgb = image.to_rgb8();
        let mut buffer = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, Self::jpeg_quality(quality));
        encoder
            .encode_image(&rgb)
            .map_err(|e| ImageError::Encode(format!("JPEG 编码失败：{}", e)))?;
        Ok(buffer)
    }

    /// 生成缩略图；任何失败都降级为 `None`，不影响调用方。
    pub fn generate_thumbnail(&self, bytes: &[u8], max_size: u32) -> Option<Vec<u8>> {
        let quality = match self.config_snapshot() {
            Ok(config) => config.thumbnail_quality,
            Err(_) => super::THUMBNAIL_QUALITY,
        };

        let result = self
            .decode(bytes)
            .and_then(|image| self.resize(image, max_size))
            .and_then(|image| self.compress(&image, quality));

        match result {
            Ok(thumbnail) => Some(thumbnail),
            Err(err) => {
                log::warn!("⚠️ 缩略图生成失败，跳过：{}", err);
                None
            }
        }
    }

    /// 缩放 + 压缩，“缩放后上传”与大文件补救路径使用。
    pub fn prepare_for_upload(
        &self,
        image: DynamicImage,
        max_dimension: u32,
        quality: f32,
    ) -> Result<Vec<u8>, ImageError> {
        let resized = self.resize(image, max_dimension)?;
        self.compress(&resized, quality)
    }

    /// 计算等比缩小后的尺寸；无需缩小时返回 `None`。
    pub(crate) fn fit_within(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
        if max_dimension == 0 || (width <= max_dimension && height <= max_dimension) {
            return None;
        }

        let scale = (max_dimension as f64 / width as f64).min(max_dimension as f64 / height as f64);
        let target_width = ((width as f64 * scale).round() as u32).clamp(1, max_dimension);
        let target_height = ((height as f64 * scale).round() as u32).clamp(1, max_dimension);
        Some((target_width, target_height))
    }

    fn jpeg_quality(quality: f32) -> u8 {
        let quality = if quality.is_finite() { quality } else { super::DEFAULT_UPLOAD_QUALITY };
        (quality.clamp(0.0, 1.0) * 100.0).round().clamp(1.0, 100.0) as u8
    }

    /// 仅通过内存中的图片头信息读取宽高。
    fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), ImageError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ImageError::InvalidFormat(format!("无法识别图片格式：{}", e)))?;

        reader
            .into_dimensions()
            .map_err(|e| ImageError::InvalidFormat(format!("无法读取图片尺寸：{}", e)))
    }

    fn resize_with_fast_image_resize(
        image: &DynamicImage,
        target_width: u32,
        target_height: u32,
        filter: image::imageops::FilterType,
    ) -> Result<DynamicImage, ImageError> {
        let src = image.to_rgba8();
        let (src_width, src_height) = src.dimensions();

        let src_image = fr::images::Image::from_vec_u8(
            src_width,
            src_height,
            src.into_raw(),
            fr::PixelType::U8x4,
        )
        .map_err(|e| ImageError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image =
            fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(
            Self::to_fast_filter(filter),
        ));

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| ImageError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

        let rgba = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(
            target_width,
            target_height,
            dst_image.into_vec(),
        )
        .ok_or_else(|| ImageError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))?;

        Ok(DynamicImage::ImageRgba8(rgba))
    }

    fn to_fast_filter(filter: image::imageops::FilterType) -> fr::FilterType {
        match filter {
            image::imageops::FilterType::Nearest => fr::FilterType::Box,
            image::imageops::FilterType::Triangle => fr::FilterType::Bilinear,
            image::imageops::FilterType::CatmullRom => fr::FilterType::CatmullRom,
            image::imageops::FilterType::Gaussian => fr::FilterType::Mitchell,
            image::imageops::FilterType::Lanczos3 => fr::FilterType::Lanczos3,
        }
    }
}
