//! 组合流程：分享入口、大文件补救、连接测试与两种删除方式。

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use image::{ImageFormat, Rgba, RgbaImage};

use crate::error::AppError;
use crate::history::{HistoryStore, UploadRecord};

use super::options::size_in_mb;
use super::pipeline::UploadPipeline;
use super::request::jpeg_filename;
use super::state::{LargeFileChoice, UploadState};

const TEST_FILENAME: &str = "test.png";

impl UploadPipeline {
    /// 分享入口：检查配置与体积，然后上传。
    pub async fn prepare(&self, bytes: Bytes, filename: &str) -> UploadState {
        self.prepare_with_progress(bytes, filename, |_| {}).await
    }

    pub async fn prepare_with_progress<P>(
        &self,
        bytes: Bytes,
        filename: &str,
        on_progress: P,
    ) -> UploadState
    where
        P: Fn(f64) + Send + Sync + 'static,
    {
        match self.config.credentials() {
            Ok(_) => {}
            Err(AppError::NotConfigured) => {
                log::info!("⚙️ 尚未配置服务，跳过上传");
                self.publish(UploadState::NotConfigured);
                return UploadState::NotConfigured;
            }
            Err(error) => {
                log::error!("❌ 读取服务配置失败：{}", error);
                let failed = UploadState::Failed(error);
                self.publish(failed.clone());
                return failed;
            }
        }

        self.publish(UploadState::Preparing);

        let size_mb = size_in_mb(bytes.len());
        if size_mb >= self.options.large_file_threshold_mb {
            log::info!(
                "📏 文件较大，等待用户选择 - 文件: {}, {:.2} MB",
                filename,
                size_mb
            );
            let state = UploadState::TooLarge {
                bytes,
                filename: filename.to_string(),
            };
            self.publish(state.clone());
            return state;
        }

        match self.upload(bytes, filename, on_progress).await {
            Ok(record) => UploadState::Succeeded(record),
            Err(AppError::NotConfigured) => UploadState::NotConfigured,
            Err(error) => UploadState::Failed(error),
        }
    }

    /// 大文件可选的补救方式；达到硬上限后不再提供强制上传。
    pub fn large_file_choices(&self, len: usize) -> Vec<LargeFileChoice> {
        if size_in_mb(len) >= self.options.hard_ceiling_mb {
            vec![LargeFileChoice::Resize, LargeFileChoice::Cancel]
        } else {
            vec![
                LargeFileChoice::Resize,
                LargeFileChoice::ForceUpload,
                LargeFileChoice::Cancel,
            ]
        }
    }

    /// 执行用户对 `TooLarge` 的选择。
    pub async fn resolve_too_large<P>(
        &self,
        choice: LargeFileChoice,
        bytes: Bytes,
        filename: &str,
        on_progress: P,
    ) -> Result<UploadRecord, AppError>
    where
        P: Fn(f64) + Send + Sync + 'static,
    {
        match choice {
            LargeFileChoice::Cancel => {
                log::info!("🛑 用户取消大文件上传 - 文件: {}", filename);
                self.publish(UploadState::Idle);
                Err(AppError::Cancelled)
            }
            LargeFileChoice::ForceUpload => {
                let size_mb = size_in_mb(bytes.len());
                if size_mb >= self.options.hard_ceiling_mb {
                    let error = AppError::FileTooLarge {
                        size_mb,
                        limit_mb: self.options.hard_ceiling_mb,
                    };
                    self.publish(UploadState::Failed(error.clone()));
                    return Err(error);
                }
                self.upload(bytes, filename, on_progress).await
            }
            LargeFileChoice::Resize => {
                self.publish(UploadState::Preparing);
                let images = self.images.clone();
                let task = tokio::task::spawn_blocking(move || images.prepare_upload_bytes(&bytes));
                let resized = task
                    .await
                    .map_err(|e| AppError::ImageProcessingFailed(format!("缩放任务异常：{}", e)))
                    .and_then(|result| result.map_err(AppError::from));

                let resized = match resized {
                    Ok(resized) => resized,
                    Err(error) => {
                        log::warn!("⚠️ 缩放失败 - 文件: {}, 错误: {}", filename, error);
                        self.publish(UploadState::Failed(error.clone()));
                        return Err(error);
                    }
                };

                log::info!(
                    "🖼️ 缩放完成 - 文件: {}, {:.2} MB",
                    filename,
                    size_in_mb(resized.len())
                );
                self.upload(Bytes::from(resized), &jpeg_filename(filename), on_progress)
                    .await
            }
        }
    }

    /// 上传一张 1×1 PNG 再删除它，验证地址与令牌。
    pub async fn test_connection(&self) -> Result<(), AppError> {
        let png = synthetic_png()?;
        let record = self.upload(Bytes::from(png), TEST_FILENAME, |_| {}).await?;

        if let Err(error) = self.delete(&record).await {
            log::warn!("⚠️ 测试图片清理失败（已忽略）- id: {}, 错误: {}", record.id, error);
        }

        log::info!("✅ 连接测试通过");
        self.publish(UploadState::Idle);
        Ok(())
    }

    /// 上传并在成功后写入历史。
    pub async fn share_and_record(
        &self,
        history: &Arc<HistoryStore>,
        bytes: Bytes,
        filename: &str,
    ) -> UploadState {
        let state = self.prepare(bytes, filename).await;

        if let UploadState::Succeeded(record) = &state {
            let store = Arc::clone(history);
            let record = record.clone();
            if let Err(error) = run_blocking(move || store.save(record)).await {
                log::error!("❌ 上传成功但写入历史失败：{}", error);
                let failed = UploadState::Failed(error);
                self.publish(failed.clone());
                return failed;
            }
        }

        state
    }

    /// 仅删除本地记录；远端删除尽力而为，失败只记日志。
    pub async fn delete_local_only(
        &self,
        history: &Arc<HistoryStore>,
        record: &UploadRecord,
    ) -> Result<(), AppError> {
        if let Err(error) = self.delete(record).await {
            log::warn!("⚠️ 远端删除失败（已忽略）- id: {}, 错误: {}", record.id, error);
        }
        remove_local(history, record).await
    }

    /// 先删远端，成功后再删本地；远端失败时本地记录保持不变。
    pub async fn delete_remote_then_local(
        &self,
        history: &Arc<HistoryStore>,
        record: &UploadRecord,
    ) -> Result<(), AppError> {
        self.delete(record).await?;
        remove_local(history, record).await
    }
}

async fn remove_local(history: &Arc<HistoryStore>, record: &UploadRecord) -> Result<(), AppError> {
    let store = Arc::clone(history);
    let id = record.id.clone();
    run_blocking(move || store.delete(&id)).await
}

async fn run_blocking<T, F>(op: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| AppError::FileSystem(format!("后台任务异常：{}", e)))?
}

fn synthetic_png() -> Result<Vec<u8>, AppError> {
    let pixel = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]));
    let mut buffer = Cursor::new(Vec::new());
    pixel
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| AppError::ImageProcessingFailed(format!("无法生成测试图片：{}", e)))?;
    Ok(buffer.into_inner())
}
