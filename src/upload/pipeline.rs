//! # 上传流水线
//!
//! ## 设计思路
//!
//! 一个 `UploadPipeline` 同时只跟踪一次传输：传输在独立任务中运行，
//! 句柄保存在 `active` 中，`cancel()` 直接中止该任务，等待方随即得到 `Cancelled`。
//! 状态通过 `watch` 通道发布，界面层订阅即可，不需要轮询。
//!
//! ## 实现思路
//!
//! 1. 每次上传前重新读取凭据（配置可能在两次分享之间被修改）。
//! 2. 请求体按块流式发送，进度 = 已交给传输层的字节 / 总字节。
//! 3. 非 200 → `UploadFailed`；200 但 JSON 不合法 → `InvalidResponse`。
//! 4. 缩略图在阻塞线程池生成，失败只记日志。
//! 5. 流水线不写历史，持久化由调用方决定。

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use chrono::Utc;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;

use crate::error::AppError;
use crate::history::UploadRecord;
use crate::image_handler::ImageProcessor;
use crate::settings::ConfigState;

use super::options::UploadOptions;
use super::progress::{ProgressReporter, progress_body};
use super::request::{
    body_message, content_type_for, map_reqwest_error, parse_upload_response, redact_url_for_log,
    upload_endpoint,
};
use super::state::{UploadEvent, UploadState};

pub struct UploadPipeline {
    pub(super) config: ConfigState,
    pub(super) options: UploadOptions,
    pub(super) images: ImageProcessor,
    client: reqwest::Client,
    active: Mutex<Option<AbortHandle>>,
    state: Arc<watch::Sender<UploadState>>,
}

impl UploadPipeline {
    pub fn new(config: ConfigState, options: UploadOptions) -> Result<Self, AppError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.request_timeout_secs))
            .connect_timeout(Duration::from_secs(options.connect_timeout_secs));
        if !options.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| AppError::Network(format!("无法创建 HTTP 客户端：{}", e)))?;

        let (state, _) = watch::channel(UploadState::Idle);

        Ok(Self {
            config,
            options,
            images: ImageProcessor::default(),
            client,
            active: Mutex::new(None),
            state: Arc::new(state),
        })
    }

    pub fn config(&self) -> &ConfigState {
        &self.config
    }

    /// 订阅状态变化，订阅时立即可读到当前状态。
    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.state.subscribe()
    }

    pub fn current_state(&self) -> UploadState {
        self.state.borrow().clone()
    }

    pub(super) fn publish(&self, state: UploadState) {
        self.state.send_replace(state);
    }

    /// 上传字节并返回上传记录（不写历史）。
    ///
    /// `on_progress` 可能在运行时工作线程上调用，取值单调不减，最后一次为 1.0。
    pub async fn upload<P>(
        &self,
        bytes: Bytes,
        filename: &str,
        on_progress: P,
    ) -> Result<UploadRecord, AppError>
    where
        P: Fn(f64) + Send + Sync + 'static,
    {
        let result = self.transfer(bytes, filename, on_progress).await;

        match &result {
            Ok(record) => self.publish(UploadState::Succeeded(record.clone())),
            Err(AppError::NotConfigured) => self.publish(UploadState::NotConfigured),
            Err(error) => {
                log::warn!("⚠️ 上传失败 - 文件: {}, 错误: {}", filename, error);
                self.publish(UploadState::Failed(error.clone()));
            }
        }

        result
    }

    async fn transfer<P>(
        &self,
        bytes: Bytes,
        filename: &str,
        on_progress: P,
    ) -> Result<UploadRecord, AppError>
    where
        P: Fn(f64) + Send + Sync + 'static,
    {
        let credentials = self.config.credentials()?;
        let endpoint = upload_endpoint(&credentials.backend_url)?;
        let total = bytes.len() as u64;
        let started = Instant::now();

        log::info!(
            "📤 开始上传 - 文件: {}, {} bytes, 目标: {}",
            filename,
            total,
            redact_url_for_log(endpoint.as_str())
        );

        self.publish(UploadState::Uploading(0.0));
        let state = Arc::clone(&self.state);
        let reporter = Arc::new(ProgressReporter::new(total, move |fraction| {
            state.send_replace(UploadState::Uploading(fraction));
            on_progress(fraction);
        }));

        let body = progress_body(bytes.clone(), self.options.chunk_size, Arc::clone(&reporter));
        let part = Part::stream_with_length(body, total)
            .file_name(filename.to_string())
            .mime_str(content_type_for(filename))
            .map_err(map_reqwest_error)?;
        let request = self
            .client
            .post(endpoint)
            .bearer_auth(&credentials.token)
            .multipart(Form::new().part("file", part));

        let task = tokio::spawn(async move {
            let response = request.send().await.map_err(map_reqwest_error)?;
            let status = response.status();
            let body = response.bytes().await.map_err(map_reqwest_error)?;
            Ok::<_, AppError>((status, body))
        });
        self.set_active(Some(task.abort_handle()));
        let joined = task.await;
        self.set_active(None);

        let (status, body) = match joined {
            Ok(outcome) => outcome?,
            Err(e) if e.is_cancelled() => {
                log::info!("🛑 上传已取消 - 文件: {}", filename);
                return Err(AppError::Cancelled);
            }
            Err(e) => return Err(AppError::Network(format!("上传任务异常终止：{}", e))),
        };

        if status != StatusCode::OK {
            let text = String::from_utf8_lossy(&body);
            return Err(AppError::UploadFailed {
                status: status.as_u16(),
                message: body_message(&text),
            });
        }

        reporter.finish();
        let response = parse_upload_response(&body)?;

        let images = self.images.clone();
        let thumbnail = tokio::task::spawn_blocking(move || images.thumbnail_for(&bytes))
            .await
            .unwrap_or_else(|e| {
                log::warn!("⚠️ 缩略图任务异常：{}", e);
                None
            });

        log::info!(
            "✅ 上传完成 - id: {}, 耗时: {}ms",
            response.id,
            started.elapsed().as_millis()
        );

        Ok(UploadRecord {
            id: response.id,
            url: response.url,
            delete_url: response.delete_url,
            thumbnail_data: thumbnail,
            created_at: Utc::now(),
            original_filename: Some(filename.to_string()),
        })
    }

    /// 以事件流形式执行上传：若干 `Progress`，最后一个 `Finished`。
    ///
    /// 需在 tokio 运行时内调用。
    pub fn upload_events(
        self: &Arc<Self>,
        bytes: Bytes,
        filename: impl Into<String>,
    ) -> mpsc::UnboundedReceiver<UploadEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let pipeline = Arc::clone(self);
        let filename = filename.into();

        tokio::spawn(async move {
            let progress_tx = tx.clone();
            let result = pipeline
                .upload(bytes, &filename, move |fraction| {
                    let _ = progress_tx.send(UploadEvent::Progress(fraction));
                })
                .await;
            let _ = tx.send(UploadEvent::Finished(result));
        });

        rx
    }

    /// 删除服务端图片。200/204 视为成功。
    pub async fn delete(&self, record: &UploadRecord) -> Result<(), AppError> {
        let token = self.config.token()?.ok_or(AppError::NotConfigured)?;
        let url = reqwest::Url::parse(&record.delete_url).map_err(|e| {
            AppError::InvalidUrl(format!("{}: {}", redact_url_for_log(&record.delete_url), e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(AppError::InvalidUrl(format!("仅支持 HTTP/HTTPS：{}", url.scheme())));
        }

        log::info!(
            "🗑️ 删除远端图片 - id: {}, 目标: {}",
            record.id,
            redact_url_for_log(url.as_str())
        );

        let response = self
            .client
            .delete(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::NO_CONTENT {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(AppError::DeleteFailed {
            status: status.as_u16(),
            message: body_message(&text),
        })
    }

    /// 中止进行中的传输；空闲时无操作。
    pub fn cancel(&self) {
        let handle = match self.active.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => return,
        };

        if let Some(handle) = handle {
            log::info!("🛑 收到取消请求");
            handle.abort();
        }
    }

    pub fn is_busy(&self) -> bool {
        self.active
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    fn set_active(&self, handle: Option<AbortHandle>) {
        if let Ok(mut guard) = self.active.lock() {
            *guard = handle;
        }
    }
}
