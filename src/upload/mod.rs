//! # 上传模块（upload）
//!
//! ## 设计思路
//!
//! 分享扩展的核心：把一张图片以 multipart 方式上传到自建服务，返回可分享链接。
//! 流水线只负责网络与状态，不负责缩放决策和历史持久化，这两件事交给调用方。
//!
//! - `pipeline`：`UploadPipeline`，上传 / 删除 / 取消 / 事件流
//! - `flows`：分享入口、大文件补救、连接测试、两种删除方式
//! - `progress`：分块请求体与进度节流
//! - `request`：地址拼接、MIME、响应解析、错误映射
//! - `state`：`UploadState` / `UploadEvent` / `LargeFileChoice`
//! - `options`：阈值与超时
//!
//! ## 状态流转
//!
//! ```text
//! Idle ─→ Preparing ─┬─→ NotConfigured
//!                    ├─→ TooLarge ──(Resize / ForceUpload)──→ Uploading
//!                    └─→ Uploading(0..1) ─┬─→ Succeeded(record)
//!                                          └─→ Failed(error)
//! ```

mod flows;
mod options;
mod pipeline;
mod progress;
mod request;
mod state;

pub use options::{HARD_CEILING_MB, LARGE_FILE_THRESHOLD_MB, UploadOptions, size_in_mb};
pub use pipeline::UploadPipeline;
pub use progress::{ProgressReporter, progress_body};
pub use request::{UploadResponse, content_type_for, parse_upload_response, upload_endpoint};
pub use state::{LargeFileChoice, UploadEvent, UploadState};
