use bytes::Bytes;

use crate::error::AppError;
use crate::history::UploadRecord;

/// 上传流水线状态（不持久化）。
#[derive(Debug, Clone, Default)]
pub enum UploadState {
    #[default]
    Idle,
    Preparing,
    /// 已发送比例，0~1。
    Uploading(f64),
    Succeeded(UploadRecord),
    Failed(AppError),
    /// 超过大文件阈值，等待调用方选择缩放 / 强制上传 / 取消。
    TooLarge { bytes: Bytes, filename: String },
    NotConfigured,
}

/// 大文件补救选项。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LargeFileChoice {
    /// 缩放到默认最长边并重新压缩后上传。
    Resize,
    /// 原样上传（仅在硬上限以下提供）。
    ForceUpload,
    Cancel,
}

/// 流式上传事件：若干进度，最后一个 `Finished`。
#[derive(Debug, Clone)]
pub enum UploadEvent {
    Progress(f64),
    Finished(Result<UploadRecord, AppError>),
}
