//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，上传流水线、历史记录、配置与密钥存储
//! 全部返回 `Result<T, AppError>`，调用方按分支匹配决定是否重试、提示用户。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `ImageError` / `std::io::Error` 提供 `From` 转换，无需手动 map。
//! - `code()` 输出稳定错误码，`presentation()` 输出“标题 + 描述 + 建议”，
//!   供界面层直接展示；任何错误都不会终止进程。

use serde::Serialize;

use crate::image_handler::ImageError;

/// 应用级统一错误类型
#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    /// 服务地址或令牌缺失
    #[error("尚未配置服务地址或访问令牌")]
    NotConfigured,

    /// 地址无法解析或协议不受支持
    #[error("无效的地址: {0}")]
    InvalidUrl(String),

    /// 上传请求返回非 200 状态
    #[error("上传失败 (HTTP {status}){}", fmt_message(.message))]
    UploadFailed { status: u16, message: Option<String> },

    /// 删除请求返回非 200/204 状态
    #[error("删除失败 (HTTP {status}){}", fmt_message(.message))]
    DeleteFailed { status: u16, message: Option<String> },

    /// DNS / TLS / 连接 / 超时等网络层错误
    #[error("网络错误: {0}")]
    Network(String),

    /// 服务端响应不是预期的 JSON 结构
    #[error("服务端响应无效: {0}")]
    InvalidResponse(String),

    /// 密钥存储读写失败
    #[error("密钥存储错误 (code {code}): {message}")]
    SecretStore { code: i32, message: String },

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    FileSystem(String),

    /// 图片解码 / 缩放 / 压缩失败
    #[error("图片处理失败: {0}")]
    ImageProcessingFailed(String),

    /// 上传被调用方取消
    #[error("上传已取消")]
    Cancelled,

    /// 超过硬上限，只能缩放后上传
    #[error("文件过大：{size_mb:.1} MB（上限 {limit_mb:.0} MB）")]
    FileTooLarge { size_mb: f64, limit_mb: f64 },
}

fn fmt_message(message: &Option<String>) -> String {
    match message {
        Some(text) => format!(": {}", text),
        None => String::new(),
    }
}

impl From<ImageError> for AppError {
    fn from(error: ImageError) -> Self {
        AppError::ImageProcessingFailed(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        AppError::FileSystem(error.to_string())
    }
}

/// 面向用户的错误展示信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPresentation {
    pub title: &'static str,
    pub message: String,
    pub remedy: Option<&'static str>,
}

impl AppError {
    /// 稳定错误码，用于日志与界面分支。
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotConfigured => "E_NOT_CONFIGURED",
            AppError::InvalidUrl(_) => "E_INVALID_URL",
            AppError::UploadFailed { .. } => "E_UPLOAD_FAILED",
            AppError::DeleteFailed { .. } => "E_DELETE_FAILED",
            AppError::Network(_) => "E_NETWORK",
            AppError::InvalidResponse(_) => "E_INVALID_RESPONSE",
            AppError::SecretStore { .. } => "E_SECRET_STORE",
            AppError::FileSystem(_) => "E_FILE_SYSTEM",
            AppError::ImageProcessingFailed(_) => "E_IMAGE",
            AppError::Cancelled => "E_CANCELLED",
            AppError::FileTooLarge { .. } => "E_FILE_TOO_LARGE",
        }
    }

    /// 是否值得原样重试。
    ///
    /// 网络层错误与 408 / 429 / 5xx 视为可重试，其余需要用户介入。
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Network(_) => true,
            AppError::UploadFailed { status, .. } | AppError::DeleteFailed { status, .. } => {
                *status == 408 || *status == 429 || (500..=599).contains(status)
            }
            _ => false,
        }
    }

    /// 转换为“标题 + 描述 + 建议”的展示结构。
    pub fn presentation(&self) -> ErrorPresentation {
        let (title, remedy) = match self {
            AppError::NotConfigured => ("未配置", Some("请在设置中填写服务地址和访问令牌")),
            AppError::InvalidUrl(_) => ("地址无效", Some("请检查服务地址是否以 http:// 或 https:// 开头")),
            AppError::UploadFailed { status: 401 | 403, .. }
            | AppError::DeleteFailed { status: 401 | 403, .. } => {
                ("认证失败", Some("请重新输入访问令牌"))
            }
            AppError::UploadFailed { status: 413, .. } => ("文件过大", Some("请缩小图片后重试")),
            AppError::UploadFailed { .. } => ("上传失败", Some("请稍后重试")),
            AppError::DeleteFailed { .. } => ("删除失败", Some("请稍后重试")),
            AppError::Network(_) => ("网络错误", Some("请检查网络连接")),
            AppError::InvalidResponse(_) => ("服务端响应异常", Some("请确认服务地址指向正确的图床服务")),
            AppError::SecretStore { .. } => ("密钥存储错误", Some("请重新保存访问令牌")),
            AppError::FileSystem(_) => ("存储错误", None),
            AppError::ImageProcessingFailed(_) => ("图片处理失败", Some("请尝试其他图片")),
            AppError::Cancelled => ("已取消", None),
            AppError::FileTooLarge { .. } => ("文件过大", Some("请选择缩放后上传")),
        };

        ErrorPresentation {
            title,
            message: self.to_string(),
            remedy,
        }
    }
}

/// 将错误序列化为人类可读的字符串，便于宿主进程跨边界传递。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_failed_message_includes_body_text() {
        let err = AppError::UploadFailed {
            status: 413,
            message: Some("too big".to_string()),
        };
        assert_eq!(err.to_string(), "上传失败 (HTTP 413): too big");

        let bare = AppError::DeleteFailed { status: 404, message: None };
        assert_eq!(bare.to_string(), "删除失败 (HTTP 404)");
    }

    #[test]
    fn retryable_classification() {
        assert!(AppError::Network("reset".into()).is_retryable());
        assert!(AppError::UploadFailed { status: 503, message: None }.is_retryable());
        assert!(AppError::DeleteFailed { status: 429, message: None }.is_retryable());
        assert!(!AppError::UploadFailed { status: 413, message: None }.is_retryable());
        assert!(!AppError::NotConfigured.is_retryable());
        assert!(!AppError::Cancelled.is_retryable());
    }

    #[test]
    fn auth_failures_suggest_reentering_token() {
        let p = AppError::UploadFailed { status: 401, message: None }.presentation();
        assert_eq!(p.title, "认证失败");
        assert_eq!(p.remedy, Some("请重新输入访问令牌"));
    }

    #[test]
    fn image_error_converts_to_processing_failure() {
        let err: AppError = ImageError::Decode("bad header".into()).into();
        assert!(matches!(err, AppError::ImageProcessingFailed(_)));
        assert_eq!(err.code(), "E_IMAGE");
    }
}
