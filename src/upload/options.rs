//! # 上传配置
//!
//! 阈值与超时集中在 `UploadOptions`，默认值即对外约定：
//! 80 MB 起提示“缩放 / 强制上传 / 取消”，100 MB 起只允许缩放。
//! 扩展进程的内存上限约 100 MB，超过会被系统直接杀掉。

/// 大文件软阈值（MB）。达到或超过即进入 `TooLarge`。
pub const LARGE_FILE_THRESHOLD_MB: f64 = 80.0;
/// 硬上限（MB）。达到或超过不再提供“强制上传”。
pub const HARD_CEILING_MB: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub large_file_threshold_mb: f64,
    pub hard_ceiling_mb: f64,
    /// 单次请求总超时（秒）。
    pub request_timeout_secs: u64,
    /// 建立连接（TCP/TLS）超时（秒）。
    pub connect_timeout_secs: u64,
    /// 请求体分块大小（字节），决定进度回调粒度。
    pub chunk_size: usize,
    /// 是否读取系统代理环境变量。
    pub use_system_proxy: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            large_file_threshold_mb: LARGE_FILE_THRESHOLD_MB,
            hard_ceiling_mb: HARD_CEILING_MB,
            request_timeout_secs: 300,
            connect_timeout_secs: 15,
            chunk_size: 64 * 1024,
            use_system_proxy: true,
        }
    }
}

/// 字节数换算为 MB（1 MB = 1024 × 1024 字节）。
pub fn size_in_mb(len: usize) -> f64 {
    len as f64 / 1024.0 / 1024.0
}
