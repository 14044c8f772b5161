//! 共享存储目录管理模块
//!
//! # 设计思路
//!
//! 宿主应用与分享扩展运行在两个独立进程中，历史记录、配置与令牌都必须落在
//! 同一个“共享容器”目录里，双方才能互相看到对方的写入。
//!
//! # 实现思路
//!
//! - 目录优先级：显式指定 > 环境变量 `IMAGE_SHARE_CONTAINER` > 平台数据目录下的应用组子目录。
//! - 目录不存在时自动 `create_dir_all`，避免上层判断。
//! - 所有写入统一走 [`write_atomic`]：同目录临时文件 + rename，读者永远看不到半截文件。
//! - 所有可能失败的操作均返回 `Result`，不使用 `expect()` / `unwrap()`。

use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// 应用组标识，宿主与扩展共用。
pub const APP_GROUP_ID: &str = "group.image-share";

/// 覆盖共享容器位置的环境变量。
pub const CONTAINER_ENV: &str = "IMAGE_SHARE_CONTAINER";

const HISTORY_FILE: &str = "history.json";
const SETTINGS_FILE: &str = "settings.json";
const SECRETS_DIR: &str = "secrets";

/// 存储目录信息
#[derive(Debug, Clone, Serialize)]
pub struct StorageInfo {
    pub path: String,
    pub total_size: u64,
    pub file_count: u64,
}

/// 宿主应用与扩展共享的存储目录。
#[derive(Debug, Clone)]
pub struct SharedContainer {
    root: PathBuf,
}

impl SharedContainer {
    /// 使用指定目录作为共享容器（不存在则创建）。
    pub fn at(root: impl Into<PathBuf>) -> Result<Self, AppError> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root).map_err(|e| {
                AppError::FileSystem(format!("创建共享目录 '{}' 失败: {}", root.display(), e))
            })?;
        }
        Ok(Self { root })
    }

    /// 按优先级解析共享容器目录。
    ///
    /// # 参数
    /// * `custom_dir` - 用户显式指定的目录（可选，空字符串视为未指定）
    pub fn resolve(custom_dir: Option<String>) -> Result<Self, AppError> {
        if let Some(dir) = custom_dir {
            if !dir.is_empty() {
                return Self::at(dir);
            }
        }

        if let Ok(dir) = std::env::var(CONTAINER_ENV) {
            if !dir.trim().is_empty() {
                return Self::at(dir.trim());
            }
        }

        let data_dir = dirs::data_dir()
            .ok_or_else(|| AppError::FileSystem("获取平台数据目录失败".to_string()))?;
        Self::at(data_dir.join("image-share").join(APP_GROUP_ID))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn history_path(&self) -> PathBuf {
        self.root.join(HISTORY_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    pub fn secrets_dir(&self) -> PathBuf {
        self.root.join(SECRETS_DIR)
    }

    /// 获取共享目录信息（路径 + 占用大小 + 文件数）
    pub fn info(&self) -> StorageInfo {
        let mut total_size: u64 = 0;
        let mut file_count: u64 = 0;

        if let Ok(entries) = fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                if let Ok(metadata) = entry.metadata() {
                    if metadata.is_file() {
                        total_size += metadata.len();
                        file_count += 1;
                    }
                }
            }
        }

        StorageInfo {
            path: self.root.to_string_lossy().to_string(),
            total_size,
            file_count,
        }
    }
}

/// 原子替换写入：先写同目录临时文件并落盘，再 rename 覆盖目标。
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), AppError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .map_err(|e| AppError::FileSystem(format!("创建目录 '{}' 失败: {}", parent.display(), e)))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| AppError::FileSystem(format!("创建临时文件失败: {}", e)))?;
    tmp.write_all(contents)
        .map_err(|e| AppError::FileSystem(format!("写入临时文件失败: {}", e)))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| AppError::FileSystem(format!("临时文件落盘失败: {}", e)))?;
    tmp.persist(path)
        .map_err(|e| AppError::FileSystem(format!("替换 '{}' 失败: {}", path.display(), e.error)))?;

    Ok(())
}
