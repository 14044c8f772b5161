//! 密钥存储模块
//!
//! # 设计思路
//!
//! 访问令牌不进入普通配置文件，而是交给 `SecretStore`。
//! 上层只依赖 `get / set / delete` 三个操作，具体由平台能力实现；
//! 唯一的行为约束是单个 key 的读写是原子的。
//!
//! # 实现思路
//!
//! - `FileSecretStore`：共享容器下 `secrets/<service>.<key>`，每个 key 一个文件，
//!   原子替换写入，unix 下权限收紧为 0600。
//! - `MemorySecretStore`：进程内实现，用于测试或嵌入场景。

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::AppError;
use crate::storage::write_atomic;

/// 宿主与扩展共用的服务标识。
pub const DEFAULT_SERVICE: &str = "image-share.credentials";

/// 不透明的密钥存储接口。
pub trait SecretStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    /// 删除不存在的 key 不视为错误。
    fn delete(&self, key: &str) -> Result<(), AppError>;
}

fn secret_error(error: std::io::Error, action: &str) -> AppError {
    AppError::SecretStore {
        code: error.raw_os_error().unwrap_or(-1),
        message: format!("{}: {}", action, error),
    }
}

/// 基于文件的密钥存储。
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    dir: PathBuf,
    service: String,
}

impl FileSecretStore {
    pub fn new(dir: impl Into<PathBuf>, service: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            service: service.into(),
        }
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, AppError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
        if !valid {
            return Err(AppError::SecretStore {
                code: -2,
                message: format!("非法的密钥名：{:?}", key),
            });
        }
        Ok(self.dir.join(format!("{}.{}", self.service, key)))
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let path = self.entry_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(secret_error(e, "读取密钥失败")),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let path = self.entry_path(key)?;
        write_atomic(&path, value.as_bytes()).map_err(|e| AppError::SecretStore {
            code: -1,
            message: e.to_string(),
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
                .map_err(|e| secret_error(e, "设置密钥文件权限失败"))?;
        }

        log::debug!("🔑 已写入密钥 - key: {}", key);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.entry_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("🔑 已删除密钥 - key: {}", key);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(secret_error(e, "删除密钥失败")),
        }
    }
}

/// 进程内密钥存储。
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, AppError> {
        self.entries.lock().map_err(|_| AppError::SecretStore {
            code: -3,
            message: "密钥存储锁已中毒".to_string(),
        })
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), AppError> {
        self.lock()?.remove(key);
        Ok(())
    }
}
