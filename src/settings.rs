//! 共享配置模块
//!
//! # 设计思路
//!
//! 服务地址与“已配置”标志放在共享容器的 `settings.json` 中（宿主与扩展都能读写），
//! 访问令牌放在 [`SecretStore`]。两者组合成 [`ConfigState`]。
//!
//! # 实现思路
//!
//! - `SharedDefaults` 每次写入都执行“读取 → 修改单个 key → 原子替换”，
//!   跨进程不加锁，最后写入者生效。
//! - “已配置”永远根据实际值推导（地址与令牌均非空），写入的标志仅供其他读者参考。

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::AppError;
use crate::secret::SecretStore;
use crate::storage::{SharedContainer, write_atomic};

pub const BACKEND_URL_KEY: &str = "backendURL";
pub const IS_CONFIGURED_KEY: &str = "isConfigured";
pub const TOKEN_KEY: &str = "apiToken";

/// 共享键值存储（JSON 对象文件）。
#[derive(Debug, Clone)]
pub struct SharedDefaults {
    path: PathBuf,
}

impl SharedDefaults {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>, AppError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(AppError::FileSystem(format!("读取设置文件失败: {}", e))),
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => {
                log::warn!("⚠️ 设置文件格式异常，按空设置处理: {}", self.path.display());
                Ok(Map::new())
            }
        }
    }

    fn update(&self, op: impl FnOnce(&mut Map<String, Value>)) -> Result<(), AppError> {
        let mut map = self.load()?;
        op(&mut map);
        let content = serde_json::to_string_pretty(&Value::Object(map))
            .map_err(|e| AppError::FileSystem(format!("序列化设置失败: {}", e)))?;
        write_atomic(&self.path, content.as_bytes())
    }

    pub fn get_string(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self
            .load()?
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }

    pub fn set_string(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.update(|map| {
            map.insert(key.to_string(), Value::String(value.to_string()));
        })
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, AppError> {
        Ok(self
            .load()?
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    pub fn set_bool(&self, key: &str, value: bool) -> Result<(), AppError> {
        self.update(|map| {
            map.insert(key.to_string(), Value::Bool(value));
        })
    }

    pub fn remove(&self, key: &str) -> Result<(), AppError> {
        self.update(|map| {
            map.remove(key);
        })
    }
}

/// 一次上传所需的凭据快照。
#[derive(Clone)]
pub struct Credentials {
    pub backend_url: String,
    pub token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("backend_url", &self.backend_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// 进程间共享的配置状态。
#[derive(Clone)]
pub struct ConfigState {
    defaults: SharedDefaults,
    secrets: Arc<dyn SecretStore>,
}

impl ConfigState {
    pub fn new(defaults: SharedDefaults, secrets: Arc<dyn SecretStore>) -> Self {
        Self { defaults, secrets }
    }

    /// 基于共享容器创建配置状态。
    pub fn in_container(container: &SharedContainer, secrets: Arc<dyn SecretStore>) -> Self {
        Self::new(SharedDefaults::new(container.settings_path()), secrets)
    }

    pub fn backend_url(&self) -> Result<Option<String>, AppError> {
        Ok(non_empty(self.defaults.get_string(BACKEND_URL_KEY)?))
    }

    pub fn token(&self) -> Result<Option<String>, AppError> {
        Ok(non_empty(self.secrets.get(TOKEN_KEY)?))
    }

    /// 地址与令牌均存在且非空时为已配置；仅供展示，读取失败显示为未配置。
    pub fn is_configured(&self) -> bool {
        matches!(
            (self.backend_url(), self.token()),
            (Ok(Some(_)), Ok(Some(_)))
        )
    }

    /// 读取完整凭据，缺任何一项返回 `NotConfigured`。
    pub fn credentials(&self) -> Result<Credentials, AppError> {
        let backend_url = self.backend_url()?.ok_or(AppError::NotConfigured)?;
        let token = self.token()?.ok_or(AppError::NotConfigured)?;
        Ok(Credentials { backend_url, token })
    }

    /// 保存服务地址与令牌。
    ///
    /// 地址必须是 http/https，末尾斜杠会被去掉。
    pub fn save(&self, backend_url: &str, token: &str) -> Result<(), AppError> {
        let url = normalize_backend_url(backend_url)?;
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::NotConfigured);
        }

        self.secrets.set(TOKEN_KEY, token)?;
        self.defaults.set_string(BACKEND_URL_KEY, &url)?;
        self.defaults.set_bool(IS_CONFIGURED_KEY, true)?;

        log::info!("⚙️ 已保存服务配置 - 地址: {}", url);
        Ok(())
    }

    /// 清除地址、令牌与标志。
    pub fn clear(&self) -> Result<(), AppError> {
        self.secrets.delete(TOKEN_KEY)?;
        self.defaults.remove(BACKEND_URL_KEY)?;
        self.defaults.set_bool(IS_CONFIGURED_KEY, false)?;
        log::info!("⚙️ 已清除服务配置");
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 校验并规范化服务地址。
pub fn normalize_backend_url(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = reqwest::Url::parse(trimmed)
        .map_err(|e| AppError::InvalidUrl(format!("{}: {}", trimmed, e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(AppError::InvalidUrl(format!("仅支持 HTTP/HTTPS：{}", trimmed)));
    }
    if parsed.host_str().is_none() {
        return Err(AppError::InvalidUrl(format!("缺少主机地址：{}", trimmed)));
    }

    Ok(trimmed.to_string())
}
