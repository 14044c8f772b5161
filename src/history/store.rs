use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::AppError;
use crate::storage::{SharedContainer, write_atomic};

use super::{insert_front, remove_by_id, UploadRecord, MAX_HISTORY_ENTRIES};

/// 上传历史存储。
///
/// 不缓存内容：每次读写都以磁盘文件为准，另一个进程的写入下一次读取即可见。
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    max_entries: usize,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_capacity(path, MAX_HISTORY_ENTRIES)
    }

    pub fn with_capacity(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            path: path.into(),
            max_entries,
            write_lock: Mutex::new(()),
        }
    }

    /// 使用共享容器中的 `history.json`。
    pub fn in_container(container: &SharedContainer) -> Self {
        Self::new(container.history_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取全部记录（最新在前）。文件不存在时返回空列表。
    pub fn load_all(&self) -> Result<Vec<UploadRecord>, AppError> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::FileSystem(format!("读取历史记录失败: {}", e))),
        };

        serde_json::from_slice(&content).map_err(|e| {
            AppError::FileSystem(format!("历史记录文件已损坏 '{}': {}", self.path.display(), e))
        })
    }

    pub fn get(&self, id: &str) -> Result<Option<UploadRecord>, AppError> {
        Ok(self.load_all()?.into_iter().find(|record| record.id == id))
    }

    pub fn len(&self) -> Result<usize, AppError> {
        Ok(self.load_all()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, AppError> {
        Ok(self.len()? == 0)
    }

    /// 保存记录：同 id 旧条目被替换，新条目置顶，超出上限的最旧条目被淘汰。
    pub fn save(&self, record: UploadRecord) -> Result<(), AppError> {
        let _guard = self.lock()?;
        let mut list = self.load_all()?;
        let id = record.id.clone();
        insert_front(&mut list, record, self.max_entries);
        self.persist(&list)?;
        log::info!("🗂️ 已保存上传记录 - id: {} 当前条数: {}", id, list.len());
        Ok(())
    }

    /// 按 id 删除；不存在时什么也不做。
    pub fn delete(&self, id: &str) -> Result<(), AppError> {
        let _guard = self.lock()?;
        let mut list = self.load_all()?;
        if !remove_by_id(&mut list, id) {
            log::debug!("🗂️ 历史记录中不存在 id: {}，跳过删除", id);
            return Ok(());
        }
        self.persist(&list)?;
        log::info!("🗑️ 已删除上传记录 - id: {}", id);
        Ok(())
    }

    /// 清空历史（即使原文件已损坏也能恢复）。
    pub fn clear(&self) -> Result<(), AppError> {
        let _guard = self.lock()?;
        self.persist(&[])?;
        log::info!("🗑️ 已清空上传历史");
        Ok(())
    }

    fn persist(&self, list: &[UploadRecord]) -> Result<(), AppError> {
        let content = serde_json::to_vec_pretty(list)
            .map_err(|e| AppError::FileSystem(format!("序列化历史记录失败: {}", e)))?;
        write_atomic(&self.path, &content)
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, AppError> {
        self.write_lock
            .lock()
            .map_err(|_| AppError::FileSystem("历史记录写锁已中毒".to_string()))
    }
}
