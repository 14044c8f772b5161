//! 上传历史模块
//!
//! # 设计思路
//!
//! 历史记录是一个有上限（100 条）、按时间倒序的扁平列表，整体序列化为
//! 共享容器中的 `history.json`。宿主应用与分享扩展各自读写同一个文件，
//! 因此每次修改都“重新读取 → 修改 → 原子替换”，不在内存里长期缓存。
//!
//! # 模块职责
//!
//! | 子模块 | 职责 |
//! |------|------|
//! | `list` | 纯函数：插入去重、截断、按 id 删除 |
//! | `store` | `HistoryStore`：文件读写与进程内串行化 |

use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod list;
mod store;

pub use list::{insert_front, remove_by_id};
pub use store::HistoryStore;

/// 历史记录上限。
pub const MAX_HISTORY_ENTRIES: usize = 100;

// ============================================================================
// 数据模型
// ============================================================================

/// 一次成功上传的元数据。
///
/// 相等性与哈希只看 `id`。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub id: String,
    pub url: String,
    pub delete_url: String,
    /// 小尺寸 JPEG 缩略图，生成失败时为空。
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub thumbnail_data: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
}

impl PartialEq for UploadRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for UploadRecord {}

impl Hash for UploadRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// 缩略图在 JSON 中以标准 Base64 字符串存储。
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_str(&general_purpose::STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Option::<String>::deserialize(deserializer)?;
        encoded
            .map(|text| {
                general_purpose::STANDARD
                    .decode(text.as_bytes())
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, url: &str) -> UploadRecord {
        UploadRecord {
            id: id.to_string(),
            url: url.to_string(),
            delete_url: format!("https://h/delete/{}", id),
            thumbnail_data: Some(vec![0xFF, 0xD8, 0xFF, 0x00]),
            created_at: Utc::now(),
            original_filename: Some("photo.png".to_string()),
        }
    }

    #[test]
    fn equality_is_by_id_only() {
        assert_eq!(record("x1", "https://a"), record("x1", "https://b"));
        assert_ne!(record("x1", "https://a"), record("x2", "https://a"));
    }

    #[test]
    fn json_uses_camel_case_and_base64_thumbnail() {
        let value = serde_json::to_value(record("x1", "https://h/x1.png")).expect("serialize");

        assert_eq!(value["deleteUrl"], "https://h/delete/x1");
        assert_eq!(value["thumbnailData"], "/9j/AA==");
        assert_eq!(value["originalFilename"], "photo.png");
        assert!(value.get("createdAt").and_then(|v| v.as_str()).is_some());
        assert!(value.get("delete_url").is_none());
    }

    #[test]
    fn missing_optional_fields_deserialize() {
        let json = r#"{"id":"a","url":"https://h/a","deleteUrl":"https://h/d/a","createdAt":"2025-01-02T03:04:05Z"}"#;
        let parsed: UploadRecord = serde_json::from_str(json).expect("deserialize");

        assert_eq!(parsed.thumbnail_data, None);
        assert_eq!(parsed.original_filename, None);
        assert_eq!(parsed.created_at.to_rfc3339(), "2025-01-02T03:04:05+00:00");
    }
}
