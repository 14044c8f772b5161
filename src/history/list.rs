use super::UploadRecord;

/// 插入到列表头部：先移除同 id 旧条目，再截断到 `max_entries`。
pub fn insert_front(list: &mut Vec<UploadRecord>, record: UploadRecord, max_entries: usize) {
    list.retain(|existing| existing.id != record.id);
    list.insert(0, record);
    list.truncate(max_entries);
}

/// 按 id 删除，返回是否真的删除了条目。
pub fn remove_by_id(list: &mut Vec<UploadRecord>, id: &str) -> bool {
    let before = list.len();
    list.retain(|existing| existing.id != id);
    list.len() != before
}
