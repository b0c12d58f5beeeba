//! 配额拆分与合并
//!
//! 将超出单项配额的映射按插入顺序贪心拆成若干块，键为 `_<字段><序号>`

use serde_json::Value;

/// 存储层使用的 JSON 映射（保持插入顺序）
pub type JsonMap = serde_json::Map<String, Value>;

/// 紧凑 JSON 的字节数
pub fn json_bytes(value: &Value) -> usize {
    serde_json::to_vec(value).map(|bytes| bytes.len()).unwrap_or(0)
}

/// 单个条目在对象中占用的字节数（`"key":value`）
fn entry_bytes(key: &str, value: &Value) -> usize {
    json_bytes(&Value::String(key.to_string())) + 1 + json_bytes(value)
}

/// 按插入顺序贪心拆分
///
/// 加入下一个条目会使当前块超过 `max_bytes` 时先关闭当前块；
/// 单个超限条目独占一块。空映射得到一个空块。
pub fn split(mapping: &JsonMap, max_bytes: usize) -> Vec<JsonMap> {
    let mut chunks = Vec::new();
    let mut current = JsonMap::new();
    let mut current_bytes = 2;

    for (key, value) in mapping {
        let entry = entry_bytes(key, value);
        let mut added = if current.is_empty() { entry } else { entry + 1 };

        if !current.is_empty() && current_bytes + added > max_bytes {
            chunks.push(std::mem::take(&mut current));
            current_bytes = 2;
            added = entry;
        }

        current.insert(key.clone(), value.clone());
        current_bytes += added;
    }

    chunks.push(current);
    chunks
}

/// 按块顺序合并
pub fn combine(chunks: &[JsonMap]) -> JsonMap {
    let mut combined = JsonMap::new();
    for chunk in chunks {
        for (key, value) in chunk {
            combined.insert(key.clone(), value.clone());
        }
    }
    combined
}

/// 块键名
pub fn chunk_key(field: &str, index: usize) -> String {
    format!("_{}{}", field, index)
}

/// 解析块键的序号
pub fn chunk_index(key: &str, field: &str) -> Option<usize> {
    let digits = key.strip_prefix('_')?.strip_prefix(field)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// 已存在的块键，按序号升序
pub fn container_keys<'a, I>(keys: I, field: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut found: Vec<(usize, String)> = keys
        .into_iter()
        .filter_map(|key| chunk_index(key, field).map(|index| (index, key.clone())))
        .collect();
    found.sort_by_key(|(index, _)| *index);
    found.into_iter().map(|(_, key)| key).collect()
}

/// 把根中的块合并到 `root[field]`，删除块键并返回它们
pub fn combine_data(root: &mut JsonMap, field: &str) -> Vec<String> {
    let keys = container_keys(root.keys(), field);
    if keys.is_empty() {
        return keys;
    }

    let mut chunks = Vec::with_capacity(keys.len());
    for key in &keys {
        match root.remove(key) {
            Some(Value::Object(chunk)) => chunks.push(chunk),
            Some(other) => tracing::warn!("块 {} 不是对象，已忽略: {}", key, other),
            None => {}
        }
    }

    root.insert(field.to_string(), Value::Object(combine(&chunks)));
    keys
}

/// 拆分 `root[field]`，返回块键到块的映射
pub fn split_data(root: &JsonMap, field: &str, max_bytes: usize) -> JsonMap {
    let empty = JsonMap::new();
    let mapping = match root.get(field) {
        Some(Value::Object(mapping)) => mapping,
        _ => &empty,
    };

    split(mapping, max_bytes)
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| (chunk_key(field, index), Value::Object(chunk)))
        .collect()
}
