//! 配置存储
//!
//! 键值存储后端接口、单项配额检查以及拆分保存的配置存储

pub mod disk;
pub mod quota;
pub mod store;

use serde_json::Value;

use crate::config::constants::QUOTA_BYTES_PER_ITEM;
use crate::error::{FilterError, FilterResult};

pub use disk::RedbStorage;
pub use quota::JsonMap;
pub use store::ConfigStore;

/// 键值存储后端
pub trait StorageBackend {
    /// 读取指定键，`None` 表示全部
    fn get(&self, keys: Option<&[String]>) -> FilterResult<JsonMap>;

    /// 写入条目，任一条目超出配额时整体失败
    fn set(&mut self, items: JsonMap) -> FilterResult<()>;

    fn remove(&mut self, keys: &[String]) -> FilterResult<()>;

    fn keys(&self) -> FilterResult<Vec<String>> {
        Ok(self.get(None)?.keys().cloned().collect())
    }

    fn quota_bytes_per_item(&self) -> usize {
        QUOTA_BYTES_PER_ITEM
    }
}

/// 单项占用字节数：键长加紧凑 JSON 值长度
pub fn item_bytes(key: &str, value: &Value) -> usize {
    key.len() + quota::json_bytes(value)
}

/// 检查全部条目是否在配额内
pub fn check_quota(items: &JsonMap, limit: usize) -> FilterResult<()> {
    for (key, value) in items {
        let bytes = item_bytes(key, value);
        if bytes > limit {
            return Err(FilterError::QuotaExceeded {
                key: key.clone(),
                bytes,
                limit,
            });
        }
    }
    Ok(())
}

/// 内存存储
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    items: JsonMap,
    quota: usize,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::with_quota(QUOTA_BYTES_PER_ITEM)
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            items: JsonMap::new(),
            quota,
        }
    }

    pub fn items(&self) -> &JsonMap {
        &self.items
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, keys: Option<&[String]>) -> FilterResult<JsonMap> {
        Ok(match keys {
            None => self.items.clone(),
            Some(keys) => keys
                .iter()
                .filter_map(|key| self.items.get(key).map(|v| (key.clone(), v.clone())))
                .collect(),
        })
    }

    fn set(&mut self, items: JsonMap) -> FilterResult<()> {
        check_quota(&items, self.quota)?;
        for (key, value) in items {
            self.items.insert(key, value);
        }
        Ok(())
    }

    fn remove(&mut self, keys: &[String]) -> FilterResult<()> {
        for key in keys {
            self.items.shift_remove(key);
        }
        Ok(())
    }

    fn quota_bytes_per_item(&self) -> usize {
        self.quota
    }
}
