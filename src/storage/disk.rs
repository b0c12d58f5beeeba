//! 磁盘存储
//!
//! 基于 redb 的持久化键值后端，值以紧凑 JSON 字符串保存

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition, TableError};

use super::quota::JsonMap;
use super::{check_quota, StorageBackend};
use crate::config::constants::QUOTA_BYTES_PER_ITEM;
use crate::error::FilterResult;

const SETTINGS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("settings");

/// redb 存储后端
pub struct RedbStorage {
    db: Database,
    quota: usize,
}

impl std::fmt::Debug for RedbStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStorage").field("quota", &self.quota).finish()
    }
}

impl RedbStorage {
    /// 打开或创建数据库文件
    pub fn open<P: AsRef<Path>>(path: P) -> FilterResult<Self> {
        let path = path.as_ref();
        let db = Database::create(path)?;
        tracing::debug!("打开存储数据库: {}", path.display());
        Ok(Self {
            db,
            quota: QUOTA_BYTES_PER_ITEM,
        })
    }

    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = quota;
        self
    }
}

impl StorageBackend for RedbStorage {
    fn get(&self, keys: Option<&[String]>) -> FilterResult<JsonMap> {
        let txn = self.db.begin_read()?;
        let table = match txn.open_table(SETTINGS_TABLE) {
            Ok(table) => table,
            // 尚未写入过任何数据
            Err(TableError::TableDoesNotExist(_)) => return Ok(JsonMap::new()),
            Err(e) => return Err(e.into()),
        };

        let mut items = JsonMap::new();
        match keys {
            None => {
                for entry in table.iter()? {
                    let (key, value) = entry?;
                    items.insert(key.value().to_string(), serde_json::from_str(value.value())?);
                }
            }
            Some(keys) => {
                for key in keys {
                    if let Some(value) = table.get(key.as_str())? {
                        items.insert(key.clone(), serde_json::from_str(value.value())?);
                    }
                }
            }
        }
        Ok(items)
    }

    fn set(&mut self, items: JsonMap) -> FilterResult<()> {
        check_quota(&items, self.quota)?;

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SETTINGS_TABLE)?;
            for (key, value) in &items {
                let json = serde_json::to_string(value)?;
                table.insert(key.as_str(), json.as_str())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    fn remove(&mut self, keys: &[String]) -> FilterResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SETTINGS_TABLE)?;
            for key in keys {
                table.remove(key.as_str())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    fn quota_bytes_per_item(&self) -> usize {
        self.quota
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_table_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("settings.redb")).unwrap();
        assert!(storage.get(None).unwrap().is_empty());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.redb");

        {
            let mut storage = RedbStorage::open(&path).unwrap();
            let mut items = JsonMap::new();
            items.insert("_words0".into(), json!({ "heck": { "sub": "h" } }));
            items.insert("showSummary".into(), json!(false));
            storage.set(items).unwrap();
            storage.remove(&["showSummary".to_string()]).unwrap();
        }

        let storage = RedbStorage::open(&path).unwrap();
        let items = storage.get(None).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items["_words0"]["heck"]["sub"], json!("h"));
    }

    #[test]
    fn test_quota_checked_before_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = RedbStorage::open(dir.path().join("settings.redb"))
            .unwrap()
            .with_quota(16);
        let mut items = JsonMap::new();
        items.insert("big".into(), json!("x".repeat(64)));
        assert!(storage.set(items).is_err());
        assert!(storage.keys().unwrap().is_empty());
    }
}
