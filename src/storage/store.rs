//! 配置存储
//!
//! 加载时合并拆分字段，保存时拆分写入并清理过期块

use serde_json::Value;

use super::quota::{chunk_index, combine_data, container_keys, split, JsonMap};
use super::StorageBackend;
use crate::config::constants::SPLIT_FIELDS;
use crate::config::Config;
use crate::error::{FilterError, FilterResult};

/// 基于键值后端的配置存储
#[derive(Debug)]
pub struct ConfigStore<B: StorageBackend> {
    backend: B,
}

impl<B: StorageBackend> ConfigStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 读取完整配置，缺失字段取默认值
    pub fn load(&self) -> FilterResult<Config> {
        let mut root = self.backend.get(None)?;
        for field in SPLIT_FIELDS {
            let combined = combine_data(&mut root, field);
            if !combined.is_empty() {
                tracing::debug!("合并 {} 的 {} 个存储块", field, combined.len());
            }
        }

        let config: Config = serde_json::from_value(Value::Object(root))
            .map_err(|e| FilterError::from(e).with_context("读取存储配置"))?;
        config.validate()?;
        Ok(config)
    }

    /// 保存全部字段
    pub fn save(&mut self, cfg: &Config) -> FilterResult<()> {
        self.save_fields(cfg, None)
    }

    /// 保存指定字段，`None` 表示全部
    pub fn save_fields(&mut self, cfg: &Config, fields: Option<&[&str]>) -> FilterResult<()> {
        let root = match serde_json::to_value(cfg)? {
            Value::Object(root) => root,
            other => {
                return Err(FilterError::SerializationError(format!(
                    "配置必须序列化为对象: {}",
                    other
                )))
            }
        };

        let existing = self.backend.keys()?;
        let mut items = JsonMap::new();
        let mut stale: Vec<String> = Vec::new();

        for (key, value) in root {
            if let Some(fields) = fields {
                if !fields.contains(&key.as_str()) {
                    continue;
                }
            }

            if !SPLIT_FIELDS.contains(&key.as_str()) {
                items.insert(key, value);
                continue;
            }

            let mapping = match value {
                Value::Object(mapping) => mapping,
                _ => JsonMap::new(),
            };
            let chunks = split(&mapping, cfg.max_bytes);
            let chunk_count = chunks.len();
            for (index, chunk) in chunks.into_iter().enumerate() {
                items.insert(super::quota::chunk_key(&key, index), Value::Object(chunk));
            }

            stale.extend(
                container_keys(&existing, &key)
                    .into_iter()
                    .filter(|old| chunk_index(old, &key).is_some_and(|i| i >= chunk_count)),
            );
            if existing.contains(&key) {
                stale.push(key);
            }
        }

        self.backend.set(items)?;
        if !stale.is_empty() {
            tracing::debug!("删除过期存储块: {:?}", stale);
            self.backend.remove(&stale)?;
        }
        Ok(())
    }
}
