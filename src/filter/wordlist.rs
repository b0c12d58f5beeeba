//! 词表
//!
//! 按词表编号筛选词条，并按长度降序排列，保证最具体的词条优先匹配

use std::sync::Arc;

use indexmap::IndexMap;

use super::word::Word;
use crate::config::WordConfig;
use crate::error::helpers::log_error;

/// 词表
#[derive(Debug, Clone, Default)]
pub struct Wordlist {
    pub id: u32,
    words: Vec<Arc<Word>>,
}

impl Wordlist {
    /// 从完整词条表构建，编号 0 包含全部词条
    pub fn new(id: u32, words: &IndexMap<String, WordConfig>) -> Self {
        let mut list: Vec<Arc<Word>> = Vec::with_capacity(words.len());

        for (value, cfg) in words {
            let in_list = id == 0 || cfg.lists.is_empty() || cfg.lists.contains(&id);
            if !in_list {
                continue;
            }

            match Word::new(value, cfg) {
                Ok(word) => list.push(Arc::new(word)),
                Err(e) => log_error(&e.with_context(format!("词表 {}", id))),
            }
        }

        // 稳定排序，同长度保持插入顺序
        list.sort_by(|a, b| b.len().cmp(&a.len()));

        tracing::debug!("构建词表 {}: {} 个词条", id, list.len());
        Self { id, words: list }
    }

    /// 按词条文本查找
    pub fn find(&self, value: &str) -> Option<&Arc<Word>> {
        self.words.iter().find(|word| word.value == value)
    }

    /// 按位置获取
    pub fn get(&self, index: usize) -> Option<&Arc<Word>> {
        self.words.get(index)
    }

    pub fn words(&self) -> &[Arc<Word>] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
