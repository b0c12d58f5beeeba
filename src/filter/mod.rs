//! 过滤引擎
//!
//! 按词表顺序（最长优先）匹配词条并生成替换文本，同时维护命中计数与摘要

pub mod word;
pub mod wordlist;

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::{Config, FilterMethod, MatchMethod, WordConfig};

pub use word::Word;
pub use wordlist::Wordlist;

/// 单次替换结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceResult {
    pub original: String,
    pub filtered: String,
    pub modified: bool,
}

impl ReplaceResult {
    fn new(original: &str, filtered: String) -> Self {
        Self {
            modified: filtered != original,
            original: original.to_string(),
            filtered,
        }
    }
}

/// 摘要条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub filtered: String,
    pub count: u64,
}

/// 替换相关的配置快照
#[derive(Debug, Clone)]
pub struct FilterOptions {
    pub filter_method: FilterMethod,
    pub default_substitution: String,
    pub censor_character: String,
    pub censor_fixed_length: usize,
    pub preserve_first: bool,
    pub preserve_last: bool,
    pub preserve_case: bool,
    pub show_summary: bool,
}

impl From<&Config> for FilterOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            filter_method: cfg.filter_method,
            default_substitution: cfg.default_substitution.clone(),
            censor_character: cfg.censor_character.clone(),
            censor_fixed_length: cfg.censor_fixed_length,
            preserve_first: cfg.preserve_first,
            preserve_last: cfg.preserve_last,
            preserve_case: cfg.preserve_case,
            show_summary: cfg.show_summary,
        }
    }
}

/// 命中统计
#[derive(Debug, Clone, Default)]
pub struct FilterStats {
    pub counter: u64,
    pub summary: IndexMap<String, SummaryEntry>,
}

/// 过滤引擎
#[derive(Debug, Clone)]
pub struct Filter {
    options: FilterOptions,
    words: IndexMap<String, WordConfig>,
    wordlists: HashMap<u32, Wordlist>,
    wordlist_id: u32,
    audio_wordlist_id: u32,
    stats: FilterStats,
}

impl Filter {
    /// 创建新的过滤引擎
    pub fn new(cfg: &Config) -> Self {
        let mut filter = Self {
            options: FilterOptions::from(cfg),
            words: cfg.words.clone(),
            wordlists: HashMap::new(),
            wordlist_id: cfg.wordlist_id,
            audio_wordlist_id: cfg.audio_wordlist_id,
            stats: FilterStats::default(),
        };
        filter.init(None);
        filter
    }

    /// 选择文本词表，未指定时使用全局词表
    pub fn init(&mut self, wordlist_id: Option<u32>) {
        if let Some(id) = wordlist_id {
            self.wordlist_id = id;
        }
        self.build_wordlist(self.wordlist_id);
    }

    /// 选择字幕词表
    pub fn init_audio(&mut self, audio_wordlist_id: Option<u32>) {
        if let Some(id) = audio_wordlist_id {
            self.audio_wordlist_id = id;
        }
        self.build_wordlist(self.audio_wordlist_id);
    }

    /// 配置变化后重建全部词表，统计保留
    pub fn reload(&mut self, cfg: &Config) {
        self.options = FilterOptions::from(cfg);
        self.words = cfg.words.clone();
        self.wordlists.clear();
        self.build_wordlist(self.wordlist_id);
        self.build_wordlist(self.audio_wordlist_id);
    }

    fn build_wordlist(&mut self, id: u32) {
        let list = Wordlist::new(id, &self.words);
        self.wordlists.insert(id, list);
    }

    pub fn wordlist_id(&self) -> u32 {
        self.wordlist_id
    }

    pub fn audio_wordlist_id(&self) -> u32 {
        self.audio_wordlist_id
    }

    /// 当前文本词表的词条（最长优先）
    pub fn active_words(&self) -> Vec<Arc<Word>> {
        self.wordlists
            .get(&self.wordlist_id)
            .map(|list| list.words().to_vec())
            .unwrap_or_default()
    }

    /// 用当前文本词表替换
    pub fn replace_text(&mut self, text: &str, stats: bool) -> String {
        self.replace_text_with(text, self.wordlist_id, stats)
    }

    /// 用指定词表替换
    pub fn replace_text_with(&mut self, text: &str, wordlist_id: u32, stats: bool) -> String {
        if !self.wordlists.contains_key(&wordlist_id) {
            self.build_wordlist(wordlist_id);
        }

        let Filter {
            options,
            wordlists,
            stats: filter_stats,
            ..
        } = self;
        let Some(list) = wordlists.get(&wordlist_id) else {
            return text.to_string();
        };

        let recorder = if stats { Some(filter_stats) } else { None };
        apply_words(list.words(), text, options, recorder)
    }

    pub fn replace_text_result(&mut self, text: &str) -> ReplaceResult {
        let filtered = self.replace_text(text, true);
        ReplaceResult::new(text, filtered)
    }

    /// 字幕文本使用字幕词表
    pub fn replace_audio_text_result(&mut self, text: &str) -> ReplaceResult {
        let filtered = self.replace_text_with(text, self.audio_wordlist_id, true);
        ReplaceResult::new(text, filtered)
    }

    pub fn counter(&self) -> u64 {
        self.stats.counter
    }

    pub fn summary(&self) -> &IndexMap<String, SummaryEntry> {
        &self.stats.summary
    }
}

/// 按词表顺序依次替换
fn apply_words(
    words: &[Arc<Word>],
    text: &str,
    options: &FilterOptions,
    mut stats: Option<&mut FilterStats>,
) -> String {
    let mut current = text.to_string();
    for word in words {
        if let Some(next) = replace_word(words, word, &current, options, stats.as_deref_mut()) {
            current = next;
        }
    }
    current
}

/// 对单个词条执行全部替换，无命中时返回 None
fn replace_word(
    words: &[Arc<Word>],
    word: &Word,
    text: &str,
    options: &FilterOptions,
    mut stats: Option<&mut FilterStats>,
) -> Option<String> {
    let mut result = String::with_capacity(text.len());
    let mut last = 0;
    let mut found = false;

    for m in word.regex.find_iter(text) {
        if m.start() == m.end() || m.start() < last {
            continue;
        }
        found = true;
        result.push_str(&text[last..m.start()]);

        if let Some(stats) = stats.as_deref_mut() {
            record_match(words, word, options, stats);
        }

        let replacement = replacement_for(word, m.as_str(), options);
        last = m.end();

        if options.filter_method == FilterMethod::Remove && removes_whole_words(word) {
            let next = text[last..].chars().next();
            let before_is_space = m.start() == 0 || result.ends_with(char::is_whitespace);
            match next {
                Some(c) if c.is_whitespace() && before_is_space => last += c.len_utf8(),
                None if result.ends_with(char::is_whitespace) => {
                    result.pop();
                }
                _ => {}
            }
        }

        result.push_str(&replacement);
    }

    if !found {
        return None;
    }
    result.push_str(&text[last..]);
    Some(result)
}

fn removes_whole_words(word: &Word) -> bool {
    !matches!(word.match_method, MatchMethod::Partial | MatchMethod::Regex)
}

/// 摘要中的替换文本为整个词表作用于词条本身的结果
fn record_match(words: &[Arc<Word>], word: &Word, options: &FilterOptions, stats: &mut FilterStats) {
    stats.counter += 1;
    if !options.show_summary {
        return;
    }

    if let Some(entry) = stats.summary.get_mut(&word.value) {
        entry.count += 1;
    } else {
        let filtered = match word.match_method {
            MatchMethod::Regex => substitution(word, options).to_string(),
            _ => apply_words(words, &word.value, options, None),
        };
        stats
            .summary
            .insert(word.value.clone(), SummaryEntry { filtered, count: 1 });
    }
}

fn substitution<'a>(word: &'a Word, options: &'a FilterOptions) -> &'a str {
    if word.sub.is_empty() {
        &options.default_substitution
    } else {
        &word.sub
    }
}

/// 计算匹配文本的替换结果
pub fn replacement_for(word: &Word, matched: &str, options: &FilterOptions) -> String {
    match options.filter_method {
        FilterMethod::Remove => String::new(),
        FilterMethod::Censor => censor(matched, options),
        FilterMethod::Substitute => {
            let sub = substitution(word, options);
            if options.preserve_case && word.match_method != MatchMethod::Regex {
                apply_case(matched, sub)
            } else {
                sub.to_string()
            }
        }
    }
}

fn censor(matched: &str, options: &FilterOptions) -> String {
    let chars: Vec<char> = matched.chars().collect();
    let fixed = options.censor_fixed_length;
    let mut count = if fixed > 0 { fixed } else { chars.len() };
    let mut prefix = String::new();
    let mut suffix = String::new();

    if options.preserve_first {
        if let Some(first) = chars.first() {
            prefix.push(*first);
            if fixed == 0 {
                count = count.saturating_sub(1);
            }
        }
    }
    if options.preserve_last && chars.len() > 1 {
        if let Some(last) = chars.last() {
            suffix.push(*last);
            if fixed == 0 {
                count = count.saturating_sub(1);
            }
        }
    }

    format!("{}{}{}", prefix, options.censor_character.repeat(count), suffix)
}

fn apply_case(matched: &str, sub: &str) -> String {
    let letters: Vec<char> = matched.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()) {
        return sub.to_uppercase();
    }

    match (letters.first(), sub.chars().next()) {
        (Some(first), Some(sub_first)) if first.is_uppercase() => {
            let mut capitalized: String = sub_first.to_uppercase().collect();
            capitalized.push_str(&sub[sub_first.len_utf8()..]);
            capitalized
        }
        _ => sub.to_string(),
    }
}
