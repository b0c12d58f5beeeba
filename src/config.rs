//! 过滤配置管理模块
//!
//! 词条、域名与全局选项的配置根，支持 TOML 文件和环境变量覆盖

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::audio::sites::AudioSite;
use crate::env::{storage, EnvVar};
use crate::error::{FilterError, FilterResult};

/// 过滤配置常量
pub mod constants {
    /// 存储后端单项字节上限
    pub const QUOTA_BYTES_PER_ITEM: usize = 8192;
    /// 拆分字段的默认单块字节上限
    pub const DEFAULT_MAX_BYTES: usize = 6500;
    /// 为块键（如 `_domains12`）预留的字节数
    pub const CHUNK_KEY_RESERVE: usize = 16;
    /// 需要按配额拆分保存的字段
    pub const SPLIT_FIELDS: &[&str] = &["domains", "words"];

    pub const DEFAULT_SUBSTITUTION: &str = "censored";
    pub const DEFAULT_CENSOR_CHARACTER: &str = "*";

    /// 内置词条: (词, 匹配方式, 替换词)
    pub const DEFAULT_WORDS: &[(&str, super::MatchMethod, &str)] = {
        use super::MatchMethod::{Exact, Partial};
        &[
            ("ass", Exact, "butt"),
            ("asses", Exact, "butts"),
            ("asshole", Partial, "butthole"),
            ("badass", Exact, "cool"),
            ("bastard", Partial, "imperfect"),
            ("bitch", Partial, "jerk"),
            ("dammit", Partial, "dangit"),
            ("damn", Partial, "dang"),
            ("dumbass", Exact, "idiot"),
            ("fuck", Partial, "freak"),
            ("goddammit", Partial, "dangit"),
            ("hell", Exact, "heck"),
            ("jackass", Partial, "jerk"),
            ("piss", Partial, "pee"),
            ("pissed", Partial, "ticked"),
            ("shit", Partial, "crap"),
            ("slut", Partial, "tramp"),
            ("whore", Partial, "tramp"),
            ("wtf", Exact, "wth"),
        ]
    };
}

/// 词条匹配方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    /// 整词匹配
    #[default]
    Exact,
    /// 任意位置匹配
    Partial,
    /// 匹配包含词条的整个单词
    Whole,
    /// 原样作为正则表达式
    Regex,
}

/// 命中后的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMethod {
    Censor,
    #[default]
    Substitute,
    Remove,
}

/// 静音方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MuteMethod {
    #[default]
    #[serde(rename = "mute-tab")]
    MuteTab,
    #[serde(rename = "mute-media-element")]
    MuteMedia,
}

/// 字幕显示模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShowSubtitles {
    #[default]
    ShowAll,
    FilteredOnly,
    UnfilteredOnly,
    HideAll,
}

/// 单个词条配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WordConfig {
    pub match_method: MatchMethod,
    pub repeat: bool,
    pub separators: bool,
    /// 所属词表，空表示属于全部词表
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lists: Vec<u32>,
    /// 替换词，空表示使用全局默认替换词
    pub sub: String,
}

impl WordConfig {
    pub fn new(match_method: MatchMethod, sub: &str) -> Self {
        Self {
            match_method,
            repeat: true,
            separators: false,
            lists: Vec::new(),
            sub: sub.to_string(),
        }
    }
}

/// 单个域名配置，未设置的字段不参与序列化
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomainConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adv: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wordlist: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_list: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enabled_pages: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disabled_pages: Vec<String>,
}

impl DomainConfig {
    /// 没有任何需要保存的字段
    pub fn is_empty(&self) -> bool {
        self == &DomainConfig::default()
    }
}

/// 配置根
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub default_substitution: String,
    pub default_word_match_method: MatchMethod,
    pub default_word_repeat: bool,
    pub default_word_separators: bool,
    pub filter_method: FilterMethod,
    pub censor_character: String,
    pub censor_fixed_length: usize,
    pub preserve_first: bool,
    pub preserve_last: bool,
    pub preserve_case: bool,
    pub wordlist_id: u32,
    pub audio_wordlist_id: u32,
    pub mute_audio: bool,
    pub mute_method: MuteMethod,
    pub show_subtitles: ShowSubtitles,
    pub show_counter: bool,
    pub show_summary: bool,
    #[serde(rename = "youTubeAutoSubsMin")]
    pub youtube_auto_subs_min: f64,
    pub max_bytes: usize,
    pub enabled_domains_only: bool,
    pub words: IndexMap<String, WordConfig>,
    pub domains: IndexMap<String, DomainConfig>,
    pub custom_audio_sites: IndexMap<String, AudioSite>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_substitution: constants::DEFAULT_SUBSTITUTION.to_string(),
            default_word_match_method: MatchMethod::Exact,
            default_word_repeat: false,
            default_word_separators: false,
            filter_method: FilterMethod::Substitute,
            censor_character: constants::DEFAULT_CENSOR_CHARACTER.to_string(),
            censor_fixed_length: 0,
            preserve_first: true,
            preserve_last: false,
            preserve_case: true,
            wordlist_id: 0,
            audio_wordlist_id: 0,
            mute_audio: false,
            mute_method: MuteMethod::MuteTab,
            show_subtitles: ShowSubtitles::ShowAll,
            show_counter: true,
            show_summary: true,
            youtube_auto_subs_min: 0.0,
            max_bytes: constants::DEFAULT_MAX_BYTES,
            enabled_domains_only: false,
            words: default_words(),
            domains: IndexMap::new(),
            custom_audio_sites: IndexMap::new(),
        }
    }
}

/// 内置词条表
pub fn default_words() -> IndexMap<String, WordConfig> {
    constants::DEFAULT_WORDS
        .iter()
        .map(|(word, method, sub)| (word.to_string(), WordConfig::new(*method, sub)))
        .collect()
}

impl Config {
    /// 从 TOML 文本解析，缺省字段取默认值
    pub fn from_toml_str(source: &str) -> FilterResult<Self> {
        let config: Config = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载
    pub fn load_file<P: AsRef<Path>>(path: P) -> FilterResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| {
            FilterError::ConfigError(format!("无法读取配置文件 {}: {}", path.display(), e))
        })?;
        tracing::debug!("加载配置文件: {}", path.display());
        Self::from_toml_str(&source)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> FilterResult<String> {
        Ok(toml::to_string(self)?)
    }

    /// 应用环境变量覆盖
    pub fn apply_env(&mut self) -> FilterResult<()> {
        if std::env::var(storage::MaxBytes::NAME).is_ok() {
            self.max_bytes = storage::MaxBytes::get()?;
        }
        self.validate()
    }

    /// 验证配置
    pub fn validate(&self) -> FilterResult<()> {
        if self.censor_character.chars().count() != 1 {
            return Err(FilterError::ConfigError(format!(
                "censorCharacter 必须是单个字符: '{}'",
                self.censor_character
            )));
        }
        if self.max_bytes == 0 {
            return Err(FilterError::ConfigError("maxBytes 必须大于 0".to_string()));
        }
        let limit = constants::QUOTA_BYTES_PER_ITEM - constants::CHUNK_KEY_RESERVE;
        if self.max_bytes > limit {
            return Err(FilterError::ConfigError(format!(
                "maxBytes 不能超过 {}: {}",
                limit, self.max_bytes
            )));
        }
        if self.youtube_auto_subs_min < 0.0 {
            return Err(FilterError::ConfigError(
                "youTubeAutoSubsMin 不能为负数".to_string(),
            ));
        }
        Ok(())
    }

    /// 添加词条，已存在时返回 false
    pub fn add_word(&mut self, text: &str) -> bool {
        let options = WordConfig {
            match_method: self.default_word_match_method,
            repeat: self.default_word_repeat,
            separators: self.default_word_separators,
            lists: Vec::new(),
            sub: String::new(),
        };
        self.add_word_with(text, options)
    }

    /// 按指定选项添加词条
    pub fn add_word_with(&mut self, text: &str, options: WordConfig) -> bool {
        let key = normalize_word(text, options.match_method);
        if key.is_empty() || self.words.contains_key(&key) {
            return false;
        }
        self.words.insert(key, options);
        true
    }

    /// 删除词条，不存在时返回 false
    pub fn remove_word(&mut self, text: &str) -> bool {
        let trimmed = text.trim();
        if self.words.shift_remove(trimmed).is_some() {
            return true;
        }
        self.words.shift_remove(&trimmed.to_lowercase()).is_some()
    }
}

fn normalize_word(text: &str, match_method: MatchMethod) -> String {
    let trimmed = text.trim();
    match match_method {
        MatchMethod::Regex => trimmed.to_string(),
        _ => trimmed.to_lowercase(),
    }
}
