//! 域名策略解析
//!
//! 根据主机名找到最具体的域名配置，并结合页面路径决定是否过滤

use indexmap::IndexMap;
use regex::Regex;

use crate::config::{Config, DomainConfig};

/// 域名策略
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Domain {
    pub cfg_key: String,
    pub hostname: Option<String>,
    pub advanced: bool,
    pub disabled: bool,
    pub enabled: bool,
    pub wordlist_id: Option<u32>,
    pub audio_wordlist_id: Option<u32>,
    pub enabled_pages: PagePatterns,
    pub disabled_pages: PagePatterns,
}

/// 编译后的页面模式
///
/// 模式中 `*` 匹配任意字符序列，其他字符按字面匹配，区分大小写，要求整条路径匹配。
#[derive(Debug, Clone, Default)]
pub struct PagePatterns {
    sources: Vec<String>,
    compiled: Vec<Regex>,
}

impl PagePatterns {
    pub fn new(sources: &[String]) -> Self {
        let compiled = sources
            .iter()
            .filter_map(|pattern| glob_regex(pattern.strip_prefix('/').unwrap_or(pattern)))
            .collect();
        Self {
            sources: sources.to_vec(),
            compiled,
        }
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// 路径是否匹配任一模式
    pub fn matches(&self, path: &str) -> bool {
        let path = path.strip_prefix('/').unwrap_or(path);
        self.compiled.iter().any(|regex| regex.is_match(path))
    }
}

impl PartialEq for PagePatterns {
    fn eq(&self, other: &Self) -> bool {
        self.sources == other.sources
    }
}

impl Domain {
    /// 找到与主机名匹配的最长配置键
    ///
    /// 键必须等于主机名，或者是主机名在点边界上的后缀。
    pub fn find_domain_key<'a, I>(hostname: &str, keys: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a String>,
    {
        keys.into_iter()
            .map(String::as_str)
            .filter(|key| !key.is_empty() && host_matches(hostname, key))
            .fold(None, |best: Option<&'a str>, key| match best {
                Some(current) if current.len() >= key.len() => Some(current),
                _ => Some(key),
            })
    }

    /// 按主机名解析，未配置时返回以主机名为键的空策略
    pub fn by_hostname(hostname: &str, domains: &IndexMap<String, DomainConfig>) -> Self {
        let key = Self::find_domain_key(hostname, domains.keys()).unwrap_or(hostname);
        let mut domain = Self::by_key(key, domains);
        domain.hostname = Some(hostname.to_string());
        domain
    }

    /// 按配置键解析
    pub fn by_key(key: &str, domains: &IndexMap<String, DomainConfig>) -> Self {
        match domains.get(key) {
            Some(cfg) => Self::new(key, cfg),
            None => Self::new(key, &DomainConfig::default()),
        }
    }

    pub fn new(key: &str, cfg: &DomainConfig) -> Self {
        let mut domain = Self {
            cfg_key: key.to_string(),
            ..Default::default()
        };
        domain.update_from_cfg(cfg);
        domain
    }

    /// 按可注册域名（最后两段）排序的配置键
    pub fn sorted_keys(domains: &IndexMap<String, DomainConfig>) -> Vec<String> {
        let mut keys: Vec<String> = domains.keys().cloned().collect();
        keys.sort_by(|a, b| registrable(a).cmp(registrable(b)));
        keys
    }

    pub fn update_from_cfg(&mut self, cfg: &DomainConfig) {
        self.advanced = cfg.adv.unwrap_or(false);
        self.disabled = cfg.disabled.unwrap_or(false);
        self.enabled = cfg.enabled.unwrap_or(false);
        self.wordlist_id = cfg.wordlist;
        self.audio_wordlist_id = cfg.audio_list;
        self.enabled_pages = PagePatterns::new(&cfg.enabled_pages);
        self.disabled_pages = PagePatterns::new(&cfg.disabled_pages);
    }

    /// 生成需要保存的记录，未开启的开关不写入
    pub fn to_cfg(&self) -> DomainConfig {
        DomainConfig {
            adv: self.advanced.then_some(true),
            disabled: self.disabled.then_some(true),
            enabled: self.enabled.then_some(true),
            wordlist: self.wordlist_id,
            audio_list: self.audio_wordlist_id,
            enabled_pages: self.enabled_pages.sources().to_vec(),
            disabled_pages: self.disabled_pages.sources().to_vec(),
        }
    }

    /// 写回配置，记录为空时删除该键
    pub fn save(&self, cfg: &mut Config) {
        let record = self.to_cfg();
        if record.is_empty() {
            cfg.domains.shift_remove(&self.cfg_key);
        } else {
            cfg.domains.insert(self.cfg_key.clone(), record);
        }
    }

    /// 切换过滤开关，白名单模式下切换 enabled
    pub fn toggle_disabled(&mut self, enabled_domains_only: bool) {
        if enabled_domains_only {
            self.enabled = !self.enabled;
        } else {
            self.disabled = !self.disabled;
        }
    }

    pub fn toggle_advanced(&mut self) {
        self.advanced = !self.advanced;
    }

    /// 判断路径所在页面是否停用过滤
    pub fn page_disabled(&self, path: &str, enabled_domains_only: bool) -> bool {
        let base_disabled = if enabled_domains_only {
            !self.enabled
        } else {
            self.disabled
        };

        if base_disabled {
            !self.enabled_pages.matches(path)
        } else {
            self.disabled_pages.matches(path)
        }
    }
}

fn host_matches(hostname: &str, key: &str) -> bool {
    if hostname == key {
        return true;
    }
    hostname
        .strip_suffix(key)
        .is_some_and(|prefix| prefix.ends_with('.'))
}

fn registrable(key: &str) -> &str {
    let mut dots = key.rmatch_indices('.');
    dots.next();
    match dots.next() {
        Some((index, _)) => &key[index + 1..],
        None => key,
    }
}

fn glob_regex(pattern: &str) -> Option<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("(?s:.*)");
    match Regex::new(&format!("^{}$", body)) {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::warn!("页面模式无效 '{}': {}", pattern, e);
            None
        }
    }
}
