//! 词条
//!
//! 将词条配置编译为大小写不敏感的正则表达式

use regex::Regex;

use crate::config::{MatchMethod, WordConfig};
use crate::error::{FilterError, FilterResult};

/// 字母之间允许出现的分隔符
const SEPARATOR_CLASS: &str = r"[\s\-_.*+=,!?]*";

/// 编译后的词条，配置变化时整体重建
#[derive(Debug, Clone)]
pub struct Word {
    pub value: String,
    pub match_method: MatchMethod,
    pub repeat: bool,
    pub separators: bool,
    pub lists: Vec<u32>,
    pub sub: String,
    pub regex: Regex,
}

impl Word {
    /// 创建新的词条
    pub fn new(value: &str, cfg: &WordConfig) -> FilterResult<Self> {
        let pattern = build_pattern(value, cfg);
        let regex = Regex::new(&pattern).map_err(|e| FilterError::InvalidPattern {
            word: value.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            value: value.to_string(),
            match_method: cfg.match_method,
            repeat: cfg.repeat,
            separators: cfg.separators,
            lists: cfg.lists.clone(),
            sub: cfg.sub.clone(),
            regex,
        })
    }

    /// 词条是否属于指定词表，0 表示全部词表
    pub fn in_list(&self, wordlist_id: u32) -> bool {
        wordlist_id == 0 || self.lists.is_empty() || self.lists.contains(&wordlist_id)
    }

    /// 以字符计的长度
    pub fn len(&self) -> usize {
        self.value.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// 按匹配方式生成正则表达式
pub fn build_pattern(value: &str, cfg: &WordConfig) -> String {
    let token = token_pattern(value, cfg.repeat, cfg.separators);
    let starts_word = value.chars().next().is_some_and(is_word_char);
    let ends_word = value.chars().last().is_some_and(is_word_char);

    match cfg.match_method {
        MatchMethod::Exact => format!(
            "(?i){}{}{}",
            if starts_word { r"\b" } else { "" },
            token,
            if ends_word { r"\b" } else { "" }
        ),
        MatchMethod::Partial => format!("(?i){}", token),
        MatchMethod::Whole => format!(
            "(?i){}{}{}",
            if starts_word { r"\b[\w-]*" } else { "" },
            token,
            if ends_word { r"[\w-]*\b" } else { "" }
        ),
        MatchMethod::Regex => format!("(?i){}", value),
    }
}

fn token_pattern(value: &str, repeat: bool, separators: bool) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut pattern = String::new();

    for (i, c) in chars.iter().enumerate() {
        let mut buf = [0u8; 4];
        pattern.push_str(&regex::escape(c.encode_utf8(&mut buf)));
        if repeat {
            pattern.push('+');
        }
        if separators && i + 1 < chars.len() {
            pattern.push_str(SEPARATOR_CLASS);
        }
    }

    pattern
}

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(value: &str, match_method: MatchMethod, repeat: bool, separators: bool) -> Word {
        let cfg = WordConfig {
            match_method,
            repeat,
            separators,
            ..Default::default()
        };
        Word::new(value, &cfg).unwrap()
    }

    #[test]
    fn test_exact_matches_whole_words_only() {
        let w = word("ass", MatchMethod::Exact, false, false);
        assert!(w.regex.is_match("what an ass"));
        assert!(w.regex.is_match("ASS!"));
        assert!(!w.regex.is_match("class"));
        assert!(!w.regex.is_match("assassin"));
    }

    #[test]
    fn test_exact_without_word_edges() {
        let w = word("$hit", MatchMethod::Exact, false, false);
        assert!(w.regex.is_match("oh $hit"));
        assert!(w.regex.is_match("x$hit"));
    }

    #[test]
    fn test_partial_matches_anywhere() {
        let w = word("damn", MatchMethod::Partial, false, false);
        assert_eq!(w.regex.find("goddamnit").unwrap().as_str(), "damn");
    }

    #[test]
    fn test_whole_expands_to_containing_word() {
        let w = word("fuck", MatchMethod::Whole, false, false);
        assert_eq!(w.regex.find("what the fucking-thing?").unwrap().as_str(), "fucking-thing");
    }

    #[test]
    fn test_repeat_and_separators() {
        let w = word("bad", MatchMethod::Exact, true, false);
        assert_eq!(w.regex.find("so baaaad").unwrap().as_str(), "baaaad");

        let w = word("bad", MatchMethod::Exact, false, true);
        assert_eq!(w.regex.find("so b-a.d").unwrap().as_str(), "b-a.d");
        assert_eq!(w.regex.find("so B a D").unwrap().as_str(), "B a D");
    }

    #[test]
    fn test_special_characters_are_literal() {
        let w = word("a.b", MatchMethod::Partial, false, false);
        assert!(!w.regex.is_match("axb"));
        assert!(w.regex.is_match("A.B"));
    }

    #[test]
    fn test_regex_used_verbatim() {
        let w = word(r"fr[ae]k\w*", MatchMethod::Regex, false, false);
        assert_eq!(w.regex.find("FRAKKING").unwrap().as_str(), "FRAKKING");
    }

    #[test]
    fn test_invalid_regex_is_an_error() {
        let cfg = WordConfig {
            match_method: MatchMethod::Regex,
            ..Default::default()
        };
        let error = Word::new("(unclosed", &cfg).unwrap_err();
        assert!(matches!(error, FilterError::InvalidPattern { .. }));
    }

    #[test]
    fn test_in_list() {
        let mut w = word("heck", MatchMethod::Exact, false, false);
        assert!(w.in_list(3));
        w.lists = vec![1, 2];
        assert!(w.in_list(0));
        assert!(w.in_list(2));
        assert!(!w.in_list(3));
    }
}
