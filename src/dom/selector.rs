//! 简单选择器
//!
//! 支持标签、`*`、`.class`、`#id` 以及后代和 `>` 子代组合，其余语法在构建时报错

use super::DocumentTree;
use crate::error::{FilterError, FilterResult};

/// 组合方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// 复合选择器，例如 `span.ttr-cue`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

/// 已解析的选择器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    /// 第一个部分的组合方式不使用
    parts: Vec<(Combinator, Compound)>,
}

impl Selector {
    pub fn parse(source: &str) -> FilterResult<Self> {
        let invalid = |reason: &str| FilterError::InvalidSelector {
            selector: source.to_string(),
            reason: reason.to_string(),
        };

        let mut parts: Vec<(Combinator, Compound)> = Vec::new();
        let mut pending: Option<Combinator> = None;
        let mut chars = source.trim().chars().peekable();

        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
                if pending.is_none() && !parts.is_empty() {
                    pending = Some(Combinator::Descendant);
                }
                continue;
            }

            if c == '>' {
                chars.next();
                if parts.is_empty() || pending == Some(Combinator::Child) {
                    return Err(invalid("'>' 缺少左侧选择器"));
                }
                pending = Some(Combinator::Child);
                continue;
            }

            let mut compound = Compound::default();
            if c == '*' {
                chars.next();
            } else if is_ident_char(c) {
                compound.tag = Some(read_ident(&mut chars).to_lowercase());
            }

            while let Some(&c) = chars.peek() {
                match c {
                    '.' | '#' => {
                        chars.next();
                        let name = read_ident(&mut chars);
                        if name.is_empty() {
                            return Err(invalid("类名或 id 为空"));
                        }
                        if c == '.' {
                            compound.classes.push(name);
                        } else {
                            compound.id = Some(name);
                        }
                    }
                    c if c.is_whitespace() || c == '>' => break,
                    c => return Err(invalid(&format!("不支持的字符 '{}'", c))),
                }
            }

            let combinator = if parts.is_empty() {
                Combinator::Descendant
            } else {
                pending.unwrap_or(Combinator::Descendant)
            };
            parts.push((combinator, compound));
            pending = None;
        }

        if parts.is_empty() {
            return Err(invalid("选择器为空"));
        }
        if pending == Some(Combinator::Child) {
            return Err(invalid("'>' 缺少右侧选择器"));
        }

        Ok(Self {
            source: source.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// 元素是否匹配，祖先链在整个文档中查找
    pub fn matches<D: DocumentTree>(&self, doc: &D, node: &D::Node) -> bool {
        self.matches_at(doc, node, self.parts.len() - 1)
    }

    fn matches_at<D: DocumentTree>(&self, doc: &D, node: &D::Node, index: usize) -> bool {
        let (combinator, compound) = &self.parts[index];
        if !compound_matches(doc, node, compound) {
            return false;
        }
        if index == 0 {
            return true;
        }

        let mut ancestor = parent_element(doc, node);
        match combinator {
            Combinator::Child => ancestor
                .as_ref()
                .is_some_and(|parent| self.matches_at(doc, parent, index - 1)),
            Combinator::Descendant => {
                while let Some(candidate) = ancestor {
                    if self.matches_at(doc, &candidate, index - 1) {
                        return true;
                    }
                    ancestor = parent_element(doc, &candidate);
                }
                false
            }
        }
    }
}

fn compound_matches<D: DocumentTree>(doc: &D, node: &D::Node, compound: &Compound) -> bool {
    let Some(tag) = doc.tag_name(node) else {
        return false;
    };
    if compound.tag.as_ref().is_some_and(|wanted| wanted != &tag) {
        return false;
    }
    if let Some(id) = &compound.id {
        if doc.attribute(node, "id").as_ref() != Some(id) {
            return false;
        }
    }
    compound.classes.iter().all(|class| doc.has_class(node, class))
}

fn parent_element<D: DocumentTree>(doc: &D, node: &D::Node) -> Option<D::Node> {
    doc.parent(node).filter(|parent| doc.is_element(parent))
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn read_ident<I: Iterator<Item = char>>(chars: &mut std::iter::Peekable<I>) -> String {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        chars.next();
    }
    ident
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::HtmlDocument;

    const HTML: &str = r#"
        <div class="caption-window" id="cw">
            <span class="ytp-caption-segment">one</span>
            <p><span class="inner">two</span></p>
        </div>
        <span class="ttr-cue">three</span>
    "#;

    fn count(doc: &HtmlDocument, selector: &str) -> usize {
        doc.query_selector_all(&doc.root(), &Selector::parse(selector).unwrap())
            .len()
    }

    #[test]
    fn test_simple_selectors() {
        let doc = HtmlDocument::from_html(HTML).unwrap();
        assert_eq!(count(&doc, "span"), 3);
        assert_eq!(count(&doc, "span.ttr-cue"), 1);
        assert_eq!(count(&doc, "#cw"), 1);
        assert_eq!(count(&doc, "DIV.caption-window"), 1);
        assert_eq!(count(&doc, ".missing"), 0);
    }

    #[test]
    fn test_combinators() {
        let doc = HtmlDocument::from_html(HTML).unwrap();
        assert_eq!(count(&doc, "div span"), 2);
        assert_eq!(count(&doc, "div > span"), 1);
        assert_eq!(count(&doc, "div>p>span"), 1);
        assert_eq!(count(&doc, "p > span.inner"), 1);
        assert_eq!(count(&doc, "body > span"), 1);
    }

    #[test]
    fn test_unsupported_syntax_is_rejected() {
        for source in ["", "a[href]", "a:hover", "> span", "div >", "a, b", "div.", "a ~ b"] {
            let error = Selector::parse(source).unwrap_err();
            assert!(matches!(error, FilterError::InvalidSelector { .. }), "{}", source);
        }
    }
}
