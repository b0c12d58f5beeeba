//! 文档树抽象
//!
//! 过滤会话只通过 `DocumentTree` 访问文档，具体实现见 `html` 模块

pub mod classifier;
pub mod html;
pub mod selector;

use std::fmt;

pub use classifier::{ForbiddenNodes, NodeClassifier};
pub use html::HtmlDocument;
pub use selector::Selector;

/// 节点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element,
    Text,
    Other,
}

/// 一次文档变更记录
#[derive(Debug, Clone)]
pub struct Mutation<N> {
    pub added_nodes: Vec<N>,
    pub removed_nodes: Vec<N>,
    pub target: Option<N>,
}

impl<N> Mutation<N> {
    /// 子节点新增
    pub fn added(target: N, nodes: Vec<N>) -> Self {
        Self {
            added_nodes: nodes,
            removed_nodes: Vec::new(),
            target: Some(target),
        }
    }

    /// 子节点移除
    pub fn removed(target: N, nodes: Vec<N>) -> Self {
        Self {
            added_nodes: Vec::new(),
            removed_nodes: nodes,
            target: Some(target),
        }
    }

    /// 文本内容变化
    pub fn text(target: N) -> Self {
        Self {
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            target: Some(target),
        }
    }
}

/// 可变文档树
///
/// 写操作通过 `&self` 完成，实现方自行管理内部可变性。
pub trait DocumentTree {
    type Node: Clone + fmt::Debug;

    fn root(&self) -> Self::Node;
    fn kind(&self, node: &Self::Node) -> NodeKind;
    /// 小写标签名，非元素返回 None
    fn tag_name(&self, node: &Self::Node) -> Option<String>;
    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;
    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
    /// 文本节点的内容
    fn text(&self, node: &Self::Node) -> Option<String>;
    /// 写入文本节点，其他节点忽略
    fn set_text(&self, node: &Self::Node, text: &str);
    fn same_node(&self, a: &Self::Node, b: &Self::Node) -> bool;

    /// 页面第一个媒体元素的音量，没有媒体元素时为 None
    fn media_volume(&self) -> Option<f64>;
    fn set_media_volume(&self, volume: f64);
    /// 页面第一个媒体元素的播放时间（秒）
    fn media_current_time(&self) -> Option<f64>;

    fn is_text(&self, node: &Self::Node) -> bool {
        self.kind(node) == NodeKind::Text
    }

    fn is_element(&self, node: &Self::Node) -> bool {
        self.kind(node) == NodeKind::Element
    }

    /// 文本节点按文档顺序排列，包括节点自身
    fn text_descendants(&self, node: &Self::Node) -> Vec<Self::Node> {
        let mut found = Vec::new();
        collect_text(self, node, &mut found);
        found
    }

    /// 全部后代节点（先序，不含自身）
    fn descendants(&self, node: &Self::Node) -> Vec<Self::Node> {
        let mut found = Vec::new();
        for child in self.children(node) {
            found.push(child.clone());
            found.extend(self.descendants(&child));
        }
        found
    }

    fn text_content(&self, node: &Self::Node) -> String {
        self.text_descendants(node)
            .iter()
            .filter_map(|text| self.text(text))
            .collect()
    }

    /// 写入整体文本：第一个文本后代得到全部内容，其余清空
    fn set_text_content(&self, node: &Self::Node, text: &str) {
        let texts = self.text_descendants(node);
        for (index, text_node) in texts.iter().enumerate() {
            self.set_text(text_node, if index == 0 { text } else { "" });
        }
    }

    fn child_element_count(&self, node: &Self::Node) -> usize {
        self.children(node)
            .iter()
            .filter(|child| self.is_element(child))
            .count()
    }

    /// `ancestor` 是否包含 `node`（含自身）
    fn contains(&self, ancestor: &Self::Node, node: &Self::Node) -> bool {
        let mut current = Some(node.clone());
        while let Some(candidate) = current {
            if self.same_node(&candidate, ancestor) {
                return true;
            }
            current = self.parent(&candidate);
        }
        false
    }

    /// 节点是否仍挂在文档上
    fn is_attached(&self, node: &Self::Node) -> bool {
        self.contains(&self.root(), node)
    }

    fn has_class(&self, node: &Self::Node, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|value| value.split_whitespace().any(|c| c == class))
    }

    /// 第一个匹配选择器的后代元素
    fn query_selector(&self, scope: &Self::Node, selector: &Selector) -> Option<Self::Node>
    where
        Self: Sized,
    {
        self.descendants(scope)
            .into_iter()
            .find(|node| selector.matches(self, node))
    }

    fn query_selector_all(&self, scope: &Self::Node, selector: &Selector) -> Vec<Self::Node>
    where
        Self: Sized,
    {
        self.descendants(scope)
            .into_iter()
            .filter(|node| selector.matches(self, node))
            .collect()
    }
}

fn collect_text<D: DocumentTree + ?Sized>(doc: &D, node: &D::Node, found: &mut Vec<D::Node>) {
    if doc.is_text(node) {
        found.push(node.clone());
        return;
    }
    for child in doc.children(node) {
        collect_text(doc, &child, found);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_content_and_set() {
        let doc = HtmlDocument::from_html("<p id=x>Hello <b>big</b> world</p>").unwrap();
        let p = doc.query_selector(&doc.root(), &Selector::parse("#x").unwrap()).unwrap();
        assert_eq!(doc.text_content(&p), "Hello big world");
        assert_eq!(doc.child_element_count(&p), 1);

        doc.set_text_content(&p, "replaced");
        assert_eq!(doc.text_content(&p), "replaced");
        assert_eq!(doc.text_descendants(&p).len(), 3);
    }

    #[test]
    fn test_contains_and_attached() {
        let doc = HtmlDocument::from_html("<div><span>a</span></div>").unwrap();
        let div = doc.query_selector(&doc.root(), &Selector::parse("div").unwrap()).unwrap();
        let span = doc.query_selector(&div, &Selector::parse("span").unwrap()).unwrap();
        assert!(doc.contains(&div, &span));
        assert!(!doc.contains(&span, &div));
        assert!(doc.is_attached(&span));

        doc.remove(&span);
        assert!(!doc.is_attached(&span));
    }

    #[test]
    fn test_has_class() {
        let doc = HtmlDocument::from_html(r#"<div class="a caption-window b"></div>"#).unwrap();
        let div = doc.query_selector(&doc.root(), &Selector::parse("div").unwrap()).unwrap();
        assert!(doc.has_class(&div, "caption-window"));
        assert!(!doc.has_class(&div, "caption"));
    }
}
