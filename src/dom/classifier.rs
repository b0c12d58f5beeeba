//! 节点分类
//!
//! 判断节点是否属于不可过滤的内容（脚本、样式、可编辑区域等）

use super::{DocumentTree, NodeKind};

/// 不可过滤的元素
pub const FORBIDDEN_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "textarea", "input", "select", "option", "code", "pre",
    "template", "svg", "math", "iframe", "object",
];

/// 节点分类器
pub trait NodeClassifier<D: DocumentTree> {
    fn is_forbidden_node(&self, doc: &D, node: &D::Node) -> bool;
}

/// 基于标签列表的默认分类器
#[derive(Debug, Clone, Copy, Default)]
pub struct ForbiddenNodes;

impl ForbiddenNodes {
    fn forbidden_element<D: DocumentTree>(doc: &D, node: &D::Node) -> bool {
        let tag_forbidden = doc
            .tag_name(node)
            .is_some_and(|tag| FORBIDDEN_ELEMENTS.contains(&tag.as_str()));
        tag_forbidden || Self::editable(doc, node)
    }

    /// 节点或其祖先带有 contenteditable
    fn editable<D: DocumentTree>(doc: &D, node: &D::Node) -> bool {
        let mut current = Some(node.clone());
        while let Some(candidate) = current {
            if let Some(value) = doc.attribute(&candidate, "contenteditable") {
                return !value.eq_ignore_ascii_case("false");
            }
            current = doc.parent(&candidate);
        }
        false
    }
}

impl<D: DocumentTree> NodeClassifier<D> for ForbiddenNodes {
    fn is_forbidden_node(&self, doc: &D, node: &D::Node) -> bool {
        match doc.kind(node) {
            NodeKind::Document => false,
            NodeKind::Element => Self::forbidden_element(doc, node),
            NodeKind::Text => doc
                .parent(node)
                .is_some_and(|parent| doc.is_element(&parent) && Self::forbidden_element(doc, &parent)),
            NodeKind::Other => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{HtmlDocument, Selector};

    fn first(doc: &HtmlDocument, selector: &str) -> markup5ever_rcdom::Handle {
        doc.query_selector(&doc.root(), &Selector::parse(selector).unwrap())
            .unwrap()
    }

    #[test]
    fn test_script_and_style_are_forbidden() {
        let doc = HtmlDocument::from_html(
            "<script>var damn;</script><style>p{}</style><p>damn</p>",
        )
        .unwrap();
        let classifier = ForbiddenNodes;

        let script = first(&doc, "script");
        assert!(classifier.is_forbidden_node(&doc, &script));
        let script_text = doc.children(&script).remove(0);
        assert!(classifier.is_forbidden_node(&doc, &script_text));

        let p = first(&doc, "p");
        assert!(!classifier.is_forbidden_node(&doc, &p));
        assert!(!classifier.is_forbidden_node(&doc, &doc.root()));
    }

    #[test]
    fn test_contenteditable_regions() {
        let doc = HtmlDocument::from_html(
            r#"<div contenteditable="true"><p>typing</p></div><div contenteditable="false"><b>x</b></div>"#,
        )
        .unwrap();
        let classifier = ForbiddenNodes;

        let p = first(&doc, "p");
        assert!(classifier.is_forbidden_node(&doc, &p));
        let text = doc.children(&p).remove(0);
        assert!(classifier.is_forbidden_node(&doc, &text));

        let b = first(&doc, "b");
        assert!(!classifier.is_forbidden_node(&doc, &b));
    }
}
