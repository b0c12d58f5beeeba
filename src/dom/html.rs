//! 基于 markup5ever_rcdom 的文档实现
//!
//! 提供解析、序列化以及返回变更记录的修改辅助函数

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::parse_document;
use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};

use super::{DocumentTree, Mutation, NodeKind};
use crate::error::{FilterError, FilterResult};

const MEDIA_ELEMENTS: &[&str] = &["video", "audio"];

/// HTML 文档
pub struct HtmlDocument {
    dom: RcDom,
    media_volume: Cell<f64>,
    media_time: Cell<Option<f64>>,
}

impl std::fmt::Debug for HtmlDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlDocument")
            .field("media_volume", &self.media_volume.get())
            .field("media_time", &self.media_time.get())
            .finish()
    }
}

impl HtmlDocument {
    /// 按指定编码解析 HTML 字节
    pub fn parse(data: &[u8], document_encoding: &str) -> FilterResult<Self> {
        let text = match Encoding::for_label(document_encoding.as_bytes()) {
            Some(encoding) => encoding.decode(data).0.into_owned(),
            None => String::from_utf8_lossy(data).into_owned(),
        };
        Self::from_html(&text)
    }

    pub fn from_html(html: &str) -> FilterResult<Self> {
        Ok(Self {
            dom: html_to_dom(html)?,
            media_volume: Cell::new(1.0),
            media_time: Cell::new(None),
        })
    }

    pub fn dom(&self) -> &RcDom {
        &self.dom
    }

    /// `<body>` 元素
    pub fn body(&self) -> Option<Handle> {
        find_nodes(&self.dom.document, &["html", "body"])
            .into_iter()
            .next()
    }

    /// 序列化整个文档
    pub fn to_html(&self) -> FilterResult<String> {
        let mut buf: Vec<u8> = Vec::new();
        let serializable: SerializableHandle = self.dom.document.clone().into();
        serialize(&mut buf, &serializable, SerializeOpts::default())
            .map_err(|e| FilterError::SerializationError(format!("无法序列化文档: {}", e)))?;
        String::from_utf8(buf).map_err(|e| FilterError::SerializationError(e.to_string()))
    }

    /// 解析片段并追加到 `parent` 末尾
    pub fn append_html(&self, parent: &Handle, html: &str) -> FilterResult<Mutation<Handle>> {
        let fragment = html_to_dom(html)?;
        let added: Vec<Handle> = match find_nodes(&fragment.document, &["html", "body"])
            .into_iter()
            .next()
        {
            Some(body) => body.children.take(),
            None => Vec::new(),
        };

        for node in &added {
            adopt(parent, node);
        }
        Ok(Mutation::added(parent.clone(), added))
    }

    /// 追加文本节点
    pub fn append_text(&self, parent: &Handle, text: &str) -> Mutation<Handle> {
        let node = Node::new(NodeData::Text {
            contents: RefCell::new(text.into()),
        });
        adopt(parent, &node);
        Mutation::added(parent.clone(), vec![node])
    }

    /// 从父节点移除，未挂载时返回 None
    pub fn remove(&self, node: &Handle) -> Option<Mutation<Handle>> {
        let parent = get_parent_node(node)?;
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
        node.parent.set(None);
        Some(Mutation::removed(parent, vec![node.clone()]))
    }

    /// 修改文本节点内容
    pub fn set_text_data(&self, node: &Handle, text: &str) -> Mutation<Handle> {
        self.set_text(node, text);
        Mutation::text(node.clone())
    }

    /// 设置媒体元素的播放时间
    pub fn set_media_time(&self, time: Option<f64>) {
        self.media_time.set(time);
    }

    fn has_media_element(&self) -> bool {
        MEDIA_ELEMENTS
            .iter()
            .any(|tag| !find_nodes(&self.dom.document, &[*tag]).is_empty())
    }
}

fn html_to_dom(html: &str) -> FilterResult<RcDom> {
    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|e| FilterError::ParseError(format!("HTML解析失败: {}", e)))
}

fn adopt(parent: &Handle, node: &Handle) {
    node.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(node.clone());
}

/// 查找指定路径的DOM节点
pub fn find_nodes(node: &Handle, node_names: &[&str]) -> Vec<Handle> {
    let Some((node_name, rest)) = node_names.split_first() else {
        return Vec::new();
    };
    let mut found_nodes = Vec::new();

    let name_matches = match node.data {
        NodeData::Element { ref name, .. } => &*name.local == *node_name,
        _ => false,
    };

    if name_matches && rest.is_empty() {
        found_nodes.push(node.clone());
    }

    for child_node in node.children.borrow().iter() {
        if name_matches && !rest.is_empty() {
            found_nodes.append(&mut find_nodes(child_node, rest));
        } else {
            found_nodes.append(&mut find_nodes(child_node, node_names));
        }
    }

    found_nodes
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// 获取父节点
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

impl DocumentTree for HtmlDocument {
    type Node = Handle;

    fn root(&self) -> Handle {
        self.dom.document.clone()
    }

    fn kind(&self, node: &Handle) -> NodeKind {
        match node.data {
            NodeData::Document => NodeKind::Document,
            NodeData::Element { .. } => NodeKind::Element,
            NodeData::Text { .. } => NodeKind::Text,
            _ => NodeKind::Other,
        }
    }

    fn tag_name(&self, node: &Handle) -> Option<String> {
        match &node.data {
            NodeData::Element { name, .. } => Some(name.local.to_ascii_lowercase().to_string()),
            _ => None,
        }
    }

    fn attribute(&self, node: &Handle, name: &str) -> Option<String> {
        get_node_attr(node, name)
    }

    fn children(&self, node: &Handle) -> Vec<Handle> {
        node.children.borrow().clone()
    }

    fn parent(&self, node: &Handle) -> Option<Handle> {
        get_parent_node(node)
    }

    fn text(&self, node: &Handle) -> Option<String> {
        match &node.data {
            NodeData::Text { contents } => Some(contents.borrow().to_string()),
            _ => None,
        }
    }

    fn set_text(&self, node: &Handle, text: &str) {
        if let NodeData::Text { contents } = &node.data {
            let mut contents = contents.borrow_mut();
            *contents = text.into();
        }
    }

    fn same_node(&self, a: &Handle, b: &Handle) -> bool {
        Rc::ptr_eq(a, b)
    }

    fn media_volume(&self) -> Option<f64> {
        self.has_media_element().then(|| self.media_volume.get())
    }

    fn set_media_volume(&self, volume: f64) {
        if self.has_media_element() {
            self.media_volume.set(volume);
        }
    }

    fn media_current_time(&self) -> Option<f64> {
        if self.has_media_element() {
            self.media_time.get()
        } else {
            None
        }
    }
}
