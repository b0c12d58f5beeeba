//! 字幕站点描述
//!
//! 内置站点表与用户自定义站点合并，并编译为字幕节点判定

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dom::{DocumentTree, Selector};
use crate::error::{FilterError, FilterResult};

/// 站点字幕描述
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioSite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains_selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_prop_present: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_children_elements: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_parent_selector: Option<String>,
}

impl AudioSite {
    fn element(tag_name: &str) -> Self {
        Self {
            tag_name: Some(tag_name.to_string()),
            ..Default::default()
        }
    }

    fn class(mut self, class_name: &str) -> Self {
        self.class_name = Some(class_name.to_string());
        self
    }

    fn subtitles(mut self, selector: &str) -> Self {
        self.subtitle_selector = Some(selector.to_string());
        self
    }
}

/// 内置站点表
pub fn default_sites() -> IndexMap<String, AudioSite> {
    let mut sites = IndexMap::new();
    sites.insert("abc.go.com".into(), AudioSite::element("DIV").class("akamai-caption-text"));
    sites.insert(
        "app.plex.tv".into(),
        AudioSite {
            data_prop_present: Some("dialogueId".into()),
            ..AudioSite::element("DIV").subtitles("span > span")
        },
    );
    sites.insert(
        "www.amazon.com".into(),
        AudioSite::element("P").subtitles("span.timedTextBackground"),
    );
    sites.insert(
        "www.dishanywhere.com".into(),
        AudioSite::element("SPAN").class("bmpui-ui-subtitle-label"),
    );
    sites.insert(
        "www.fox.com".into(),
        AudioSite::element("DIV")
            .class("jw-text-track-container")
            .subtitles("div.jw-text-track-cue"),
    );
    sites.insert(
        "www.hulu.com".into(),
        AudioSite::element("DIV").class("caption-text-box").subtitles("p"),
    );
    sites.insert(
        "www.nbc.com".into(),
        AudioSite::element("DIV").class("ttr-line").subtitles("span.ttr-cue"),
    );
    sites.insert(
        "www.netflix.com".into(),
        AudioSite::element("DIV")
            .class("player-timedtext-text-container")
            .subtitles("span"),
    );
    sites.insert(
        "www.sonycrackle.com".into(),
        AudioSite {
            text_parent_selector: Some("div.clpp-subtitles-container".into()),
            ..Default::default()
        },
    );
    sites.insert(
        "www.syfy.com".into(),
        AudioSite::element("DIV").class("ttr-line").subtitles("span.ttr-cue"),
    );
    sites.insert(
        "www.universalkids.com".into(),
        AudioSite::element("DIV").subtitles("div.gwt-HTML"),
    );
    sites.insert(
        "www.usanetwork.com".into(),
        AudioSite::element("DIV").class("ttr-line").subtitles("span.ttr-cue"),
    );
    sites.insert(
        "www.vudu.com".into(),
        AudioSite::element("DIV").subtitles("span.subtitles"),
    );
    sites.insert(
        "www.youtube.com".into(),
        AudioSite::element("DIV")
            .class("caption-window")
            .subtitles("span.ytp-caption-segment"),
    );
    sites
}

/// 内置站点表合并用户站点，用户条目优先
pub fn merged_sites(custom: &IndexMap<String, AudioSite>) -> IndexMap<String, AudioSite> {
    let mut sites = default_sites();
    for (key, site) in custom {
        sites.insert(key.clone(), site.clone());
    }
    sites
}

/// `dialogueId` -> `data-dialogue-id`
pub fn data_attribute_name(prop: &str) -> String {
    let mut name = String::from("data-");
    for c in prop.chars() {
        if c.is_uppercase() {
            name.push('-');
            name.extend(c.to_lowercase());
        } else {
            name.push(c);
        }
    }
    name
}

/// 字幕节点判定
#[derive(Debug, Clone)]
pub enum SupportedNode {
    /// 位于指定父元素内的文本节点
    TextParent(Selector),
    /// 满足全部条件的元素
    Element {
        tag_name: String,
        class_name: Option<String>,
        data_attribute: Option<String>,
        has_children_elements: bool,
        subtitle_selector: Option<Selector>,
        contains_selector: Option<Selector>,
    },
}

impl SupportedNode {
    /// 编译站点描述，缺少 tagName 与 textParentSelector 时报错
    pub fn build(site_key: &str, site: &AudioSite) -> FilterResult<Self> {
        if let Some(selector) = &site.text_parent_selector {
            return Ok(SupportedNode::TextParent(Selector::parse(selector)?));
        }

        let tag_name = site
            .tag_name
            .as_deref()
            .filter(|tag| !tag.trim().is_empty())
            .ok_or_else(|| FilterError::InvalidSiteDescriptor {
                site: site_key.to_string(),
                reason: "tagName is required".to_string(),
            })?;

        Ok(SupportedNode::Element {
            tag_name: tag_name.trim().to_lowercase(),
            class_name: site.class_name.clone(),
            data_attribute: site.data_prop_present.as_deref().map(data_attribute_name),
            has_children_elements: site.has_children_elements.unwrap_or(false),
            subtitle_selector: site.subtitle_selector.as_deref().map(Selector::parse).transpose()?,
            contains_selector: site.contains_selector.as_deref().map(Selector::parse).transpose()?,
        })
    }

    pub fn matches<D: DocumentTree>(&self, doc: &D, node: &D::Node) -> bool {
        match self {
            SupportedNode::TextParent(selector) => {
                doc.is_text(node)
                    && doc
                        .query_selector(&doc.root(), selector)
                        .is_some_and(|parent| doc.contains(&parent, node))
            }
            SupportedNode::Element {
                tag_name,
                class_name,
                data_attribute,
                has_children_elements,
                subtitle_selector,
                contains_selector,
            } => {
                if doc.tag_name(node).as_deref() != Some(tag_name.as_str()) {
                    return false;
                }
                if let Some(class_name) = class_name {
                    let class = doc.attribute(node, "class").unwrap_or_default();
                    if !class.contains(class_name.as_str()) {
                        return false;
                    }
                }
                if let Some(attribute) = data_attribute {
                    if doc.attribute(node, attribute).is_none() {
                        return false;
                    }
                }
                if *has_children_elements && doc.child_element_count(node) < 1 {
                    return false;
                }
                [subtitle_selector, contains_selector]
                    .into_iter()
                    .flatten()
                    .all(|selector| doc.query_selector(node, selector).is_some())
            }
        }
    }
}
