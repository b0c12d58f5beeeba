//! 增量过滤会话
//!
//! 会话按页面位置解析策略，激活时完整过滤一遍文档，之后只处理变更批次。
//! 停用后立即停止处理，不会再修改文档。

pub mod location;
pub mod prose;

use crate::audio::AudioSync;
use crate::config::Config;
use crate::dom::{DocumentTree, ForbiddenNodes, Mutation, NodeClassifier, NodeKind};
use crate::domain::Domain;
use crate::error::FilterResult;
use crate::filter::Filter;
use crate::messaging::{deliver, InboundMessage, Message, MessageSink};

pub use location::Location;

/// 新增节点的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    AutoSubs,
    Subtitles,
    Advanced,
    Normal,
    Skip,
}

/// 过滤会话
pub struct FilterSession<C = ForbiddenNodes> {
    cfg: Config,
    filter: Filter,
    classifier: C,
    sink: Box<dyn MessageSink>,
    location: Location,
    domain: Domain,
    disabled: bool,
    advanced: bool,
    observing: bool,
    audio: Option<AudioSync>,
}

impl<C> std::fmt::Debug for FilterSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterSession")
            .field("location", &self.location)
            .field("disabled", &self.disabled)
            .field("advanced", &self.advanced)
            .field("observing", &self.observing)
            .field("counter", &self.filter.counter())
            .finish()
    }
}

impl FilterSession<ForbiddenNodes> {
    /// 使用默认节点分类器创建会话
    pub fn new(cfg: Config, location: Location, sink: Box<dyn MessageSink>) -> Self {
        Self::with_classifier(cfg, location, ForbiddenNodes, sink)
    }
}

impl<C> FilterSession<C> {
    pub fn with_classifier(
        cfg: Config,
        location: Location,
        classifier: C,
        sink: Box<dyn MessageSink>,
    ) -> Self {
        let filter = Filter::new(&cfg);
        let domain = Domain::by_hostname(&location.hostname, &cfg.domains);
        Self {
            cfg,
            filter,
            classifier,
            sink,
            location,
            domain,
            disabled: false,
            advanced: false,
            observing: false,
            audio: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn audio(&self) -> Option<&AudioSync> {
        self.audio.as_ref()
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_advanced(&self) -> bool {
        self.advanced
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    /// 当前页面是否停用过滤
    pub fn disabled_page(&self) -> bool {
        let domain = Domain::by_hostname(&self.location.hostname, &self.cfg.domains);
        domain.page_disabled(&self.location.pathname, self.cfg.enabled_domains_only)
    }

    /// 停止处理变更
    pub fn deactivate(&mut self) {
        self.observing = false;
        tracing::info!("停用过滤: {}", self.location.hostname);
        deliver(self.sink.as_mut(), &Message::disabled(self.disabled));
    }

    /// 命中数大于 0 时发送计数与摘要
    pub fn update_counter_badge(&mut self) {
        let counter = self.filter.counter();
        if counter == 0 {
            return;
        }
        if self.cfg.show_counter {
            deliver(self.sink.as_mut(), &Message::counter(counter));
        }
        if self.cfg.show_summary {
            let summary = Message::summary(self.filter.summary().clone());
            deliver(self.sink.as_mut(), &summary);
        }
    }
}

impl<C> FilterSession<C> {
    /// 按当前位置决定激活或停用
    pub fn start<D>(&mut self, doc: &D) -> FilterResult<()>
    where
        D: DocumentTree,
        C: NodeClassifier<D>,
    {
        self.disabled = self.disabled_page();
        if self.disabled {
            self.deactivate();
            Ok(())
        } else {
            self.activate(doc)
        }
    }

    /// 解析站点策略，完整过滤一遍文档后开始处理变更
    pub fn activate<D>(&mut self, doc: &D) -> FilterResult<()>
    where
        D: DocumentTree,
        C: NodeClassifier<D>,
    {
        self.domain = Domain::by_hostname(&self.location.hostname, &self.cfg.domains);
        self.audio = AudioSync::for_page(&self.cfg, &self.location.hostname)?;
        self.advanced = self.domain.advanced;
        self.filter.init(self.domain.wordlist_id);
        self.filter.init_audio(self.domain.audio_wordlist_id);

        tracing::info!(
            "激活过滤: {} (advanced: {}, audio: {})",
            self.location.hostname,
            self.advanced,
            self.audio.is_some()
        );
        let message = Message {
            disabled: Some(self.disabled),
            advanced: Some(self.advanced),
            ..Default::default()
        };
        deliver(self.sink.as_mut(), &message);

        let root = doc.root();
        if self.advanced {
            self.advanced_replace_text(doc, &root);
        } else {
            self.clean_node(doc, &root);
        }
        self.update_counter_badge();
        self.observing = true;
        Ok(())
    }

    /// 处理一批变更，批次修改了文档时发送一次计数
    pub fn process_mutations<D>(&mut self, doc: &D, batch: &[Mutation<D::Node>]) -> bool
    where
        D: DocumentTree,
        C: NodeClassifier<D>,
    {
        if !self.observing {
            return false;
        }

        let mut modified = false;
        for mutation in batch {
            modified |= self.check_mutation(doc, mutation);
        }
        if modified {
            self.update_counter_badge();
        }
        modified
    }

    /// 处理单条变更
    pub fn check_mutation<D>(&mut self, doc: &D, mutation: &Mutation<D::Node>) -> bool
    where
        D: DocumentTree,
        C: NodeClassifier<D>,
    {
        let mut modified = false;

        for node in &mutation.added_nodes {
            if self.classifier.is_forbidden_node(doc, node) {
                tracing::debug!("跳过受保护节点: {:?}", doc.tag_name(node));
                continue;
            }
            modified |= match self.dispatch(doc, node) {
                Dispatch::AutoSubs => match self.audio.as_mut() {
                    Some(audio) => {
                        audio.clean_youtube_auto_subs(doc, &mut self.filter, node, self.sink.as_mut())
                    }
                    None => false,
                },
                Dispatch::Subtitles => match self.audio.as_mut() {
                    Some(audio) => audio.clean(doc, &mut self.filter, node, self.sink.as_mut()),
                    None => false,
                },
                Dispatch::Advanced => self.advanced_replace_text(doc, node),
                Dispatch::Normal => self.clean_node(doc, node),
                Dispatch::Skip => false,
            };
        }

        if let Some(audio) = self.audio.as_mut() {
            for node in &mutation.removed_nodes {
                if audio.supported_node(doc, node) {
                    audio.unmute(doc, self.sink.as_mut());
                }
            }
        }

        if let Some(target) = &mutation.target {
            if doc.is_text(target) {
                modified |= self.check_target_text(doc, target);
            }
        }

        modified
    }

    fn dispatch<D: DocumentTree>(&self, doc: &D, node: &D::Node) -> Dispatch {
        if let Some(audio) = &self.audio {
            if audio.youtube_auto_subs_present(doc) {
                if audio.youtube_auto_subs_supported_node(doc, node) {
                    return Dispatch::AutoSubs;
                }
                if audio.youtube_auto_subs_node_is_subtitle_text(doc, node) {
                    return Dispatch::Skip;
                }
                return Dispatch::Normal;
            }
            if audio.supported_node(doc, node) {
                return Dispatch::Subtitles;
            }
        }

        if self.advanced && doc.is_attached(node) {
            Dispatch::Advanced
        } else {
            Dispatch::Normal
        }
    }

    fn check_target_text<D>(&mut self, doc: &D, target: &D::Node) -> bool
    where
        D: DocumentTree,
        C: NodeClassifier<D>,
    {
        if self.classifier.is_forbidden_node(doc, target) {
            return false;
        }
        let Some(text) = doc.text(target) else {
            return false;
        };

        let result = self.filter.replace_text_result(&text);
        if result.modified {
            tracing::debug!("文本变更已过滤: '{}' -> '{}'", result.original, result.filtered);
            doc.set_text(target, &result.filtered);
        }
        result.modified
    }

    /// 普通模式过滤：受保护节点不进入，叶子节点按去掉首尾空白的文本匹配
    pub fn clean_node<D>(&mut self, doc: &D, node: &D::Node) -> bool
    where
        D: DocumentTree,
        C: NodeClassifier<D>,
    {
        if self.classifier.is_forbidden_node(doc, node) {
            return false;
        }

        match doc.kind(node) {
            NodeKind::Text => self.clean_leaf(doc, node),
            NodeKind::Element if doc.child_element_count(node) == 0 => self.clean_leaf(doc, node),
            NodeKind::Element | NodeKind::Document => {
                let mut modified = false;
                for child in doc.children(node) {
                    modified |= self.clean_node(doc, &child);
                }
                modified
            }
            NodeKind::Other => false,
        }
    }

    fn clean_leaf<D: DocumentTree>(&mut self, doc: &D, node: &D::Node) -> bool {
        let text = match doc.text(node) {
            Some(text) => text,
            None => doc.text_content(node),
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return false;
        }

        let result = self.filter.replace_text_result(trimmed);
        if !result.modified {
            return false;
        }

        let start = text.len() - text.trim_start().len();
        let end = start + trimmed.len();
        let updated = format!("{}{}{}", &text[..start], result.filtered, &text[end..]);
        tracing::debug!("节点已过滤: '{}' -> '{}'", result.original, result.filtered);
        if doc.is_text(node) {
            doc.set_text(node, &updated);
        } else {
            doc.set_text_content(node, &updated);
        }
        true
    }

    /// 高级模式过滤：词条在段落文本上匹配，可跨越多个文本节点
    pub fn advanced_replace_text<D>(&mut self, doc: &D, node: &D::Node) -> bool
    where
        D: DocumentTree,
        C: NodeClassifier<D>,
    {
        let runs = prose::prose_runs(doc, &self.classifier, node);
        let mut modified = false;
        for word in self.filter.active_words() {
            for run in &runs {
                modified |= prose::replace_in_run(doc, run, &word, &mut self.filter);
            }
        }
        modified
    }

    /// 地址变化后重新判断策略，结果改变时才切换激活状态
    pub fn navigate<D>(&mut self, doc: &D, href: &str) -> FilterResult<bool>
    where
        D: DocumentTree,
        C: NodeClassifier<D>,
    {
        let location = Location::parse(href)?;
        if location.href == self.location.href {
            return Ok(false);
        }

        tracing::info!("检测到页面导航: {}", location.href);
        self.location = location;
        let disabled = self.disabled_page();
        if disabled == self.disabled {
            return Ok(false);
        }

        self.disabled = disabled;
        if disabled {
            self.deactivate();
        } else {
            self.activate(doc)?;
        }
        Ok(true)
    }

    /// 处理外部消息
    pub fn handle_message<D: DocumentTree>(&mut self, doc: &D, message: InboundMessage) {
        match message {
            InboundMessage::Mute | InboundMessage::Unmute => {
                if !self.observing {
                    tracing::debug!("过滤未激活，忽略 {:?}", message);
                    return;
                }
                let Some(audio) = self.audio.as_mut() else {
                    tracing::debug!("当前页面未启用音频同步，忽略 {:?}", message);
                    return;
                };
                if message == InboundMessage::Mute {
                    audio.mute(doc, self.sink.as_mut());
                } else {
                    audio.unmute(doc, self.sink.as_mut());
                }
            }
            InboundMessage::PopupOpened => {
                if self.cfg.show_summary && self.filter.counter() > 0 {
                    let summary = Message::summary(self.filter.summary().clone());
                    deliver(self.sink.as_mut(), &summary);
                }
            }
        }
    }

    /// 应用新配置，按新的策略重新激活或停用
    pub fn update_config<D>(&mut self, doc: &D, cfg: Config) -> FilterResult<()>
    where
        D: DocumentTree,
        C: NodeClassifier<D>,
    {
        self.cfg = cfg;
        self.filter.reload(&self.cfg);
        self.disabled = self.disabled_page();
        if self.disabled {
            if self.observing {
                self.deactivate();
            }
            Ok(())
        } else {
            self.activate(doc)
        }
    }
}
