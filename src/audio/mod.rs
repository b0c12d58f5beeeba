//! 音频同步
//!
//! 字幕被过滤时静音，字幕恢复正常时取消静音；自动字幕按媒体时间延迟取消静音

pub mod sites;

use crate::config::{Config, MuteMethod, ShowSubtitles};
use crate::dom::{DocumentTree, Selector};
use crate::domain::Domain;
use crate::error::FilterResult;
use crate::filter::Filter;
use crate::messaging::{deliver, Message, MessageSink};

pub use sites::{AudioSite, SupportedNode};

/// 自动字幕滚动容器
const AUTO_SUBS_ROLLUP_SELECTOR: &str = "div.ytp-caption-window-rollup";
/// 自动字幕窗口
const AUTO_SUBS_CAPTION_WINDOW_SELECTOR: &str = "div.caption-window";

/// 音频同步器
#[derive(Debug, Clone)]
pub struct AudioSync {
    pub muted: bool,
    /// 静音前保存的媒体音量
    saved_volume: Option<f64>,
    pub unmute_delay: Option<f64>,
    youtube_auto_subs_min: f64,
    mute_method: MuteMethod,
    show_subtitles: ShowSubtitles,
    site_key: String,
    supported: SupportedNode,
    subtitle_selector: Option<Selector>,
    rollup_selector: Selector,
    caption_window_selector: Selector,
}

impl AudioSync {
    /// 当前页面需要音频同步时创建，站点描述无效时返回错误
    pub fn for_page(cfg: &Config, hostname: &str) -> FilterResult<Option<Self>> {
        if !cfg.mute_audio {
            return Ok(None);
        }

        let sites = sites::merged_sites(&cfg.custom_audio_sites);
        let Some(key) = Domain::find_domain_key(hostname, sites.keys()) else {
            return Ok(None);
        };
        let site = &sites[key];
        Self::new(cfg, key, site).map(Some)
    }

    /// 创建新的音频同步器
    pub fn new(cfg: &Config, site_key: &str, site: &AudioSite) -> FilterResult<Self> {
        let supported = SupportedNode::build(site_key, site)?;
        let subtitle_selector = site
            .subtitle_selector
            .as_deref()
            .map(Selector::parse)
            .transpose()?;

        tracing::info!("启用音频同步: {}", site_key);
        Ok(Self {
            muted: false,
            saved_volume: None,
            unmute_delay: None,
            youtube_auto_subs_min: cfg.youtube_auto_subs_min,
            mute_method: cfg.mute_method,
            show_subtitles: cfg.show_subtitles,
            site_key: site_key.to_string(),
            supported,
            subtitle_selector,
            rollup_selector: Selector::parse(AUTO_SUBS_ROLLUP_SELECTOR)?,
            caption_window_selector: Selector::parse(AUTO_SUBS_CAPTION_WINDOW_SELECTOR)?,
        })
    }

    pub fn site_key(&self) -> &str {
        &self.site_key
    }

    /// 取消静音时恢复的音量
    pub fn volume(&self) -> f64 {
        self.saved_volume.unwrap_or(1.0)
    }

    /// 静音，已静音时不做任何事
    pub fn mute<D: DocumentTree>(&mut self, doc: &D, sink: &mut dyn MessageSink) {
        if self.muted {
            return;
        }
        self.muted = true;

        match self.mute_method {
            MuteMethod::MuteTab => deliver(sink, &Message::mute(true)),
            MuteMethod::MuteMedia => {
                if let Some(volume) = doc.media_volume() {
                    self.saved_volume = Some(volume);
                    doc.set_media_volume(0.0);
                }
            }
        }
        tracing::debug!("静音 ({:?})", self.mute_method);
    }

    /// 取消静音
    pub fn unmute<D: DocumentTree>(&mut self, doc: &D, sink: &mut dyn MessageSink) {
        self.muted = false;

        match self.mute_method {
            MuteMethod::MuteTab => deliver(sink, &Message::mute(false)),
            MuteMethod::MuteMedia => {
                if doc.media_volume().is_some() {
                    if let Some(volume) = self.saved_volume.take() {
                        doc.set_media_volume(volume);
                    }
                }
            }
        }
        tracing::debug!("取消静音 ({:?})", self.mute_method);
    }

    /// 节点是否为站点字幕节点
    pub fn supported_node<D: DocumentTree>(&self, doc: &D, node: &D::Node) -> bool {
        self.supported.matches(doc, node)
    }

    /// 过滤字幕容器，返回是否有字幕被修改
    pub fn clean<D: DocumentTree>(
        &mut self,
        doc: &D,
        filter: &mut Filter,
        container: &D::Node,
        sink: &mut dyn MessageSink,
    ) -> bool {
        let subtitles = match &self.subtitle_selector {
            Some(selector) => doc.query_selector_all(container, selector),
            None => vec![container.clone()],
        };

        let mut filtered = false;
        for subtitle in &subtitles {
            let result = filter.replace_audio_text_result(&doc.text_content(subtitle));
            if result.modified {
                filtered = true;
                doc.set_text_content(subtitle, &result.filtered);
                self.mute(doc, sink);
            }
        }

        let blank = match self.show_subtitles {
            ShowSubtitles::ShowAll => false,
            ShowSubtitles::FilteredOnly => !filtered,
            ShowSubtitles::UnfilteredOnly => filtered,
            ShowSubtitles::HideAll => true,
        };
        if blank {
            for subtitle in &subtitles {
                doc.set_text_content(subtitle, "");
            }
        }

        filtered
    }

    /// 过滤自动字幕，按媒体时间决定何时取消静音
    pub fn clean_youtube_auto_subs<D: DocumentTree>(
        &mut self,
        doc: &D,
        filter: &mut Filter,
        node: &D::Node,
        sink: &mut dyn MessageSink,
    ) -> bool {
        let result = filter.replace_audio_text_result(&doc.text_content(node));
        if result.modified {
            doc.set_text_content(node, &result.filtered);
            self.mute(doc, sink);
            self.unmute_delay = None;
            return true;
        }

        if !self.muted {
            return false;
        }

        if self.youtube_auto_subs_min <= 0.0 {
            self.unmute(doc, sink);
            return false;
        }

        // 没有媒体时间时保持静音
        let Some(current_time) = doc.media_current_time() else {
            return false;
        };

        match self.unmute_delay {
            None => self.unmute_delay = Some(current_time),
            Some(mut delay) => {
                if current_time < delay {
                    delay = 0.0;
                    self.unmute_delay = Some(delay);
                }
                if current_time > delay + self.youtube_auto_subs_min {
                    self.unmute(doc, sink);
                }
            }
        }
        false
    }

    /// 页面上是否存在自动字幕
    pub fn youtube_auto_subs_present<D: DocumentTree>(&self, doc: &D) -> bool {
        doc.query_selector(&doc.root(), &self.rollup_selector).is_some()
    }

    /// 节点是否位于自动字幕窗口内
    pub fn youtube_auto_subs_node_is_subtitle_text<D: DocumentTree>(
        &self,
        doc: &D,
        node: &D::Node,
    ) -> bool {
        doc.query_selector(&doc.root(), &self.caption_window_selector)
            .is_some_and(|window| doc.contains(&window, node))
    }

    /// 非空的自动字幕文本节点
    pub fn youtube_auto_subs_supported_node<D: DocumentTree>(
        &self,
        doc: &D,
        node: &D::Node,
    ) -> bool {
        doc.is_text(node)
            && doc.text(node).is_some_and(|text| !text.is_empty())
            && self.youtube_auto_subs_node_is_subtitle_text(doc, node)
    }
}
