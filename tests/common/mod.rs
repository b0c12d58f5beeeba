// 集成测试公共模块
//
// 提供页面构建、配置构建和测试数据生成

use indexmap::IndexMap;
use markup5ever_rcdom::Handle;

use webfilter::config::{Config, DomainConfig, MatchMethod, WordConfig};
use webfilter::dom::{DocumentTree, HtmlDocument, Selector};
use webfilter::messaging::RecordingSink;
use webfilter::{FilterSession, Location};

/// 测试配置构建器
pub struct TestConfigBuilder {
    config: Config,
}

impl TestConfigBuilder {
    /// 不含内置词条的配置
    pub fn new() -> Self {
        let mut config = Config::default();
        config.words = IndexMap::new();
        Self { config }
    }

    pub fn with_word(mut self, word: &str, match_method: MatchMethod, sub: &str) -> Self {
        self.config
            .words
            .insert(word.to_string(), WordConfig::new(match_method, sub));
        self
    }

    pub fn with_domain(mut self, key: &str, domain: DomainConfig) -> Self {
        self.config.domains.insert(key.to_string(), domain);
        self
    }

    pub fn with_audio(mut self) -> Self {
        self.config.mute_audio = true;
        self
    }

    pub fn with(mut self, update: impl FnOnce(&mut Config)) -> Self {
        update(&mut self.config);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// 一个页面及其过滤会话
pub struct TestPage {
    pub doc: HtmlDocument,
    pub session: FilterSession,
    pub sink: RecordingSink,
}

impl TestPage {
    pub fn new(html: &str, href: &str, config: Config) -> Self {
        let doc = HtmlDocument::from_html(html).expect("测试 HTML 应可解析");
        let sink = RecordingSink::new();
        let location = Location::parse(href).expect("测试地址应有效");
        let session = FilterSession::new(config, location, Box::new(sink.clone()));
        Self { doc, session, sink }
    }

    /// 创建并启动会话
    pub fn started(html: &str, href: &str, config: Config) -> Self {
        let mut page = Self::new(html, href, config);
        page.session.start(&page.doc).expect("会话应能启动");
        page
    }

    pub fn first(&self, selector: &str) -> Handle {
        let selector = Selector::parse(selector).expect("选择器应有效");
        self.doc
            .query_selector(&self.doc.root(), &selector)
            .expect("元素应存在")
    }

    pub fn text(&self, selector: &str) -> String {
        self.doc.text_content(&self.first(selector))
    }

    pub fn body_text(&self) -> String {
        let body = self.doc.body().expect("文档应有 body");
        self.doc.text_content(&body)
    }
}

/// 测试数据生成器
pub struct TestDataGenerator;

impl TestDataGenerator {
    /// 生成大量域名配置
    pub fn domains(count: usize) -> IndexMap<String, DomainConfig> {
        (0..count)
            .map(|i| {
                (
                    format!("site{:04}.example.com", i),
                    DomainConfig {
                        disabled: Some(i % 2 == 0),
                        adv: (i % 3 == 0).then_some(true),
                        disabled_pages: vec![format!("private/{}/*", i)],
                        ..Default::default()
                    },
                )
            })
            .collect()
    }

    /// 生成大量词条
    pub fn words(count: usize) -> IndexMap<String, WordConfig> {
        (0..count)
            .map(|i| {
                (
                    format!("badword{:04}", i),
                    WordConfig::new(MatchMethod::Whole, &format!("sub{}", i)),
                )
            })
            .collect()
    }
}
