//! 过滤会话集成测试
//!
//! 从配置文本到激活、增量变更、音频同步和导航的完整流程

use webfilter::config::{Config, DomainConfig, MatchMethod, MuteMethod, ShowSubtitles};
use webfilter::dom::{DocumentTree, Mutation};
use webfilter::messaging::{InboundMessage, Message};

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::{TestConfigBuilder, TestPage};

#[test]
fn test_toml_config_drives_session() {
    let config = Config::from_toml_str(
        r#"
defaultSubstitution = "[beep]"
showCounter = true

[words.damn]
matchMethod = "exact"

[words."hell"]
matchMethod = "whole"
sub = "heck"

[domains."blog.example.com"]
adv = true
"#,
    )
    .unwrap();
    assert_eq!(config.words.len(), 2);

    let page = TestPage::started(
        "<p>Damn, that was hellish.</p>",
        "https://www.example.com/",
        config.clone(),
    );
    assert_eq!(page.text("p"), "[beep], that was heck.");
    assert!(!page.session.is_advanced());

    let page = TestPage::started("<p>damn</p>", "https://blog.example.com/", config);
    assert!(page.session.is_advanced());
    assert_eq!(page.text("p"), "[beep]");
}

#[test]
fn test_longest_phrase_wins_in_whole_mode() {
    let config = TestConfigBuilder::new()
        .with_word("ass", MatchMethod::Whole, "butt")
        .with_word("asshole", MatchMethod::Whole, "jerk")
        .build();
    let page = TestPage::started("<p>you asshole</p>", "https://example.com/", config);
    assert_eq!(page.text("p"), "you jerk");
}

#[test]
fn test_incremental_mutations_are_filtered_in_order() {
    let config = TestConfigBuilder::new()
        .with_word("damn", MatchMethod::Exact, "dang")
        .build();
    let mut page = TestPage::started(
        "<ul id=feed></ul><textarea>damn</textarea>",
        "https://example.com/",
        config,
    );
    page.sink.clear();

    let feed = page.first("ul");
    let first = page.doc.append_html(&feed, "<li>damn one</li>").unwrap();
    let second = page
        .doc
        .append_html(&feed, "<li>two <em>damn</em></li><script>damn()</script>")
        .unwrap();
    let batch: Vec<Mutation<_>> = vec![first, second];
    assert!(page.session.process_mutations(&page.doc, &batch));

    assert_eq!(page.text("ul"), "dang onetwo dangdamn()");
    assert_eq!(page.text("textarea"), "damn");
    assert_eq!(page.session.filter().counter(), 2);

    let messages = page.sink.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0], Message::counter(2));
    assert_eq!(
        messages[1].summary.as_ref().unwrap()["damn"].filtered,
        "dang"
    );
}

#[test]
fn test_enabled_domains_only_mode() {
    let config = TestConfigBuilder::new()
        .with_word("damn", MatchMethod::Exact, "dang")
        .with_domain(
            "example.com",
            DomainConfig {
                enabled: Some(true),
                disabled_pages: vec!["raw/*".into()],
                ..Default::default()
            },
        )
        .with(|cfg| cfg.enabled_domains_only = true)
        .build();

    let page = TestPage::started("<p>damn</p>", "https://other.org/", config.clone());
    assert!(page.session.is_disabled());
    assert_eq!(page.text("p"), "damn");

    let page = TestPage::started("<p>damn</p>", "https://www.example.com/", config.clone());
    assert!(!page.session.is_disabled());
    assert_eq!(page.text("p"), "dang");

    let page = TestPage::started("<p>damn</p>", "https://www.example.com/raw/1", config);
    assert!(page.session.is_disabled());
}

#[test]
fn test_enabled_pages_override_disabled_domain() {
    let config = TestConfigBuilder::new()
        .with_word("damn", MatchMethod::Exact, "dang")
        .with_domain(
            "forum.example.com",
            DomainConfig {
                disabled: Some(true),
                enabled_pages: vec!["kids/*".into()],
                ..Default::default()
            },
        )
        .build();

    let mut page = TestPage::started("<p>damn</p>", "https://forum.example.com/adults", config);
    assert!(page.session.is_disabled());

    assert!(page
        .session
        .navigate(&page.doc, "https://forum.example.com/kids/board")
        .unwrap());
    assert!(page.session.is_observing());
    assert_eq!(page.text("p"), "dang");
}

#[test]
fn test_auto_captions_follow_media_time() {
    let config = TestConfigBuilder::new()
        .with_word("damn", MatchMethod::Exact, "dang")
        .with_audio()
        .with(|cfg| cfg.youtube_auto_subs_min = 5.0)
        .build();
    let mut page = TestPage::started(
        r#"<video></video><div class="ytp-caption-window-rollup"><div class="caption-window" id=cw></div></div><p id=comments></p>"#,
        "https://www.youtube.com/watch?v=abc",
        config,
    );
    page.sink.clear();
    let window = page.first("div.caption-window");

    page.doc.set_media_time(Some(8.0));
    let caption = page.doc.append_text(&window, "oh damn");
    page.session.process_mutations(&page.doc, &[caption]);
    assert_eq!(page.doc.text_content(&window), "oh dang");
    assert!(page.session.audio().unwrap().muted);
    assert_eq!(page.sink.messages()[0], Message::mute(true));

    page.doc.set_media_time(Some(10.0));
    let clean = page.doc.append_text(&window, " fine");
    page.session.process_mutations(&page.doc, &[clean]);
    assert_eq!(page.session.audio().unwrap().unmute_delay, Some(10.0));

    page.doc.set_media_time(Some(14.0));
    let clean = page.doc.append_text(&window, " still");
    page.session.process_mutations(&page.doc, &[clean]);
    assert!(page.session.audio().unwrap().muted);

    page.doc.set_media_time(Some(16.0));
    let clean = page.doc.append_text(&window, " ok");
    page.session.process_mutations(&page.doc, &[clean]);
    assert!(!page.session.audio().unwrap().muted);

    let comments = page.first("p");
    let comment = page.doc.append_text(&comments, "damn video");
    page.session.process_mutations(&page.doc, &[comment]);
    assert_eq!(page.text("p"), "dang video");
}

#[test]
fn test_media_element_mute_and_hidden_subtitles() {
    let config = TestConfigBuilder::new()
        .with_word("damn", MatchMethod::Exact, "dang")
        .with_audio()
        .with(|cfg| {
            cfg.mute_method = MuteMethod::MuteMedia;
            cfg.show_subtitles = ShowSubtitles::HideAll;
        })
        .build();
    let mut page = TestPage::started(
        r#"<video></video><div id=player></div>"#,
        "https://www.netflix.com/watch/1",
        config,
    );
    page.doc.set_media_volume(0.8);

    let player = page.first("div");
    let added = page
        .doc
        .append_html(
            &player,
            r#"<div class="player-timedtext-text-container"><span>damn</span></div>"#,
        )
        .unwrap();
    page.session.process_mutations(&page.doc, &[added.clone()]);
    assert_eq!(page.doc.media_volume(), Some(0.0));
    assert_eq!(page.doc.text_content(&player), "");

    let removed = page.doc.remove(&added.added_nodes[0]).unwrap();
    page.session.process_mutations(&page.doc, &[removed]);
    assert_eq!(page.doc.media_volume(), Some(0.8));
    assert!(!page.sink.messages().iter().any(|m| m.mute.is_some()));
}

#[test]
fn test_inbound_mute_messages() {
    let config = TestConfigBuilder::new().with_audio().build();
    let mut page = TestPage::started("<div></div>", "https://www.hulu.com/watch", config);
    page.sink.clear();

    page.session.handle_message(&page.doc, InboundMessage::Mute);
    page.session.handle_message(&page.doc, InboundMessage::Mute);
    page.session.handle_message(&page.doc, InboundMessage::Unmute);
    assert_eq!(
        page.sink.messages(),
        vec![Message::mute(true), Message::mute(false)]
    );
}

#[test]
fn test_frames_use_top_level_policy() {
    let config = TestConfigBuilder::new()
        .with_word("damn", MatchMethod::Exact, "dang")
        .with_domain(
            "news.example.com",
            DomainConfig {
                disabled: Some(true),
                ..Default::default()
            },
        )
        .build();
    let location = webfilter::Location::resolve(
        "https://ads.example.net/frame",
        Some("https://news.example.com/story"),
    )
    .unwrap();

    let mut page = TestPage::new("<p>damn</p>", "https://ads.example.net/frame", config.clone());
    page.session = webfilter::FilterSession::new(config, location, Box::new(page.sink.clone()));
    page.session.start(&page.doc).unwrap();
    assert!(page.session.is_disabled());
    assert_eq!(page.text("p"), "damn");
}
