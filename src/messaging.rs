//! 消息通道
//!
//! 会话向外发送徽标、摘要和静音消息；发送失败只记录日志

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{helpers::log_error, FilterError, FilterResult};
use crate::filter::SummaryEntry;

/// 发出的消息，未设置的字段不序列化
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advanced: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<IndexMap<String, SummaryEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mute: Option<bool>,
}

impl Message {
    pub fn disabled(disabled: bool) -> Self {
        Self {
            disabled: Some(disabled),
            ..Default::default()
        }
    }

    pub fn counter(counter: u64) -> Self {
        Self {
            counter: Some(counter),
            ..Default::default()
        }
    }

    pub fn summary(summary: IndexMap<String, SummaryEntry>) -> Self {
        Self {
            summary: Some(summary),
            ..Default::default()
        }
    }

    pub fn mute(mute: bool) -> Self {
        Self {
            mute: Some(mute),
            ..Default::default()
        }
    }
}

/// 收到的消息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InboundMessage {
    Mute,
    Unmute,
    PopupOpened,
}

/// 消息发送端
pub trait MessageSink {
    fn send(&mut self, message: &Message) -> FilterResult<()>;
}

/// 发送消息，失败时记录并忽略
pub fn deliver(sink: &mut dyn MessageSink, message: &Message) {
    if let Err(e) = sink.send(message) {
        log_error(&e);
    }
}

/// 记录全部消息的发送端，克隆体共享同一缓冲区
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    messages: Rc<RefCell<Vec<Message>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.borrow().clone()
    }

    pub fn clear(&self) {
        self.messages.borrow_mut().clear();
    }
}

impl MessageSink for RecordingSink {
    fn send(&mut self, message: &Message) -> FilterResult<()> {
        self.messages.borrow_mut().push(message.clone());
        Ok(())
    }
}

/// 丢弃全部消息
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl MessageSink for NullSink {
    fn send(&mut self, _message: &Message) -> FilterResult<()> {
        Ok(())
    }
}

/// 每条消息写一行 JSON
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> MessageSink for WriterSink<W> {
    fn send(&mut self, message: &Message) -> FilterResult<()> {
        let line = serde_json::to_string(message)?;
        writeln!(self.writer, "{}", line)
            .map_err(|e| FilterError::MessagingError(e.to_string()))
    }
}
