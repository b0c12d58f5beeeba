//! # Webfilter Library
//!
//! 增量过滤不断变化的文档中的敏感词，同步字幕与音频，并把配置分块保存到有单项大小限制的存储中。
//!
//! ## 模块组织
//!
//! - `filter` - 词条编译、词表与替换引擎
//! - `domain` - 按主机名和路径解析过滤策略
//! - `storage` - 配置分块、合并与存储后端
//! - `session` - 增量过滤会话
//! - `audio` - 字幕站点描述与静音同步
//! - `dom` - 文档树抽象与 HTML 实现
//! - `messaging` - 对外消息
//! - `actions` - 词条与域名的配置操作

pub mod actions;
pub mod audio;
pub mod config;
pub mod dom;
pub mod domain;
pub mod env;
pub mod error;
pub mod filter;
pub mod logging;
pub mod messaging;
pub mod session;
pub mod storage;

// Re-export commonly used items for convenience
pub use audio::AudioSync;
pub use config::Config;
pub use dom::{DocumentTree, HtmlDocument, Mutation};
pub use domain::Domain;
pub use error::{FilterError, FilterResult};
pub use filter::{Filter, ReplaceResult};
pub use messaging::{Message, MessageSink};
pub use session::{FilterSession, Location};
pub use storage::{ConfigStore, MemoryStorage, RedbStorage, StorageBackend};
