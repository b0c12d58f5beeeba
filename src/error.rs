//! 统一错误处理
//!
//! 提供结构化错误类型和错误处理机制

use std::fmt;

use thiserror::Error;

/// 过滤器错误类型
#[derive(Error, Debug, Clone)]
pub enum FilterError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 站点字幕描述缺少必要字段
    #[error("站点描述无效 ({site}): {reason}")]
    InvalidSiteDescriptor { site: String, reason: String },

    /// 不支持的选择器语法
    #[error("选择器无效 '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// 词条正则表达式无法编译
    #[error("词条模式无效 '{word}': {reason}")]
    InvalidPattern { word: String, reason: String },

    /// 页面地址解析错误
    #[error("地址无效: {0}")]
    InvalidLocation(String),

    /// 存储后端错误
    #[error("存储错误: {0}")]
    StorageError(String),

    /// 单个存储项超出配额
    #[error("存储项 '{key}' 大小 {bytes} 字节，超出配额 {limit} 字节")]
    QuotaExceeded {
        key: String,
        bytes: usize,
        limit: usize,
    },

    /// 消息发送失败
    #[error("消息发送失败: {0}")]
    MessagingError(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl FilterError {
    /// 检查错误是否可以在当前会话内忽略
    pub fn is_recoverable(&self) -> bool {
        match self {
            FilterError::MessagingError(_) => true,
            FilterError::InvalidPattern { .. } => true,
            FilterError::StorageError(_) => true,
            FilterError::QuotaExceeded { .. } => true,
            FilterError::InvalidLocation(_) => true,
            FilterError::ConfigError(_) => false,
            FilterError::InvalidSiteDescriptor { .. } => false,
            FilterError::InvalidSelector { .. } => false,
            FilterError::ParseError(_) => false,
            FilterError::SerializationError(_) => false,
            FilterError::InternalError(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            FilterError::ConfigError(_) => ErrorSeverity::Critical,
            FilterError::InvalidSiteDescriptor { .. } => ErrorSeverity::Critical,
            FilterError::InvalidSelector { .. } => ErrorSeverity::Critical,
            FilterError::InvalidPattern { .. } => ErrorSeverity::Warning,
            FilterError::InvalidLocation(_) => ErrorSeverity::Warning,
            FilterError::StorageError(_) => ErrorSeverity::Error,
            FilterError::QuotaExceeded { .. } => ErrorSeverity::Error,
            FilterError::MessagingError(_) => ErrorSeverity::Info,
            FilterError::ParseError(_) => ErrorSeverity::Error,
            FilterError::SerializationError(_) => ErrorSeverity::Error,
            FilterError::InternalError(_) => ErrorSeverity::Critical,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(mut self, context: T) -> Self {
        match &mut self {
            FilterError::ConfigError(msg)
            | FilterError::InvalidLocation(msg)
            | FilterError::StorageError(msg)
            | FilterError::MessagingError(msg)
            | FilterError::ParseError(msg)
            | FilterError::SerializationError(msg)
            | FilterError::InternalError(msg)
            | FilterError::InvalidSiteDescriptor { reason: msg, .. }
            | FilterError::InvalidSelector { reason: msg, .. }
            | FilterError::InvalidPattern { reason: msg, .. } => {
                *msg = format!("{} (上下文: {})", msg, context)
            }
            FilterError::QuotaExceeded { .. } => {}
        }

        self
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl From<std::io::Error> for FilterError {
    fn from(error: std::io::Error) -> Self {
        helpers::storage_error(format_args!("IO错误: {}", error))
    }
}

impl From<serde_json::Error> for FilterError {
    fn from(error: serde_json::Error) -> Self {
        FilterError::SerializationError(format!("JSON序列化错误: {}", error))
    }
}

impl From<toml::de::Error> for FilterError {
    fn from(error: toml::de::Error) -> Self {
        FilterError::ParseError(format!("TOML解析错误: {}", error))
    }
}

impl From<toml::ser::Error> for FilterError {
    fn from(error: toml::ser::Error) -> Self {
        FilterError::SerializationError(format!("TOML序列化错误: {}", error))
    }
}

impl From<url::ParseError> for FilterError {
    fn from(error: url::ParseError) -> Self {
        FilterError::InvalidLocation(error.to_string())
    }
}

impl From<regex::Error> for FilterError {
    fn from(error: regex::Error) -> Self {
        FilterError::InvalidPattern {
            word: String::new(),
            reason: error.to_string(),
        }
    }
}

macro_rules! impl_from_redb {
    ($($error:ty),* $(,)?) => {
        $(
            impl From<$error> for FilterError {
                fn from(error: $error) -> Self {
                    helpers::storage_error(format_args!("redb: {}", error))
                }
            }
        )*
    };
}

impl_from_redb!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

impl From<crate::env::EnvError> for FilterError {
    fn from(error: crate::env::EnvError) -> Self {
        FilterError::ConfigError(error.to_string())
    }
}

/// 错误结果类型别名
pub type FilterResult<T> = Result<T, FilterError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误
    pub fn log_error(error: &FilterError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("过滤信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("过滤警告: {}", error),
            ErrorSeverity::Error => tracing::error!("过滤错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("过滤严重错误: {}", error),
        }
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> FilterError {
        FilterError::ConfigError(msg.to_string())
    }

    /// 创建存储错误
    pub fn storage_error<T: fmt::Display>(msg: T) -> FilterError {
        FilterError::StorageError(msg.to_string())
    }

    /// 创建内部错误
    pub fn internal_error<T: fmt::Display>(msg: T) -> FilterError {
        FilterError::InternalError(msg.to_string())
    }
}
