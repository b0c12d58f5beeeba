//! 日志初始化
//!
//! 基于 tracing-subscriber 的 fmt 订阅器，输出到标准错误

use tracing_subscriber::EnvFilter;

use crate::env::{core, EnvVar};
use crate::error::helpers::internal_error;
use crate::error::{FilterError, FilterResult};

/// 安装全局日志订阅器
///
/// 级别优先取参数，其次 `WEBFILTER_LOG_LEVEL`，最后 `RUST_LOG`。
pub fn init_tracing(level: Option<&str>) -> FilterResult<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)
            .map_err(|e| FilterError::ConfigError(format!("日志级别无效: {}", e)))?,
        None => match std::env::var(core::LogLevel::NAME) {
            Ok(_) => EnvFilter::new(core::LogLevel::get()?),
            Err(_) => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(core::LogLevel::get_or_default("warn".into()))),
        },
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!core::NoColor::get_or_default(false))
        .with_target(false)
        .try_init()
        .map_err(|e| internal_error(format!("日志系统已初始化: {}", e)))
}
