//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量管理

use std::env;
use std::fmt;
use std::path::PathBuf;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "WEBFILTER_LOG_LEVEL";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("warn".to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }

    /// 禁用颜色输出
    pub struct NoColor;
    impl EnvVar<bool> for NoColor {
        const NAME: &'static str = "NO_COLOR";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Disable colored output when set to any value";

        fn parse(value: &str) -> EnvResult<bool> {
            // NO_COLOR 遵循标准：任何值都表示禁用颜色
            Ok(!value.is_empty())
        }
    }
}

/// 配置文件相关环境变量
pub mod config {
    use super::*;

    /// 配置文件路径
    pub struct ConfigPath;
    impl EnvVar<PathBuf> for ConfigPath {
        const NAME: &'static str = "WEBFILTER_CONFIG";
        const DEFAULT: Option<PathBuf> = None;
        const DESCRIPTION: &'static str = "Path to a TOML configuration file";

        fn parse(value: &str) -> EnvResult<PathBuf> {
            let path = value.trim();
            if path.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Path must not be empty".to_string(),
                });
            }
            Ok(PathBuf::from(path))
        }
    }
}

/// 存储相关环境变量
pub mod storage {
    use super::*;

    /// 拆分字段的单块字节上限
    pub struct MaxBytes;
    impl EnvVar<usize> for MaxBytes {
        const NAME: &'static str = "WEBFILTER_MAX_BYTES";
        const DEFAULT: Option<usize> = Some(6500);
        const DESCRIPTION: &'static str =
            "Maximum compact JSON size of one stored chunk of words or domains";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 64, 1024 * 1024)
        }
    }

    /// 磁盘存储文件路径
    pub struct StoragePath;
    impl EnvVar<PathBuf> for StoragePath {
        const NAME: &'static str = "WEBFILTER_STORAGE_PATH";
        const DEFAULT: Option<PathBuf> = None;
        const DESCRIPTION: &'static str = "Path of the on-disk settings database";

        fn parse(value: &str) -> EnvResult<PathBuf> {
            let path = value.trim();
            if path.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Path must not be empty".to_string(),
                });
            }
            Ok(PathBuf::from(path))
        }
    }
}

fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

/// 环境变量配置汇总
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub log_level: String,
    pub no_color: bool,
    pub config_path: Option<PathBuf>,
    pub max_bytes: usize,
    pub storage_path: Option<PathBuf>,
}

impl EnvConfig {
    /// 从环境变量加载配置，先读取 `.env` 文件
    pub fn from_env() -> EnvResult<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            log_level: core::LogLevel::get()?,
            no_color: core::NoColor::get()?,
            config_path: config::ConfigPath::get().ok(),
            max_bytes: storage::MaxBytes::get()?,
            storage_path: storage::StoragePath::get().ok(),
        })
    }
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables Documentation\n\n");

    docs.push_str("## Core Configuration\n\n");
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        core::LogLevel::NAME,
        core::LogLevel::DESCRIPTION,
        core::LogLevel::DEFAULT
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        core::NoColor::NAME,
        core::NoColor::DESCRIPTION,
        core::NoColor::DEFAULT
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        config::ConfigPath::NAME,
        config::ConfigPath::DESCRIPTION,
        config::ConfigPath::DEFAULT
    ));

    docs.push_str("\n## Storage Configuration\n\n");
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        storage::MaxBytes::NAME,
        storage::MaxBytes::DESCRIPTION,
        storage::MaxBytes::DEFAULT
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        storage::StoragePath::NAME,
        storage::StoragePath::DESCRIPTION,
        storage::StoragePath::DEFAULT
    ));

    docs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(core::LogLevel::parse("DEBUG").unwrap(), "debug");
        assert_eq!(core::LogLevel::parse("warn").unwrap(), "warn");
        assert!(core::LogLevel::parse("loud").is_err());
    }

    #[test]
    fn test_no_color_parsing() {
        assert!(core::NoColor::parse("1").unwrap());
        assert!(!core::NoColor::parse("").unwrap());
    }

    #[test]
    fn test_numeric_validation() {
        assert_eq!(storage::MaxBytes::parse("6500").unwrap(), 6500);
        assert_eq!(storage::MaxBytes::parse(" 128 ").unwrap(), 128);

        // 测试超出范围
        assert!(storage::MaxBytes::parse("10").is_err());
        assert!(storage::MaxBytes::parse("99999999").is_err());
        assert!(storage::MaxBytes::parse("lots").is_err());
    }

    #[test]
    fn test_path_validation() {
        assert_eq!(
            config::ConfigPath::parse("/etc/webfilter.toml").unwrap(),
            PathBuf::from("/etc/webfilter.toml")
        );
        assert!(storage::StoragePath::parse("   ").is_err());
    }

    #[test]
    fn test_env_docs_list_every_variable() {
        let docs = generate_env_docs();
        for name in [
            "WEBFILTER_LOG_LEVEL",
            "NO_COLOR",
            "WEBFILTER_CONFIG",
            "WEBFILTER_MAX_BYTES",
            "WEBFILTER_STORAGE_PATH",
        ] {
            assert!(docs.contains(name), "missing {}", name);
        }
    }
}
