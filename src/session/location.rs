//! 页面位置

use url::Url;

use crate::error::FilterResult;

/// 用于策略判断的页面位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub hostname: String,
    pub href: String,
    /// 去掉开头 `/` 的路径
    pub pathname: String,
}

impl Location {
    pub fn parse(href: &str) -> FilterResult<Self> {
        let url = Url::parse(href)?;
        let pathname = url.path();
        Ok(Self {
            hostname: url.host_str().unwrap_or_default().to_lowercase(),
            href: url.to_string(),
            pathname: pathname.strip_prefix('/').unwrap_or(pathname).to_string(),
        })
    }

    /// 框架内的文档使用顶层页面的地址
    pub fn resolve(document_href: &str, top_href: Option<&str>) -> FilterResult<Self> {
        match top_href {
            Some(top) if top != document_href => Self::parse(top),
            _ => Self::parse(document_href),
        }
    }
}
