//! 配置操作
//!
//! 添加/删除选中词条以及切换域名开关，结果写回存储；
//! 返回 true 表示配置已保存，页面需要重新加载。

use crate::domain::Domain;
use crate::error::FilterResult;
use crate::storage::{ConfigStore, StorageBackend};

/// 域名开关
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainAction {
    Disable,
    Advanced,
}

/// 切换主机名对应域名的开关
pub fn toggle_domain<B: StorageBackend>(
    store: &mut ConfigStore<B>,
    hostname: &str,
    action: DomainAction,
) -> FilterResult<bool> {
    let mut cfg = store.load()?;
    let mut domain = Domain::by_hostname(hostname, &cfg.domains);

    match action {
        DomainAction::Disable => domain.toggle_disabled(cfg.enabled_domains_only),
        DomainAction::Advanced => domain.toggle_advanced(),
    }
    domain.save(&mut cfg);

    store.save_fields(&cfg, Some(&["domains"][..]))?;
    tracing::info!("域名 {} 已切换 {:?}", domain.cfg_key, action);
    Ok(true)
}

/// 添加选中的文本为词条，已存在时不写入
pub fn add_selection<B: StorageBackend>(
    store: &mut ConfigStore<B>,
    selection: &str,
) -> FilterResult<bool> {
    let mut cfg = store.load()?;
    if !cfg.add_word(selection) {
        tracing::debug!("词条已存在或为空: '{}'", selection);
        return Ok(false);
    }
    store.save_fields(&cfg, Some(&["words"][..]))?;
    Ok(true)
}

/// 删除选中的词条，不存在时不写入
pub fn remove_selection<B: StorageBackend>(
    store: &mut ConfigStore<B>,
    selection: &str,
) -> FilterResult<bool> {
    let mut cfg = store.load()?;
    if !cfg.remove_word(selection) {
        tracing::debug!("词条不存在: '{}'", selection);
        return Ok(false);
    }
    store.save_fields(&cfg, Some(&["words"][..]))?;
    Ok(true)
}
