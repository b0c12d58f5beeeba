//! 配置存储集成测试
//!
//! 拆分保存、合并加载、配额失败以及磁盘存储的持久化

use serde_json::Value;
use tempfile::TempDir;

use webfilter::actions::{self, DomainAction};
use webfilter::config::Config;
use webfilter::storage::quota::{chunk_index, combine, json_bytes, split, JsonMap};
use webfilter::{ConfigStore, FilterError, MemoryStorage, RedbStorage, StorageBackend};

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::TestDataGenerator;

fn large_config() -> Config {
    let mut cfg = Config::default();
    cfg.max_bytes = 2048;
    cfg.domains = TestDataGenerator::domains(120);
    cfg.words.extend(TestDataGenerator::words(150));
    cfg
}

#[test]
fn test_large_config_round_trip_through_chunks() {
    let cfg = large_config();
    let mut store = ConfigStore::new(MemoryStorage::new());
    store.save(&cfg).unwrap();

    let items = store.backend().items();
    assert!(!items.contains_key("domains"));
    assert!(!items.contains_key("words"));

    let mut domain_chunks: Vec<usize> = items
        .keys()
        .filter_map(|key| chunk_index(key, "domains"))
        .collect();
    domain_chunks.sort_unstable();
    assert!(domain_chunks.len() > 1);
    assert_eq!(domain_chunks, (0..domain_chunks.len()).collect::<Vec<_>>());

    for (key, value) in items {
        if chunk_index(key, "domains").is_some() && value.as_object().unwrap().len() > 1 {
            assert!(json_bytes(value) <= cfg.max_bytes);
        }
    }

    let loaded = store.load().unwrap();
    assert_eq!(loaded, cfg);
    assert_eq!(
        loaded.domains.keys().collect::<Vec<_>>(),
        cfg.domains.keys().collect::<Vec<_>>()
    );
}

#[test]
fn test_split_is_left_inverse_for_many_thresholds() {
    let domains = large_config().domains;
    let mapping: JsonMap = match serde_json::to_value(&domains).unwrap() {
        Value::Object(mapping) => mapping,
        _ => unreachable!(),
    };
    let largest = mapping
        .iter()
        .map(|(key, value)| {
            let mut single = JsonMap::new();
            single.insert(key.clone(), value.clone());
            json_bytes(&Value::Object(single))
        })
        .max()
        .unwrap();

    for max_bytes in [largest, largest + 1, 500, 4096, 1 << 20] {
        let chunks = split(&mapping, max_bytes);
        assert_eq!(combine(&chunks), mapping, "max_bytes = {}", max_bytes);
        let keys: Vec<&String> = chunks.iter().flat_map(|chunk| chunk.keys()).collect();
        assert_eq!(keys.len(), mapping.len());
    }
}

#[test]
fn test_shrinking_config_removes_stale_chunks() {
    let mut cfg = large_config();
    let mut store = ConfigStore::new(MemoryStorage::new());
    store.save(&cfg).unwrap();

    cfg.domains.truncate(3);
    store.save(&cfg).unwrap();

    let chunk_keys: Vec<&String> = store
        .backend()
        .items()
        .keys()
        .filter(|key| chunk_index(key, "domains").is_some())
        .collect();
    assert_eq!(chunk_keys, vec!["_domains0"]);
    assert_eq!(store.load().unwrap().domains.len(), 3);
}

#[test]
fn test_quota_failure_surfaces_and_keeps_previous_state() {
    let mut cfg = Config::default();
    cfg.max_bytes = 1 << 20;
    cfg.domains = TestDataGenerator::domains(50);

    let mut store = ConfigStore::new(MemoryStorage::with_quota(1024));
    let error = store.save(&cfg).unwrap_err();
    assert!(matches!(error, FilterError::QuotaExceeded { .. }));
    assert!(store.backend().items().is_empty());
    assert_eq!(cfg.domains.len(), 50);
}

#[test]
fn test_redb_storage_persists_configuration() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.redb");
    let cfg = large_config();

    {
        let mut store = ConfigStore::new(RedbStorage::open(&path).unwrap());
        store.save(&cfg).unwrap();
    }

    let store = ConfigStore::new(RedbStorage::open(&path).unwrap());
    assert!(store.backend().keys().unwrap().contains(&"_words0".to_string()));
    assert_eq!(store.load().unwrap(), cfg);
}

#[test]
fn test_actions_against_disk_storage() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.redb");
    let mut store = ConfigStore::new(RedbStorage::open(&path).unwrap());

    assert!(actions::add_selection(&mut store, "Frak").unwrap());
    assert!(actions::toggle_domain(&mut store, "www.example.com", DomainAction::Advanced).unwrap());

    let cfg = store.load().unwrap();
    assert!(cfg.words.contains_key("frak"));
    assert_eq!(cfg.domains["www.example.com"].adv, Some(true));

    assert!(actions::toggle_domain(&mut store, "www.example.com", DomainAction::Advanced).unwrap());
    assert!(store.load().unwrap().domains.is_empty());
}
