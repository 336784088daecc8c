use favscan::cache::{
    open_cache, CacheEntry, CacheError, CacheOptions, FileRecord, MemoryCache, MetadataCache,
    RedisCache, RedisOptions, MEMORY_URL,
};
use favscan::scanner::{hash_path, REVERSE_KEY_PREFIX};
use chrono::{TimeZone, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn record(size: u64) -> FileRecord {
    FileRecord::new(size, Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap())
}

#[test]
fn test_memory_cache_through_trait_object() {
    let cache: Arc<dyn MetadataCache> = open_cache(MEMORY_URL, &CacheOptions::default()).unwrap();

    let entry = CacheEntry::new(
        hash_path("/data/a.iso"),
        "/data/a.iso".to_string(),
        record(42),
    );
    cache.set_many(&entry.to_writes().unwrap()).unwrap();

    let stored = cache.get(entry.key.as_str()).unwrap().unwrap();
    assert_eq!(FileRecord::decode(&stored).unwrap(), record(42));
    assert_eq!(
        cache.get(&entry.key.reverse_key()).unwrap(),
        Some(b"/data/a.iso".to_vec())
    );
    assert_eq!(cache.get("missing").unwrap(), None);
}

#[test]
fn test_scan_lists_records_and_reverse_entries() {
    let cache = MemoryCache::new();
    for path in ["/a", "/b", "/c"] {
        let entry = CacheEntry::new(hash_path(path), path.to_string(), record(1));
        cache.set_many(&entry.to_writes().unwrap()).unwrap();
    }

    let keys: HashSet<String> = cache.scan_keys().unwrap().map(Result::unwrap).collect();
    assert_eq!(keys.len(), 6);
    assert_eq!(
        keys.iter().filter(|k| k.starts_with(REVERSE_KEY_PREFIX)).count(),
        3
    );
    assert!(keys.contains(hash_path("/b").as_str()));
}

#[test]
fn test_scan_can_be_restarted_by_calling_again() {
    let cache = MemoryCache::new();
    cache.set("k1", b"v").unwrap();

    let mut first = cache.scan_keys().unwrap();
    assert!(first.next().is_some());
    assert!(first.next().is_none());

    cache.set("k2", b"v").unwrap();
    assert_eq!(cache.scan_keys().unwrap().count(), 2);
}

#[test]
fn test_concurrent_writers_share_one_cache() {
    let cache: Arc<dyn MetadataCache> = Arc::new(MemoryCache::new());
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for i in 0..50 {
                    let path = format!("/t{t}/f{i}");
                    let entry = CacheEntry::new(hash_path(&path), path, record(i));
                    cache.set_many(&entry.to_writes().unwrap()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.scan_keys().unwrap().count(), 800);
}

#[test]
fn test_open_cache_rejects_unknown_scheme() {
    let result = open_cache("ftp://example.com", &CacheOptions::default());
    assert!(matches!(result, Err(CacheError::Connection { .. })));
}

#[test]
fn test_open_cache_unreachable_redis_is_fatal() {
    let options = CacheOptions {
        connect_timeout: Duration::from_millis(200),
        ..Default::default()
    };
    let result = open_cache("redis://127.0.0.1:1/", &options);
    match result {
        Err(CacheError::Connection { url, .. }) => assert_eq!(url, "redis://127.0.0.1:1/"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("connected to a port nothing listens on"),
    }
}

#[test]
fn test_redis_cache_construction_is_lazy() {
    let cache = RedisCache::new("redis://127.0.0.1:1/0", RedisOptions::default()).unwrap();
    assert_eq!(cache.url(), "redis://127.0.0.1:1/0");
    assert_eq!(cache.idle_connections(), 0);
}
