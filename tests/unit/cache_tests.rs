/*!
 * Tests for the cache backend
 */

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use weblate_trans::cache::{CacheBackend, MemoryCache};

#[test]
fn test_memoryCache_withDisabled_shouldNeverStore() {
    let cache = MemoryCache::new(false, Duration::from_secs(60));
    assert!(!cache.is_enabled());
    cache.set("counts-x", json!(3), None);

    assert!(cache.get("counts-x").is_none());
    assert!(cache.is_empty());
}

#[test]
fn test_memoryCache_delete_shouldRemoveEntry() {
    let cache = MemoryCache::new(true, Duration::from_secs(60));
    cache.set("a", json!("x"), None);
    cache.set("b", json!("y"), None);

    cache.delete("a");
    assert!(cache.get("a").is_none());
    assert_eq!(cache.get("b"), Some(json!("y")));
}

#[test]
fn test_memoryCache_clear_shouldResetStats() {
    let cache = MemoryCache::default();
    cache.set("a", json!(1), None);
    let _ = cache.get("a");
    let _ = cache.get("missing");

    let (hits, misses, rate) = cache.stats();
    assert_eq!((hits, misses), (1, 1));
    assert!((rate - 0.5).abs() < f64::EPSILON);

    cache.clear();
    assert_eq!(cache.stats().0, 0);
    assert!(cache.is_empty());
}

#[test]
fn test_memoryCache_purgeExpired_shouldDropOnlyExpired() {
    let cache = MemoryCache::default();
    cache.set("gone", json!(1), Some(Duration::from_millis(0)));
    cache.set("kept", json!(2), None);
    std::thread::sleep(Duration::from_millis(5));

    assert_eq!(cache.purge_expired(), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_memoryCache_asTraitObject_shouldShareEntriesBetweenClones() {
    let cache = MemoryCache::default();
    let backend: Arc<dyn CacheBackend> = Arc::new(cache.clone());

    backend.set("shared", json!(42), None);
    assert_eq!(cache.get("shared"), Some(json!(42)));
}
