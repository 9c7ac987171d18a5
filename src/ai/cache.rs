//! Generation Response Cache
//!
//! Avoids repeated paid provider calls for identical requests.
//!
//! ## Cache Keys
//!
//! SHA-256 over framework id, policy type, customization level,
//! organisation name and industry, truncated to 32 hex chars. Nothing else
//! (timestamps, audience, language, employee count) influences the key.
//!
//! ## Bounds
//!
//! Unbounded and non-expiring unless `max_entries` / `ttl` are configured.
//! When full, the oldest-inserted entry is evicted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::constants::cache::KEY_HEX_LEN;
use crate::types::{GenerationRequest, GenerationResult};

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Maximum number of entries (None = unbounded)
    pub max_entries: Option<usize>,
    /// Entry lifetime (None = process lifetime)
    pub ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: None,
            ttl: None,
        }
    }
}

/// Deterministic cache key for a request
pub fn cache_key(request: &GenerationRequest) -> String {
    let ctx = &request.business_context;
    let fields = [
        request.framework_id.trim().to_ascii_uppercase(),
        request.policy_type.as_str().to_string(),
        request.customization_level.as_str().to_string(),
        ctx.organization_name.trim().to_string(),
        ctx.industry.trim().to_string(),
    ];

    let mut hasher = Sha256::new();
    for field in &fields {
        // Length prefix keeps ("ab", "c") and ("a", "bc") apart
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    let digest = format!("{:x}", hasher.finalize());
    digest[..KEY_HEX_LEN].to_string()
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: GenerationResult,
    inserted_at: Instant,
    sequence: u64,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Concurrent in-memory response cache
pub struct ResponseCache {
    config: CacheConfig,
    entries: DashMap<String, CacheEntry>,
    sequence: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
            sequence: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Cached result marked `was_cached`, if present and fresh
    pub fn get(&self, key: &str) -> Option<GenerationResult> {
        if !self.config.enabled {
            return None;
        }

        let found = self
            .entries
            .get(key)
            .map(|entry| (self.is_expired(&entry), entry.result.as_cached()));

        match found {
            Some((false, result)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit: {}", key);
                Some(result)
            }
            Some((true, _)) => {
                self.remove_expired(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache entry expired: {}", key);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a result, evicting the oldest entry when the cache is full
    pub fn put(&self, key: String, result: GenerationResult) {
        if !self.config.enabled {
            return;
        }

        if let Some(max) = self.config.max_entries
            && !self.entries.contains_key(&key)
        {
            while self.entries.len() >= max.max(1) {
                if !self.evict_oldest() {
                    break;
                }
            }
        }

        let entry = CacheEntry {
            result,
            inserted_at: Instant::now(),
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        };
        self.entries.insert(key, entry);
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.config
            .ttl
            .is_some_and(|ttl| entry.inserted_at.elapsed() >= ttl)
    }

    /// Drop `key` only if the entry stored now is expired; a fresher `put`
    /// landing after the caller's check survives
    fn remove_expired(&self, key: &str) -> bool {
        self.entries
            .remove_if(key, |_, entry| self.is_expired(entry))
            .is_some()
    }

    fn evict_oldest(&self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().sequence)
            .map(|entry| entry.key().clone());

        match oldest {
            Some(key) => {
                debug!("Cache evicting: {}", key);
                self.entries.remove(&key).is_some()
            }
            None => false,
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::request::sample_request;
    use crate::types::{CustomizationLevel, PolicyType, TargetAudience, UsageEstimate};
    use proptest::prelude::*;

    fn result_for(request: &GenerationRequest) -> GenerationResult {
        GenerationResult::generated(
            request,
            "# Policy".to_string(),
            "google",
            "gemini",
            0.9,
            UsageEstimate::default(),
            10,
        )
    }

    #[test]
    fn test_key_shape() {
        let key = cache_key(&sample_request());
        assert_eq!(key.len(), 32);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_ignores_non_identity_fields() {
        let a = sample_request();
        let mut b = sample_request();
        b.target_audience = TargetAudience::Regulators;
        b.language = "cy-GB".to_string();
        b.business_context.employee_count = 9_999;
        b.business_context.data_types.clear();
        assert_eq!(cache_key(&a), cache_key(&b));
    }

    #[test]
    fn test_key_changes_with_identity_fields() {
        let base = cache_key(&sample_request());

        let mut other = sample_request();
        other.policy_type = PolicyType::DataRetention;
        assert_ne!(cache_key(&other), base);

        let mut other = sample_request();
        other.customization_level = CustomizationLevel::Comprehensive;
        assert_ne!(cache_key(&other), base);

        let mut other = sample_request();
        other.business_context.industry = "Healthcare".to_string();
        assert_ne!(cache_key(&other), base);
    }

    #[test]
    fn test_hit_is_marked_cached() {
        let cache = ResponseCache::default();
        let request = sample_request();
        let key = cache_key(&request);
        let original = result_for(&request);

        assert!(cache.get(&key).is_none());
        cache.put(key.clone(), original.clone());

        let hit = cache.get(&key).unwrap();
        assert!(hit.was_cached);
        assert_eq!(hit.content, original.content);
        assert_eq!(cache.stats(), CacheStats { entries: 1, hits: 1, misses: 1 });
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache = ResponseCache::new(CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        });
        let request = sample_request();
        cache.put(cache_key(&request), result_for(&request));
        assert!(cache.get(&cache_key(&request)).is_none());
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_max_entries_evicts_oldest() {
        let cache = ResponseCache::new(CacheConfig {
            max_entries: Some(2),
            ..CacheConfig::default()
        });
        let request = sample_request();

        cache.put("a".to_string(), result_for(&request));
        cache.put("b".to_string(), result_for(&request));
        cache.put("c".to_string(), result_for(&request));

        assert_eq!(cache.stats().entries, 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_ttl_expires_entries() {
        let cache = ResponseCache::new(CacheConfig {
            ttl: Some(Duration::from_millis(1)),
            ..CacheConfig::default()
        });
        let request = sample_request();
        cache.put("k".to_string(), result_for(&request));
        std::thread::sleep(Duration::from_millis(10));

        assert!(cache.get("k").is_none());
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_expiry_spares_entry_replaced_after_check() {
        let cache = ResponseCache::new(CacheConfig {
            ttl: Some(Duration::from_millis(20)),
            ..CacheConfig::default()
        });
        let request = sample_request();
        cache.put("k".to_string(), result_for(&request));
        std::thread::sleep(Duration::from_millis(30));

        let stale = cache.entries.get("k").map(|e| cache.is_expired(&e));
        assert_eq!(stale, Some(true));

        // Another request stores a fresh result before the stale one is dropped
        cache.put("k".to_string(), result_for(&request));
        assert!(!cache.remove_expired("k"));
        assert!(cache.get("k").is_some());
    }

    #[test]
    fn test_clear() {
        let cache = ResponseCache::default();
        let request = sample_request();
        cache.put("k".to_string(), result_for(&request));
        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }

    proptest! {
        #[test]
        fn prop_identity_fields_determine_key(
            org in "[A-Za-z0-9 ]{1,40}",
            industry in "[A-Za-z]{1,20}",
            employees_a in 1u32..10_000,
            employees_b in 1u32..10_000,
            cross_border in any::<bool>(),
        ) {
            let mut r1 = sample_request();
            r1.business_context.organization_name = org.clone();
            r1.business_context.industry = industry.clone();
            r1.business_context.employee_count = employees_a;

            let mut r2 = r1.clone();
            r2.business_context.employee_count = employees_b;
            r2.business_context.cross_border_transfers = cross_border;
            r2.target_audience = TargetAudience::Management;

            prop_assert_eq!(cache_key(&r1), cache_key(&r2));

            let cache = ResponseCache::default();
            cache.put(cache_key(&r1), result_for(&r1));
            let hit = cache.get(&cache_key(&r2));
            prop_assert!(hit.is_some_and(|h| h.was_cached));
        }
    }
}
