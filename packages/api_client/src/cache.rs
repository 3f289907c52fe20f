//! Response caching.

use std::collections::HashMap;

use moka::sync::Cache;
use serde_json::Value;
use strum::IntoEnumIterator;

use crate::cache_registry::CacheDomain;

/// A store for parsed upstream responses, keyed per domain by request
/// signature.
pub trait ResponseCache: Send + Sync {
    fn get(&self, domain: CacheDomain, key: &str) -> Option<Value>;

    fn insert(&self, domain: CacheDomain, key: String, value: Value);
}

/// In-process cache with one bounded TTL cache per domain.
pub struct MokaResponseCache {
    caches: HashMap<CacheDomain, Cache<String, Value>>,
}

impl MokaResponseCache {
    /// Creates the caches of every domain, each holding at most `capacity`
    /// entries for the domain's registered lifetime.
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        let caches = CacheDomain::iter()
            .map(|domain| {
                let settings = domain.settings();
                log::debug!(
                    "Response cache '{}': {capacity} entries, {}s lifetime",
                    settings.name,
                    settings.ttl_seconds
                );
                let cache = Cache::builder()
                    .max_capacity(capacity)
                    .time_to_live(settings.ttl())
                    .build();
                (domain, cache)
            })
            .collect();
        Self { caches }
    }
}

impl ResponseCache for MokaResponseCache {
    fn get(&self, domain: CacheDomain, key: &str) -> Option<Value> {
        self.caches.get(&domain)?.get(key)
    }

    fn insert(&self, domain: CacheDomain, key: String, value: Value) {
        if let Some(cache) = self.caches.get(&domain) {
            cache.insert(key, value);
        }
    }
}

/// Cache key of a request: method, full URL and the bearer token, if any.
#[must_use]
pub fn request_signature(method: &str, url: &str, token: Option<&str>) -> String {
    token.map_or_else(
        || format!("{method} {url}"),
        |token| format!("{method} {url} Bearer {token}"),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn stores_per_domain() {
        let cache = MokaResponseCache::new(10);
        cache.insert(CacheDomain::Birds, "GET a".to_string(), json!([1]));
        assert_eq!(cache.get(CacheDomain::Birds, "GET a"), Some(json!([1])));
        assert_eq!(cache.get(CacheDomain::Gbif, "GET a"), None);
    }

    #[test]
    fn signature_includes_token() {
        assert_ne!(
            request_signature("GET", "https://x/a", Some("t1")),
            request_signature("GET", "https://x/a", Some("t2"))
        );
        assert_ne!(
            request_signature("GET", "https://x/a", None),
            request_signature("GET", "https://x/a", Some("t1"))
        );
        assert_eq!(request_signature("GET", "https://x/a", None), "GET https://x/a");
    }
}
