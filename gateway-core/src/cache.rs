//! Response Cache.
//!
//! Wraps a [`KvStore`], encoding and decoding [`CacheItem`]s, applying
//! per-status-class TTL, enforcing the admission policy, and supporting
//! prefix invalidation. Holds no in-process mutable state of its own —
//! serialization between concurrent readers and writers is delegated to the
//! store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache_key::{CacheKeyBuilder, RequestFingerprint};
use crate::cancel::CancellationToken;
use crate::error::GatewayResult;
use crate::model::RouteConfig;
use crate::store::KvStore;
use crate::trie::Params;

/// Responses larger than this are never admitted to the cache.
pub const MAX_CACHEABLE_BODY_BYTES: usize = 1024 * 1024;

/// The wire form of a cached response.
/// `data` accepts either a JSON string or a JSON object on read, to stay
/// compatible with deployments that stored structured bodies directly as
/// objects; on write the core always emits a base64 string.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheItem {
    data: serde_json::Value,
    expires_at: DateTime<Utc>,
    status: u16,
    headers: HashMap<String, String>,
}

/// A successful cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub data: Vec<u8>,
    pub status: u16,
    pub headers: HashMap<String, String>,
}

/// TTL, in seconds, for a given upstream status.
pub fn ttl_for_status(status: u16) -> u64 {
    match status {
        200 => 600,
        201 => 300,
        204 => 60,
        404 => 120,
        429 => 30,
        500 | 502 | 503 => 10,
        _ => 300,
    }
}

/// Applies the cache admission policy. `request_headers` and
/// `response_headers` are consulted case-insensitively.
pub fn should_cache(
    request_headers: &HashMap<String, String>,
    response_status: u16,
    response_body_len: usize,
    response_headers: &HashMap<String, String>,
) -> bool {
    if (400..600).contains(&response_status) && response_status != 404 {
        return false;
    }
    if response_body_len > MAX_CACHEABLE_BODY_BYTES {
        return false;
    }
    if header_eq_ignore_case(request_headers, "cache-control", "no-cache") {
        return false;
    }
    if find_header(request_headers, "authorization").is_some() {
        return false;
    }
    if let Some(content_type) = find_header(response_headers, "content-type") {
        if content_type.to_ascii_lowercase().contains("stream") {
            return false;
        }
    }
    true
}

fn find_header<'a>(headers: &'a HashMap<String, String>, wanted_lower: &str) -> Option<&'a str> {
    headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(wanted_lower)).map(|(_, v)| v.as_str())
}

fn header_eq_ignore_case(headers: &HashMap<String, String>, name_lower: &str, value_lower: &str) -> bool {
    find_header(headers, name_lower).map(|v| v.eq_ignore_ascii_case(value_lower)).unwrap_or(false)
}

/// Wraps a [`KvStore`]; every method degrades to a safe no-op when the store
/// reports itself disabled.
pub struct ResponseCache {
    store: Arc<dyn KvStore>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    fn enabled(&self) -> bool {
        self.store.is_enabled()
    }

    /// Builds the cache key for one request against `route`.
    pub fn key(&self, route: &RouteConfig, uri_params: &Params, fingerprint: &RequestFingerprint<'_>) -> String {
        CacheKeyBuilder::build(route, uri_params, fingerprint)
    }

    pub fn should_cache(
        &self,
        request_headers: &HashMap<String, String>,
        status: u16,
        body_len: usize,
        response_headers: &HashMap<String, String>,
    ) -> bool {
        should_cache(request_headers, status, body_len, response_headers)
    }

    /// Looks up `key`. A decode error or an expired item is treated as a
    /// miss, and the key is removed in either case.
    pub async fn get(&self, cancel: &CancellationToken, key: &str) -> GatewayResult<Option<CacheEntry>> {
        if !self.enabled() {
            return Ok(None);
        }
        cancel.check()?;
        let Some(raw) = self.store.get(cancel, key).await? else {
            return Ok(None);
        };
        cancel.check()?;

        let item: CacheItem = match serde_json::from_slice(&raw) {
            Ok(item) => item,
            Err(e) => {
                log::warn!("dropping undecodable cache entry {}: {}", key, e);
                self.store.delete_by_pattern(cancel, key).await.ok();
                return Ok(None);
            }
        };

        if item.expires_at <= Utc::now() {
            log::debug!("cache entry {} expired at {}", key, item.expires_at);
            self.store.delete_by_pattern(cancel, key).await.ok();
            return Ok(None);
        }

        let data = decode_data(&item.data);
        Ok(Some(CacheEntry { data, status: item.status, headers: item.headers }))
    }

    /// Admits `data` under `key` with the TTL derived from `status`.
    /// Callers are expected to have already consulted [`Self::should_cache`].
    pub async fn set(
        &self,
        cancel: &CancellationToken,
        key: &str,
        data: &[u8],
        status: u16,
        headers: HashMap<String, String>,
    ) -> GatewayResult<()> {
        let ttl = ttl_for_status(status);
        let expires_at = Utc::now() + chrono::Duration::seconds(ttl as i64);
        self.set_until(cancel, key, data, status, headers, expires_at, ttl).await
    }

    /// Shared admission path behind [`Self::set`]. `ttl_secs` is passed
    /// through to the backing store separately from `expires_at` since some
    /// stores (e.g. Redis) enforce their own TTL independent of the item's
    /// self-reported expiry.
    async fn set_until(
        &self,
        cancel: &CancellationToken,
        key: &str,
        data: &[u8],
        status: u16,
        headers: HashMap<String, String>,
        expires_at: DateTime<Utc>,
        ttl_secs: u64,
    ) -> GatewayResult<()> {
        if !self.enabled() {
            return Ok(());
        }
        cancel.check()?;
        let item = CacheItem { data: serde_json::Value::String(base64_encode(data)), expires_at, status, headers };
        let encoded = serde_json::to_vec(&item).map_err(|e| crate::error::GatewayError::CacheStore(e.to_string()))?;
        self.store.set(cancel, key, encoded, ttl_secs).await
    }

    /// Admits `data` under `key` with an explicit expiry instant instead of
    /// one derived from `status`. Exists so tests can drive an item past
    /// expiry deterministically, without depending on the real clock.
    #[cfg(test)]
    async fn set_with_expiry(
        &self,
        cancel: &CancellationToken,
        key: &str,
        data: &[u8],
        status: u16,
        headers: HashMap<String, String>,
        expires_at: DateTime<Utc>,
    ) -> GatewayResult<()> {
        self.set_until(cancel, key, data, status, headers, expires_at, 0).await
    }

    /// Deletes every cached entry for `slug`.
    pub async fn invalidate_path(&self, cancel: &CancellationToken, slug: &str) -> GatewayResult<()> {
        if !self.enabled() {
            return Ok(());
        }
        cancel.check()?;
        let prefix = format!("integration:{slug}:");
        self.store.delete_by_pattern(cancel, &prefix).await
    }

    /// Passes through to the backing store's occupancy stats. A disabled
    /// store reports zero rather than erroring, consistent with every other
    /// cache operation's no-op fallback.
    pub async fn stats(&self, cancel: &CancellationToken) -> GatewayResult<crate::store::KvStoreStats> {
        if !self.enabled() {
            return Ok(crate::store::KvStoreStats::default());
        }
        self.store.stats(cancel).await
    }
}

/// Decodes a [`CacheItem::data`] value back into raw bytes. A string is
/// tried as base64 first (the core's own write format), falling back to its
/// raw UTF-8 bytes for legacy entries that stored literal text. An object is
/// re-marshalled to its JSON text form.
fn decode_data(value: &serde_json::Value) -> Vec<u8> {
    use base64::Engine;
    match value {
        serde_json::Value::String(s) => {
            base64::engine::general_purpose::STANDARD.decode(s).unwrap_or_else(|_| s.as_bytes().to_vec())
        }
        other => serde_json::to_vec(other).unwrap_or_default(),
    }
}

fn base64_encode(input: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryKvStore;

    fn route() -> RouteConfig {
        RouteConfig {
            id: 1,
            slug: "get-user".to_string(),
            path: "/users/{id}".to_string(),
            method: "GET".to_string(),
            url_config_id: 1,
            uri: "/users".to_string(),
            headers: Default::default(),
            query_params: Default::default(),
            body: serde_json::Value::Null,
            variables: Default::default(),
            max_retries: 0,
            retry_delay_ms: 0,
            timeout_ms: 1000,
            manipulation: String::new(),
            description: String::new(),
            is_admin: false,
        }
    }

    #[test]
    fn admission_refuses_error_status_except_404() {
        let empty = HashMap::new();
        assert!(!should_cache(&empty, 500, 10, &empty));
        assert!(!should_cache(&empty, 400, 10, &empty));
        assert!(should_cache(&empty, 404, 10, &empty));
        assert!(should_cache(&empty, 200, 10, &empty));
    }

    #[test]
    fn admission_refuses_oversized_body() {
        let empty = HashMap::new();
        assert!(!should_cache(&empty, 200, MAX_CACHEABLE_BODY_BYTES + 1, &empty));
        assert!(should_cache(&empty, 200, MAX_CACHEABLE_BODY_BYTES, &empty));
    }

    #[test]
    fn admission_refuses_no_cache_and_authorization() {
        let empty = HashMap::new();
        let mut no_cache = HashMap::new();
        no_cache.insert("Cache-Control".to_string(), "no-cache".to_string());
        assert!(!should_cache(&no_cache, 200, 1, &empty));

        let mut auth = HashMap::new();
        auth.insert("authorization".to_string(), "Bearer x".to_string());
        assert!(!should_cache(&auth, 200, 1, &empty));
    }

    #[test]
    fn admission_refuses_streaming_content_type() {
        let empty = HashMap::new();
        let mut resp = HashMap::new();
        resp.insert("Content-Type".to_string(), "application/x-event-STREAM".to_string());
        assert!(!should_cache(&empty, 200, 1, &resp));
    }

    #[tokio::test]
    async fn set_then_get_round_trips_and_reports_hit() {
        let cache = ResponseCache::new(Arc::new(InMemoryKvStore::new()));
        let token = CancellationToken::new();
        let mut headers = HashMap::new();
        headers.insert("x-trace".to_string(), "abc".to_string());

        cache.set(&token, "integration:get-user:deadbeef", b"hello", 200, headers.clone()).await.unwrap();
        let entry = cache.get(&token, "integration:get-user:deadbeef").await.unwrap().unwrap();
        assert_eq!(entry.data, b"hello");
        assert_eq!(entry.status, 200);
        assert_eq!(entry.headers, headers);
    }

    #[tokio::test]
    async fn get_on_unknown_key_is_a_miss() {
        let cache = ResponseCache::new(Arc::new(InMemoryKvStore::new()));
        let token = CancellationToken::new();
        assert!(cache.get(&token, "integration:nope:0").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_on_expired_item_is_a_miss_and_deletes_it() {
        let store = Arc::new(InMemoryKvStore::new());
        let cache = ResponseCache::new(store.clone());
        let token = CancellationToken::new();
        let already_expired = Utc::now() - chrono::Duration::seconds(1);

        cache
            .set_with_expiry(&token, "integration:get-user:stale", b"stale", 200, HashMap::new(), already_expired)
            .await
            .unwrap();
        assert_eq!(store.len(), 1);

        assert!(cache.get(&token, "integration:get-user:stale").await.unwrap().is_none());
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn disabled_store_makes_every_operation_a_safe_no_op() {
        let cache = ResponseCache::new(Arc::new(InMemoryKvStore::disabled()));
        let token = CancellationToken::new();
        cache.set(&token, "k", b"v", 200, HashMap::new()).await.unwrap();
        assert!(cache.get(&token, "k").await.unwrap().is_none());
        cache.invalidate_path(&token, "anything").await.unwrap();
    }

    #[tokio::test]
    async fn invalidate_path_removes_only_matching_slug() {
        let cache = ResponseCache::new(Arc::new(InMemoryKvStore::new()));
        let token = CancellationToken::new();
        let route = route();
        let key = CacheKeyBuilder::prefix(&route) + ":digest1";
        cache.set(&token, &key, b"v", 200, HashMap::new()).await.unwrap();
        cache.set(&token, "integration:other-slug:digest2", b"v2", 200, HashMap::new()).await.unwrap();

        cache.invalidate_path(&token, &route.slug).await.unwrap();

        assert!(cache.get(&token, &key).await.unwrap().is_none());
        assert!(cache.get(&token, "integration:other-slug:digest2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn stats_reflects_key_count_and_disabled_store_reports_zero() {
        let cache = ResponseCache::new(Arc::new(InMemoryKvStore::new()));
        let token = CancellationToken::new();
        cache.set(&token, "a", b"1", 200, HashMap::new()).await.unwrap();
        cache.set(&token, "b", b"2", 200, HashMap::new()).await.unwrap();
        assert_eq!(cache.stats(&token).await.unwrap().key_count, 2);

        let disabled = ResponseCache::new(Arc::new(InMemoryKvStore::disabled()));
        assert_eq!(disabled.stats(&token).await.unwrap().key_count, 0);
    }
}
