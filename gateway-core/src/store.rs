//! External collaborator contracts: the Config Store and KV Store
//! interfaces the core consumes, plus in-memory reference implementations
//! used by tests and by `gateway-admin` where no real backing store is
//! configured.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;

use crate::cancel::CancellationToken;
use crate::error::GatewayResult;
use crate::model::RouteConfig;

/// Administrative config persistence, consumed by the Refresh Coordinator.
/// `Create`/`Update`/`Delete` exist for completeness of the contract but the
/// core itself only ever calls `load_all_active` and `get_by_path_and_method`.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Every config whose linked upstream is active.
    async fn load_all_active(&self, cancel: &CancellationToken) -> GatewayResult<Vec<RouteConfig>>;

    async fn get_by_path_and_method(
        &self,
        cancel: &CancellationToken,
        path: &str,
        method: &str,
    ) -> GatewayResult<RouteConfig>;

    async fn create(&self, cancel: &CancellationToken, config: RouteConfig) -> GatewayResult<()>;

    async fn update(&self, cancel: &CancellationToken, config: RouteConfig) -> GatewayResult<()>;

    async fn delete(&self, cancel: &CancellationToken, path: &str, method: &str) -> GatewayResult<()>;
}

/// Coarse backing-store occupancy, surfaced by `KvStore::stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KvStoreStats {
    pub key_count: u64,
}

/// Keyed-bytes-with-TTL store the Response Cache is built over. The key
/// space owned by the cache is `integration:*`.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, cancel: &CancellationToken, key: &str) -> GatewayResult<Option<Vec<u8>>>;

    async fn set(&self, cancel: &CancellationToken, key: &str, value: Vec<u8>, ttl_secs: u64) -> GatewayResult<()>;

    /// Deletes every key matching `prefix*`.
    async fn delete_by_pattern(&self, cancel: &CancellationToken, prefix: &str) -> GatewayResult<()>;

    async fn flush_all(&self, cancel: &CancellationToken) -> GatewayResult<()>;

    async fn ping(&self, cancel: &CancellationToken) -> GatewayResult<()>;

    async fn stats(&self, cancel: &CancellationToken) -> GatewayResult<KvStoreStats>;

    /// Whether this store should be treated as live. A disabled or
    /// unreachable-at-construction store makes every `ResponseCache`
    /// operation a no-op.
    fn is_enabled(&self) -> bool;
}

struct Entry {
    value: Vec<u8>,
    expires_at: chrono::DateTime<chrono::Utc>,
}

/// An in-process `KvStore` with no persistence, backed by a lock-protected
/// map. Suitable for tests and for running the gateway without a real cache
/// backend configured.
pub struct InMemoryKvStore {
    data: RwLock<HashMap<String, Entry>>,
    enabled: bool,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self { data: RwLock::new(HashMap::new()), enabled: true }
    }

    /// Constructs a store that reports itself disabled, exercising the
    /// cache's no-op fallback path.
    pub fn disabled() -> Self {
        Self { data: RwLock::new(HashMap::new()), enabled: false }
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, cancel: &CancellationToken, key: &str) -> GatewayResult<Option<Vec<u8>>> {
        cancel.check()?;
        let data = self.data.read();
        Ok(data.get(key).map(|e| e.value.clone()))
    }

    async fn set(&self, cancel: &CancellationToken, key: &str, value: Vec<u8>, ttl_secs: u64) -> GatewayResult<()> {
        cancel.check()?;
        let expires_at = chrono::Utc::now() + chrono::Duration::seconds(ttl_secs as i64);
        self.data.write().insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete_by_pattern(&self, cancel: &CancellationToken, prefix: &str) -> GatewayResult<()> {
        cancel.check()?;
        self.data.write().retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }

    async fn flush_all(&self, cancel: &CancellationToken) -> GatewayResult<()> {
        cancel.check()?;
        self.data.write().clear();
        Ok(())
    }

    async fn ping(&self, cancel: &CancellationToken) -> GatewayResult<()> {
        cancel.check()
    }

    async fn stats(&self, cancel: &CancellationToken) -> GatewayResult<KvStoreStats> {
        cancel.check()?;
        Ok(KvStoreStats { key_count: self.data.read().len() as u64 })
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// An in-process `ConfigStore` backed by a lock-protected map, keyed on
/// `(path, method)`. Active-only filtering is trivial here since there's no
/// linked `UpstreamTarget` table to join against — every stored config is
/// considered active.
pub struct InMemoryConfigStore {
    configs: RwLock<HashMap<(String, String), RouteConfig>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self { configs: RwLock::new(HashMap::new()) }
    }

    pub fn seed(&self, configs: impl IntoIterator<Item = RouteConfig>) {
        let mut map = self.configs.write();
        for config in configs {
            map.insert((config.path.clone(), config.method_upper()), config);
        }
    }
}

impl Default for InMemoryConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn load_all_active(&self, cancel: &CancellationToken) -> GatewayResult<Vec<RouteConfig>> {
        cancel.check()?;
        Ok(self.configs.read().values().cloned().collect())
    }

    async fn get_by_path_and_method(
        &self,
        cancel: &CancellationToken,
        path: &str,
        method: &str,
    ) -> GatewayResult<RouteConfig> {
        cancel.check()?;
        self.configs
            .read()
            .get(&(path.to_string(), method.to_ascii_uppercase()))
            .cloned()
            .ok_or_else(|| crate::error::GatewayError::RouteNotFound)
    }

    async fn create(&self, cancel: &CancellationToken, config: RouteConfig) -> GatewayResult<()> {
        cancel.check()?;
        let key = (config.path.clone(), config.method_upper());
        let mut map = self.configs.write();
        if map.contains_key(&key) {
            return Err(crate::error::GatewayError::RouteAlreadyExists { path: key.0, method: key.1 });
        }
        map.insert(key, config);
        Ok(())
    }

    async fn update(&self, cancel: &CancellationToken, config: RouteConfig) -> GatewayResult<()> {
        cancel.check()?;
        let key = (config.path.clone(), config.method_upper());
        self.configs.write().insert(key, config);
        Ok(())
    }

    async fn delete(&self, cancel: &CancellationToken, path: &str, method: &str) -> GatewayResult<()> {
        cancel.check()?;
        self.configs.write().remove(&(path.to_string(), method.to_ascii_uppercase()));
        Ok(())
    }
}
