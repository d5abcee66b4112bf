//! Route Registry.
//!
//! A concurrent wrapper around the trie exposing `Add`, `Remove`, `Match`,
//! `Clear`, `Count`, `List`, `GetBySlug`. Maintains a secondary index from
//! `(path, method)` to config for O(1) duplicate detection and lookup.
//!
//! ## Concurrency
//!
//! The registry's effective state is `RwLock<Arc<Inner>>`. Readers
//! (`match_route`) take the read lock only long enough to clone the `Arc` —
//! cheap, a refcount bump — then walk the cloned, immutable snapshot without
//! holding any lock. Writers build a modified copy of `Inner` off to the
//! side and publish it with an optimistic compare-and-swap on the `Arc`
//! pointer, retrying if another writer raced ahead. A `Match` call in
//! flight never blocks a concurrent full reload, and vice versa, using
//! nothing more exotic than `std::sync::RwLock` — the same tool
//! `router-core`'s `gateway_fast.rs` reaches for when it swaps in freshly
//! reloaded routing rules.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{GatewayError, GatewayResult};
use crate::model::RouteConfig;
use crate::segment::{parse_uri, split_request_path};
use crate::trie::{Params, TrieNode};

#[derive(Default, Clone)]
struct Inner {
    root: TrieNode,
    index: HashMap<(String, String), Arc<RouteConfig>>,
    slugs: HashMap<String, Arc<RouteConfig>>,
}

/// Concurrent route registry.
pub struct RouteRegistry {
    state: RwLock<Arc<Inner>>,
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Arc::new(Inner::default())),
        }
    }

    fn snapshot(&self) -> Arc<Inner> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Runs `mutate` against a private copy of the current state and
    /// publishes the result with an optimistic CAS, retrying if another
    /// writer updated the registry in the meantime. `mutate` may fail
    /// mid-way (e.g. ambiguous insert); on failure nothing is published and
    /// the registry is left exactly as it was — `Add` is transactional.
    fn swap<F>(&self, mutate: F) -> GatewayResult<()>
    where
        F: Fn(&mut Inner) -> GatewayResult<()>,
    {
        loop {
            let current = self.snapshot();
            let mut candidate = (*current).clone();
            mutate(&mut candidate)?;
            let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
            if Arc::ptr_eq(&*guard, &current) {
                *guard = Arc::new(candidate);
                return Ok(());
            }
            // Lost the race to a concurrent writer; drop the lock and retry
            // against the newer snapshot.
        }
    }

    /// Installs `config` in the trie and the secondary index.
    ///
    /// Fails with [`GatewayError::RouteAlreadyExists`] if `(path, method)`
    /// is already present, or [`GatewayError::AmbiguousRoute`] if the
    /// insert would create a param/static collision at the same trie
    /// position.
    pub fn add(&self, config: RouteConfig) -> GatewayResult<()> {
        let method = config.method_upper();
        let key = (config.path.clone(), method.clone());
        let segments = parse_uri(&config.path);
        let slug = config.slug.clone();
        let config = Arc::new(RouteConfig { method: method.clone(), ..config });

        self.swap(move |inner| {
            if inner.index.contains_key(&key) {
                return Err(GatewayError::RouteAlreadyExists {
                    path: key.0.clone(),
                    method: key.1.clone(),
                });
            }
            inner.root.insert(&segments, &method, config.clone())?;
            inner.index.insert(key.clone(), config.clone());
            inner.slugs.insert(slug.clone(), config.clone());
            Ok(())
        })
    }

    /// Removes the `(path, method)` route. Returns `Ok(())` whether or not
    /// a route was actually present — callers that need to distinguish
    /// should check [`RouteRegistry::get_by_path_and_method`] first.
    pub fn remove(&self, path: &str, method: &str) -> GatewayResult<()> {
        let method = method.to_ascii_uppercase();
        let key = (path.to_string(), method.clone());
        let segments = parse_uri(path);

        self.swap(move |inner| {
            inner.root.remove(&segments, &method);
            if let Some(removed) = inner.index.remove(&key) {
                inner.slugs.remove(&removed.slug);
            }
            Ok(())
        })
    }

    /// Matches `path`/`method` against the trie.
    pub fn match_route(&self, path: &str, method: &str) -> GatewayResult<(Arc<RouteConfig>, Params)> {
        let snapshot = self.snapshot();
        let method = method.to_ascii_uppercase();
        let raw_segments = split_request_path(path);
        let mut params = Params::new();

        let node = snapshot
            .root
            .walk(&raw_segments, &mut params)
            .ok_or(GatewayError::RouteNotFound)?;

        if !node.is_terminal() {
            return Err(GatewayError::RouteNotFound);
        }

        match node.config_for(&method) {
            Some(config) => Ok((config.clone(), params)),
            None => Err(GatewayError::MethodNotAllowed),
        }
    }

    pub fn get_by_slug(&self, slug: &str) -> GatewayResult<Arc<RouteConfig>> {
        self.snapshot()
            .slugs
            .get(slug)
            .cloned()
            .ok_or_else(|| GatewayError::SlugNotFound(slug.to_string()))
    }

    pub fn get_by_path_and_method(&self, path: &str, method: &str) -> Option<Arc<RouteConfig>> {
        let method = method.to_ascii_uppercase();
        self.snapshot().index.get(&(path.to_string(), method)).cloned()
    }

    pub fn clear(&self) {
        let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(Inner::default());
    }

    pub fn count(&self) -> usize {
        self.snapshot().index.len()
    }

    /// All slugs currently registered, in no particular order.
    pub fn list(&self) -> Vec<String> {
        self.snapshot().slugs.keys().cloned().collect()
    }

    /// All slugs whose path starts with `prefix` (byte-exact, not
    /// segment-aware). A convenience for admin tooling that wants to
    /// enumerate a family of routes without walking the trie itself.
    pub fn list_by_prefix(&self, prefix: &str) -> Vec<String> {
        self.snapshot()
            .slugs
            .values()
            .filter(|c| c.path.starts_with(prefix))
            .map(|c| c.slug.clone())
            .collect()
    }

    /// Replaces the entire registry state atomically from a freshly loaded
    /// config set. Used by the Refresh Coordinator's full `Refresh`: no
    /// interleaving `Match` ever observes a half-built registry, because
    /// `configs` is folded into a detached `Inner` before the single
    /// publish. Returns the number of configs that failed to insert
    /// (duplicate `(path, method)` within the batch, or an ambiguous trie
    /// shape); the registry still becomes live with however many configs
    /// succeeded.
    pub fn replace_all(&self, configs: Vec<RouteConfig>) -> usize {
        let mut fresh = Inner::default();
        let mut error_count = 0;
        for config in configs {
            let method = config.method_upper();
            let key = (config.path.clone(), method.clone());
            if fresh.index.contains_key(&key) {
                error_count += 1;
                continue;
            }
            let segments = parse_uri(&config.path);
            let slug = config.slug.clone();
            let config = Arc::new(RouteConfig { method: method.clone(), ..config });
            match fresh.root.insert(&segments, &method, config.clone()) {
                Ok(()) => {
                    fresh.index.insert(key, config.clone());
                    fresh.slugs.insert(slug, config);
                }
                Err(e) => {
                    log::warn!("skipping route {}:{} during refresh: {}", key.0, key.1, e);
                    error_count += 1;
                }
            }
        }
        let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(fresh);
        error_count
    }
}
