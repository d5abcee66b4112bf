//! Refresh Coordinator.
//!
//! Pulls the full active config set from the config store, rebuilds the
//! registry atomically, and supports targeted single-route refresh and
//! invalidation on configuration change events.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;

use crate::cancel::CancellationToken;
use crate::error::GatewayResult;
use crate::registry::RouteRegistry;
use crate::store::ConfigStore;

/// The result of a full `refresh`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshOutcome {
    pub installed: usize,
    pub errors: usize,
}

/// Point-in-time counters for the last completed refresh, exposed for
/// admin/observability surfaces.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistryStats {
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub last_refresh_errors: usize,
    pub total_refreshes: u64,
}

/// Drives registry reloads against a [`ConfigStore`].
///
/// Only one full `refresh` may be in flight at a time; concurrent callers
/// serialize on an internal async mutex. `refresh_single` and `invalidate`
/// may proceed in parallel with each other and with a full refresh — if two
/// `refresh_single` calls target the same `(path, method)`, the later one
/// to publish wins and callers must not assume ordering between them.
pub struct RefreshCoordinator {
    registry: Arc<RouteRegistry>,
    config_store: Arc<dyn ConfigStore>,
    refresh_lock: AsyncMutex<()>,
    stats: Mutex<RegistryStats>,
}

impl RefreshCoordinator {
    pub fn new(registry: Arc<RouteRegistry>, config_store: Arc<dyn ConfigStore>) -> Self {
        Self {
            registry,
            config_store,
            refresh_lock: AsyncMutex::new(()),
            stats: Mutex::new(RegistryStats::default()),
        }
    }

    pub fn stats(&self) -> RegistryStats {
        self.stats.lock().clone()
    }

    /// Loads every active config and atomically replaces the registry.
    /// Aborts without mutating the registry if the config store call fails;
    /// a refresh with per-config add errors still publishes, reporting how
    /// many configs were skipped.
    pub async fn refresh(&self, cancel: &CancellationToken) -> GatewayResult<RefreshOutcome> {
        let _guard = self.refresh_lock.lock().await;
        cancel.check()?;
        let configs = match self.config_store.load_all_active(cancel).await {
            Ok(configs) => configs,
            Err(e) => {
                log::error!("refresh aborted: config store load_all_active failed: {}", e);
                return Err(e);
            }
        };
        cancel.check()?;

        let total = configs.len();
        let errors = self.registry.replace_all(configs);
        let installed = total - errors;
        log::info!("refresh installed {} routes, {} errors", installed, errors);

        let mut stats = self.stats.lock();
        stats.last_refresh_at = Some(Utc::now());
        stats.last_refresh_errors = errors;
        stats.total_refreshes += 1;
        drop(stats);

        Ok(RefreshOutcome { installed, errors })
    }

    /// Fetches one config and installs it, replacing any prior config under
    /// the same `(path, method)`. Fetch failure aborts without mutating the
    /// registry.
    pub async fn refresh_single(&self, cancel: &CancellationToken, path: &str, method: &str) -> GatewayResult<()> {
        cancel.check()?;
        let config = match self.config_store.get_by_path_and_method(cancel, path, method).await {
            Ok(config) => config,
            Err(e) => {
                log::error!("refresh_single({} {}) aborted: {}", method, path, e);
                return Err(e);
            }
        };
        cancel.check()?;
        self.registry.remove(path, method).ok();
        self.registry.add(config)
    }

    /// Removes `(path, method)` from the registry without consulting the
    /// config store.
    pub fn invalidate(&self, path: &str, method: &str) -> GatewayResult<()> {
        self.registry.remove(path, method)
    }
}
