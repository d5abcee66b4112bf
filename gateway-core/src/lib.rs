//! Route registry, response cache and refresh coordinator for a dynamic API
//! gateway: matches inbound requests against administrator-configured
//! routes, caches upstream responses, and keeps both in sync with a
//! backing configuration store under a read-heavy, concurrently-mutated
//! workload.

pub mod cache;
pub mod cache_key;
pub mod cancel;
pub mod error;
pub mod model;
pub mod refresh;
pub mod registry;
pub mod segment;
pub mod store;
pub mod trie;

pub use cache::{CacheEntry, ResponseCache};
pub use cache_key::{CacheKeyBuilder, RequestFingerprint};
pub use cancel::CancellationToken;
pub use error::{GatewayError, GatewayResult};
pub use model::{Protocol, RouteConfig, UpstreamTarget, Variable, VariableDataType, VariableEncoding};
pub use refresh::{RefreshCoordinator, RefreshOutcome, RegistryStats};
pub use registry::RouteRegistry;
pub use store::{ConfigStore, InMemoryConfigStore, InMemoryKvStore, KvStore, KvStoreStats};
pub use trie::Params;
