//! Error taxonomy for the gateway core.
//!
//! Every fallible operation in this crate returns one of the variants below.
//! The mapping to HTTP status codes is the caller's job — the core only
//! classifies, it never decides how to respond.

use thiserror::Error;

/// Errors surfaced by the route registry, response cache and refresh
/// coordinator.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No trie path matched the requested `(path, method)` pair.
    #[error("route not found for path")]
    RouteNotFound,

    /// A trie path matched but the terminal node has no config for the
    /// requested method.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// `Add` was called with a `(path, method)` pair that already exists.
    #[error("route already exists: {path} {method}")]
    RouteAlreadyExists { path: String, method: String },

    /// A literal segment would appear as both a static child key and a
    /// parameter child name, or two distinct parameter
    /// names were requested at the same trie position.
    #[error("ambiguous route: {0}")]
    AmbiguousRoute(String),

    /// No config exists for the requested slug.
    #[error("no route with slug {0}")]
    SlugNotFound(String),

    /// The operation was cancelled via its cancellation token before or
    /// during an I/O boundary.
    #[error("operation cancelled")]
    Cancelled,

    /// The config store failed to answer `LoadAllActive` or
    /// `GetByPathAndMethod`. The prior registry state, if any, remains live.
    #[error("config store error: {0}")]
    ConfigStore(String),

    /// The backing KV store returned an error other than "not found".
    /// Cache errors never fail the request — callers should treat this the
    /// same as a miss and log it, not propagate it to the client.
    #[error("cache store error: {0}")]
    CacheStore(String),
}

/// Result alias used throughout the crate.
pub type GatewayResult<T> = Result<T, GatewayError>;
