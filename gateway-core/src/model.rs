//! Route and upstream data model.
//!
//! These types are the currency the registry, cache and refresh coordinator
//! pass around. They carry no behavior of their own beyond construction
//! helpers — matching, caching and persistence live in their own modules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Upstream protocol a [`UpstreamTarget`] dials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Grpc,
}

/// A named backend a route forwards to.
///
/// Consumed by reference from [`RouteConfig::url_config_id`]; its `url` is
/// concatenated with the route's `uri` (single-slash normalized, see
/// [`join_upstream_url`]) to form the forward target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamTarget {
    pub id: u64,
    pub name: String,
    pub protocol: Protocol,
    pub url: String,
    pub description: String,
    pub is_active: bool,
    pub grpc_service: Option<String>,
    pub proto_file: Option<String>,
    pub tls_enabled: bool,
}

/// How a [`Variable`] substitution value should be encoded before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableEncoding {
    Plain,
    Base64,
    UrlEncoded,
}

/// The scalar kind a template variable resolves to, used by the external
/// template collaborator — the core only stores this, it never
/// interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableDataType {
    String,
    Number,
    Bool,
}

/// A single substitutable token declared on a [`RouteConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub value: String,
    pub encoding: VariableEncoding,
    pub data_type: VariableDataType,
}

/// The route's contract: what a client sees, and how to reach the upstream
/// once matched.
///
/// `path` and `method` are the matching key the registry indexes on; every
/// other field is opaque payload the handler pipeline applies after a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub id: u64,
    pub slug: String,
    pub path: String,
    pub method: String,
    pub url_config_id: u64,
    pub uri: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub query_params: HashMap<String, String>,
    #[serde(default)]
    pub body: serde_json::Value,
    #[serde(default)]
    pub variables: HashMap<String, Variable>,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_ms: u64,
    #[serde(default)]
    pub manipulation: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl RouteConfig {
    /// Uppercased method, the form the registry and trie key on.
    pub fn method_upper(&self) -> String {
        self.method.to_ascii_uppercase()
    }
}

/// Joins an [`UpstreamTarget`]'s base URL with a route's `uri`, normalizing
/// exactly one slash at the seam regardless of whether either side carries
/// one already.
pub fn join_upstream_url(base: &str, uri: &str) -> String {
    let base_trimmed = base.trim_end_matches('/');
    let uri_trimmed = uri.trim_start_matches('/');
    if uri_trimmed.is_empty() {
        base_trimmed.to_string()
    } else {
        format!("{base_trimmed}/{uri_trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_upstream_url_normalizes_single_slash() {
        assert_eq!(join_upstream_url("http://host/", "/v1/users"), "http://host/v1/users");
        assert_eq!(join_upstream_url("http://host", "v1/users"), "http://host/v1/users");
        assert_eq!(join_upstream_url("http://host/", "v1/users"), "http://host/v1/users");
        assert_eq!(join_upstream_url("http://host", "/v1/users"), "http://host/v1/users");
    }

    #[test]
    fn join_upstream_url_empty_uri_keeps_base() {
        assert_eq!(join_upstream_url("http://host/", ""), "http://host");
    }
}
