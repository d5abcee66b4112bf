//! The Trie.
//!
//! A tree of nodes; each node holds static children indexed by literal
//! segment, at most one parameter child, at most one wildcard child, and a
//! `method → config` mapping at terminal nodes. No backtracking: if the
//! chosen branch dead-ends, the match fails even if another branch could
//! have matched.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{GatewayError, GatewayResult};
use crate::model::RouteConfig;
use crate::segment::Segment;

/// A node in the route trie.
///
/// Terminal iff `configs` is non-empty. Orphaned chains left behind by
/// `remove` are never pruned — bounded by the configured route set size.
#[derive(Debug, Default, Clone)]
pub struct TrieNode {
    static_children: HashMap<String, Box<TrieNode>>,
    param_child: Option<Box<TrieNode>>,
    param_name: Option<String>,
    wildcard_child: Option<Box<TrieNode>>,
    configs: HashMap<String, Arc<RouteConfig>>,
}

/// Bindings accumulated while walking the trie: parameter name → matched
/// segment value, plus `"wildcard"` for any wildcard segment consumed.
pub type Params = HashMap<String, String>;

impl TrieNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_terminal(&self) -> bool {
        !self.configs.is_empty()
    }

    /// Idempotently returns or creates the static child for `literal`.
    fn add_static_child(&mut self, literal: &str) -> &mut TrieNode {
        self.static_children
            .entry(literal.to_string())
            .or_insert_with(|| Box::new(TrieNode::new()))
    }

    /// Idempotently returns or creates the parameter child named `name`.
    ///
    /// Returns `Err` if a parameter child already exists under a different
    /// name — two distinct parameter names can never coexist at one trie
    /// position.
    fn add_param_child(&mut self, name: &str) -> GatewayResult<&mut TrieNode> {
        if let Some(existing) = &self.param_name {
            if existing != name {
                return Err(GatewayError::AmbiguousRoute(format!(
                    "parameter name conflict: existing child named {{{existing}}}, got {{{name}}}"
                )));
            }
        } else {
            self.param_name = Some(name.to_string());
        }
        if self.param_child.is_none() {
            self.param_child = Some(Box::new(TrieNode::new()));
        }
        Ok(self.param_child.as_mut().unwrap())
    }

    /// Idempotently returns or creates the wildcard child.
    fn add_wildcard_child(&mut self) -> &mut TrieNode {
        if self.wildcard_child.is_none() {
            self.wildcard_child = Some(Box::new(TrieNode::new()));
        }
        self.wildcard_child.as_mut().unwrap()
    }

    /// Applies one `AddChild` step for `seg`. A literal segment may never be
    /// both a static child key and the parameter child's name at the same
    /// node — whichever form is added second is rejected.
    fn add_child(&mut self, seg: &Segment) -> GatewayResult<&mut TrieNode> {
        match seg {
            Segment::Static(literal) => {
                if let Some(param_name) = &self.param_name {
                    if param_name == literal {
                        return Err(GatewayError::AmbiguousRoute(format!(
                            "segment '{literal}' collides with existing parameter child {{{param_name}}}"
                        )));
                    }
                }
                Ok(self.add_static_child(literal))
            }
            Segment::Param(name) => {
                if self.static_children.contains_key(name) {
                    return Err(GatewayError::AmbiguousRoute(format!(
                        "parameter {{{name}}} collides with existing static child '{name}'"
                    )));
                }
                self.add_param_child(name)
            }
            Segment::Wildcard => Ok(self.add_wildcard_child()),
        }
    }

    /// Applies `FindChild` with fixed precedence: exact static match, then
    /// parameter child, then wildcard child. No backtracking.
    fn find_child(&self, seg: &str, params: &mut Params) -> Option<&TrieNode> {
        if let Some(child) = self.static_children.get(seg) {
            return Some(child);
        }
        if let Some(child) = &self.param_child {
            if let Some(name) = &self.param_name {
                params.insert(name.clone(), seg.to_string());
            }
            return Some(child);
        }
        if let Some(child) = &self.wildcard_child {
            params.insert("wildcard".to_string(), seg.to_string());
            return Some(child);
        }
        None
    }

    /// Inserts `config` along the path described by `segments`, creating
    /// nodes as needed, then records it under `method` at the terminal
    /// node. Transactional in spirit: segment-by-segment ambiguity is
    /// checked before any node mutation for that segment is committed, so a
    /// rejected insert never leaves a partially-built chain hanging off the
    /// root that wasn't already there.
    pub fn insert(&mut self, segments: &[Segment], method: &str, config: Arc<RouteConfig>) -> GatewayResult<()> {
        let mut node = self;
        for seg in segments {
            node = node.add_child(seg)?;
        }
        node.configs.insert(method.to_string(), config);
        Ok(())
    }

    /// Removes the config for `method` at the terminal node reached by
    /// `segments`, if any. Tolerates a missing path or a missing method
    /// entry; does not prune resulting empty nodes.
    pub fn remove(&mut self, segments: &[Segment], method: &str) -> bool {
        let mut node = self;
        for seg in segments {
            let next = match seg {
                Segment::Static(literal) => node.static_children.get_mut(literal),
                Segment::Param(_) => node.param_child.as_deref_mut(),
                Segment::Wildcard => node.wildcard_child.as_deref_mut(),
            };
            match next {
                Some(n) => node = n,
                None => return false,
            }
        }
        node.configs.remove(method).is_some()
    }

    /// Walks the trie one segment at a time. Returns the terminal node and
    /// accumulated params on success.
    pub fn walk<'a>(&'a self, path_segments: &[&str], params: &mut Params) -> Option<&'a TrieNode> {
        let mut node = self;
        for seg in path_segments {
            node = node.find_child(seg, params)?;
        }
        Some(node)
    }

    pub fn config_for(&self, method: &str) -> Option<&Arc<RouteConfig>> {
        self.configs.get(method)
    }

    pub fn methods(&self) -> impl Iterator<Item = &String> {
        self.configs.keys()
    }

    /// All configs reachable from this node and its descendants, used to
    /// rebuild the secondary index after a bulk load.
    pub fn all_configs<'a>(&'a self, out: &mut Vec<Arc<RouteConfig>>) {
        out.extend(self.configs.values().cloned());
        for child in self.static_children.values() {
            child.all_configs(out);
        }
        if let Some(child) = &self.param_child {
            child.all_configs(out);
        }
        if let Some(child) = &self.wildcard_child {
            child.all_configs(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::parse_uri;

    fn route(id: u64, slug: &str, path: &str, method: &str) -> Arc<RouteConfig> {
        Arc::new(RouteConfig {
            id,
            slug: slug.to_string(),
            path: path.to_string(),
            method: method.to_string(),
            url_config_id: 1,
            uri: "/".to_string(),
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
        })
    }

    #[test]
    fn static_children_are_idempotent() {
        let mut root = TrieNode::new();
        let segs = parse_uri("/users");
        root.insert(&segs, "GET", route(1, "a", "/users", "GET")).unwrap();
        root.insert(&segs, "POST", route(2, "b", "/users", "POST")).unwrap();
        assert_eq!(root.static_children.len(), 1);
    }

    #[test]
    fn static_beats_param_beats_wildcard() {
        let mut root = TrieNode::new();
        root.insert(&parse_uri("/users/{id}"), "GET", route(1, "param", "/users/{id}", "GET")).unwrap();
        root.insert(&parse_uri("/users/me"), "GET", route(2, "static", "/users/me", "GET")).unwrap();
        root.insert(&parse_uri("/users/*"), "GET", route(3, "wild", "/users/*", "GET")).unwrap();

        let mut params = Params::new();
        let node = root.walk(&["users", "me"], &mut params).unwrap();
        assert_eq!(node.config_for("GET").unwrap().slug, "static");
        assert!(params.is_empty());

        let mut params = Params::new();
        let node = root.walk(&["users", "42"], &mut params).unwrap();
        assert_eq!(node.config_for("GET").unwrap().slug, "param");
        assert_eq!(params.get("id"), Some(&"42".to_string()));
    }

    #[test]
    fn conflicting_static_and_param_is_rejected() {
        let mut root = TrieNode::new();
        root.insert(&parse_uri("/users/{id}"), "GET", route(1, "a", "/users/{id}", "GET")).unwrap();
        let err = root.insert(&parse_uri("/users/id"), "GET", route(2, "b", "/users/id", "GET"));
        // "id" collides with the existing parameter name "id".
        assert!(err.is_err());
    }

    #[test]
    fn two_distinct_param_names_at_same_position_is_rejected() {
        let mut root = TrieNode::new();
        root.insert(&parse_uri("/users/{id}"), "GET", route(1, "a", "/users/{id}", "GET")).unwrap();
        let err = root.insert(&parse_uri("/users/{name}"), "POST", route(2, "b", "/users/{name}", "POST"));
        assert!(err.is_err());
    }

    #[test]
    fn no_backtracking_on_dead_end() {
        let mut root = TrieNode::new();
        // Only a param branch exists under /users, and it does not have a
        // "posts" child — a static match at the top level must not fall
        // through to try the param branch for a *different* top-level path.
        root.insert(&parse_uri("/users/{id}/profile"), "GET", route(1, "a", "/users/{id}/profile", "GET")).unwrap();

        let mut params = Params::new();
        let result = root.walk(&["users", "42", "posts"], &mut params);
        assert!(result.is_none());
    }

    #[test]
    fn remove_tolerates_missing_path() {
        let mut root = TrieNode::new();
        assert!(!root.remove(&parse_uri("/nope"), "GET"));
    }

    #[test]
    fn remove_leaves_dangling_empty_node() {
        let mut root = TrieNode::new();
        root.insert(&parse_uri("/users"), "GET", route(1, "a", "/users", "GET")).unwrap();
        assert!(root.remove(&parse_uri("/users"), "GET"));
        // The node is still there, just non-terminal; walking it still works.
        let mut params = Params::new();
        let node = root.walk(&["users"], &mut params).unwrap();
        assert!(!node.is_terminal());
    }
}
