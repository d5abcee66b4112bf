//! Cache Key Builder.
//!
//! Produces a deterministic digest over the normalized request fingerprint:
//! route identity, request method/path, ordered query params, selected
//! headers, and — for `POST`/`PUT` only — a size-bounded body prefix.

use std::collections::HashMap;

use crate::model::RouteConfig;
use crate::trie::Params;

/// The only headers that participate in the cache key, in this fixed order.
const KEYED_HEADERS: [&str; 4] = ["authorization", "content-type", "accept", "user-agent"];

/// Request body bytes considered for keying are capped to this many bytes.
pub const BODY_PREFIX_LIMIT: usize = 1024;

/// The normalized view of an inbound request the cache key is built from.
/// Headers are matched case-insensitively against [`KEYED_HEADERS`]
/// regardless of how they're cased in `headers`.
pub struct RequestFingerprint<'a> {
    pub method: &'a str,
    pub path: &'a str,
    /// Query parameters as received, preserving original per-name order.
    pub query_params: &'a [(String, String)],
    pub headers: &'a HashMap<String, String>,
    /// Raw request body. Only consulted for `POST`/`PUT`; only the first
    /// [`BODY_PREFIX_LIMIT`] bytes are ever used.
    pub body: Option<&'a [u8]>,
}

/// Builds the canonical byte sequence fed into the digest.
fn canonical_bytes(route: &RouteConfig, uri_params: &Params, req: &RequestFingerprint<'_>) -> Vec<u8> {
    let mut buf = Vec::new();

    // 1. slug:<path>:method:<method>:uri:<uri>
    buf.extend_from_slice(format!("slug:{}:method:{}:uri:{}", route.path, route.method, route.uri).as_bytes());

    // 2. :<request-method>:<request-path>
    buf.extend_from_slice(format!(":{}:{}", req.method, req.path).as_bytes());

    // 3. query params, sorted by name, values in original per-name order.
    let mut by_name: Vec<&(String, String)> = req.query_params.iter().collect();
    by_name.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, value) in by_name {
        buf.extend_from_slice(format!(":{name}={value}").as_bytes());
    }

    // 4. uri params, sorted by name.
    let mut param_names: Vec<&String> = uri_params.keys().collect();
    param_names.sort();
    for name in param_names {
        let value = &uri_params[name];
        buf.extend_from_slice(format!(":{name}={value}").as_bytes());
    }

    // 5. selected headers, fixed order, case-insensitive lookup, skip
    // absent or empty values.
    for wanted in KEYED_HEADERS {
        if let Some(value) = find_header(req.headers, wanted) {
            if !value.is_empty() {
                buf.extend_from_slice(format!(":{wanted}:{value}").as_bytes());
            }
        }
    }

    // 6. body prefix, POST/PUT only.
    if matches!(req.method, "POST" | "PUT") {
        if let Some(body) = req.body {
            let cut = body.len().min(BODY_PREFIX_LIMIT);
            buf.extend_from_slice(b":body:");
            buf.extend_from_slice(&body[..cut]);
        }
    }

    buf
}

fn find_header<'a>(headers: &'a HashMap<String, String>, wanted_lower: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(wanted_lower))
        .map(|(_, v)| v.as_str())
}

/// Cache key builder: wraps a [`RouteConfig`] so repeated key builds for the
/// same route don't need to re-thread it through every call.
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// The route's identity prefix every key for it shares —
    /// `integration:<slug>`. [`ResponseCache::invalidate_path`] deletes
    /// every key under this prefix for a slug in one sweep, which is why
    /// the route's stable `slug` — not its `path` pattern, which may
    /// contain `{param}` placeholders — anchors the key.
    pub fn prefix(route: &RouteConfig) -> String {
        format!("integration:{}", route.slug)
    }

    /// Builds the full cache key for one request against `route`.
    pub fn build(route: &RouteConfig, uri_params: &Params, req: &RequestFingerprint<'_>) -> String {
        let bytes = canonical_bytes(route, uri_params, req);
        let digest = md5::compute(&bytes);
        format!("{}:{}", Self::prefix(route), hex::encode(digest.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn params(id: &str) -> Params {
        let mut p = Params::new();
        p.insert("id".to_string(), id.to_string());
        p
    }

    #[test]
    fn key_is_deterministic_for_identical_fingerprints() {
        let route = route();
        let req = RequestFingerprint {
            method: "GET",
            path: "/users/42",
            query_params: &[("b".into(), "2".into()), ("a".into(), "1".into())],
            headers: &Default::default(),
            body: None,
        };
        let k1 = CacheKeyBuilder::build(&route, &params("42"), &req);
        let k2 = CacheKeyBuilder::build(&route, &params("42"), &req);
        assert_eq!(k1, k2);
    }

    #[test]
    fn query_param_order_does_not_affect_key() {
        let route = route();
        let uri_params = params("42");
        let req_a = RequestFingerprint {
            method: "GET",
            path: "/users/42",
            query_params: &[("a".into(), "1".into()), ("b".into(), "2".into())],
            headers: &Default::default(),
            body: None,
        };
        let req_b = RequestFingerprint {
            method: "GET",
            path: "/users/42",
            query_params: &[("b".into(), "2".into()), ("a".into(), "1".into())],
            headers: &Default::default(),
            body: None,
        };
        assert_eq!(
            CacheKeyBuilder::build(&route, &uri_params, &req_a),
            CacheKeyBuilder::build(&route, &uri_params, &req_b)
        );
    }

    #[test]
    fn adding_a_query_value_changes_the_key() {
        let route = route();
        let uri_params = params("42");
        let base = RequestFingerprint {
            method: "GET",
            path: "/users/42",
            query_params: &[("a".into(), "1".into()), ("b".into(), "2".into())],
            headers: &Default::default(),
            body: None,
        };
        let extra = RequestFingerprint {
            method: "GET",
            path: "/users/42",
            query_params: &[("a".into(), "1".into()), ("b".into(), "2".into()), ("c".into(), "3".into())],
            headers: &Default::default(),
            body: None,
        };
        assert_ne!(
            CacheKeyBuilder::build(&route, &uri_params, &base),
            CacheKeyBuilder::build(&route, &uri_params, &extra)
        );
    }

    #[test]
    fn sensitive_to_path_method_header_and_body() {
        let route = route();
        let uri_params = params("42");
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), "Bearer x".to_string());

        let base = RequestFingerprint {
            method: "GET",
            path: "/users/42",
            query_params: &[],
            headers: &HashMap::new(),
            body: None,
        };
        let key_base = CacheKeyBuilder::build(&route, &uri_params, &base);

        let diff_path = RequestFingerprint { path: "/users/43", ..base_copy(&base) };
        assert_ne!(CacheKeyBuilder::build(&route, &uri_params, &diff_path), key_base);

        let diff_method = RequestFingerprint { method: "HEAD", ..base_copy(&base) };
        assert_ne!(CacheKeyBuilder::build(&route, &uri_params, &diff_method), key_base);

        let diff_header = RequestFingerprint { headers: &headers, ..base_copy(&base) };
        assert_ne!(CacheKeyBuilder::build(&route, &uri_params, &diff_header), key_base);

        let body_a = RequestFingerprint { method: "POST", body: Some(b"abc"), ..base_copy(&base) };
        let body_b = RequestFingerprint { method: "POST", body: Some(b"xyz"), ..base_copy(&base) };
        assert_ne!(
            CacheKeyBuilder::build(&route, &uri_params, &body_a),
            CacheKeyBuilder::build(&route, &uri_params, &body_b)
        );
    }

    fn base_copy<'a>(f: &RequestFingerprint<'a>) -> RequestFingerprint<'a> {
        RequestFingerprint {
            method: f.method,
            path: f.path,
            query_params: f.query_params,
            headers: f.headers,
            body: f.body,
        }
    }

    #[test]
    fn body_only_affects_key_for_post_and_put() {
        let route = route();
        let uri_params = params("42");
        let get_no_body = RequestFingerprint {
            method: "GET",
            path: "/users/42",
            query_params: &[],
            headers: &HashMap::new(),
            body: None,
        };
        let get_with_body = RequestFingerprint { body: Some(b"ignored-for-get"), ..base_copy(&get_no_body) };
        assert_eq!(
            CacheKeyBuilder::build(&route, &uri_params, &get_no_body),
            CacheKeyBuilder::build(&route, &uri_params, &get_with_body)
        );
    }

    #[test]
    fn invalidation_prefix_is_keyed_on_slug() {
        let route = route();
        assert_eq!(CacheKeyBuilder::prefix(&route), "integration:get-user");
    }
}
