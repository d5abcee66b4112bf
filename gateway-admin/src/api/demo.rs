//! Demonstration forward path.
//!
//! Exercises `Match → BuildKey → Get → (forward stub) → Set` end to end so
//! the response cache and route registry have a real caller driving them,
//! the way a production data plane's request handler would. There is no
//! real upstream here — `forward_stub` stands in for it.

use std::collections::HashMap;

use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use gateway_core::{CacheEntry, CancellationToken, Params, RequestFingerprint, RouteConfig};

use crate::AppState;

pub async fn forward(req: HttpRequest, body: web::Bytes, state: web::Data<AppState>) -> impl Responder {
    let token = CancellationToken::new();
    let path = req.path();
    let method = req.method().as_str();

    let (route, uri_params) = match state.registry.match_route(path, method) {
        Ok(pair) => pair,
        Err(e) => {
            return HttpResponse::NotFound().json(serde_json::json!({ "error": e.to_string() }));
        }
    };

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect();
    let query_params: Vec<(String, String)> =
        web::Query::<Vec<(String, String)>>::from_query(req.query_string()).map(|q| q.into_inner()).unwrap_or_default();

    let fingerprint = RequestFingerprint {
        method,
        path,
        query_params: &query_params,
        headers: &headers,
        body: if body.is_empty() { None } else { Some(body.as_ref()) },
    };
    let key = state.cache.key(route.as_ref(), &uri_params, &fingerprint);

    if let Ok(Some(entry)) = state.cache.get(&token, &key).await {
        log::debug!("cache hit for {} {}", method, path);
        return respond(entry);
    }

    let (status, response_body, response_headers) = forward_stub(route.as_ref(), &uri_params);

    if state.cache.should_cache(&headers, status, response_body.len(), &response_headers) {
        if let Err(e) = state.cache.set(&token, &key, &response_body, status, response_headers.clone()).await {
            log::warn!("failed to populate cache for {}: {}", key, e);
        }
    }

    respond(CacheEntry { data: response_body, status, headers: response_headers })
}

fn respond(entry: CacheEntry) -> HttpResponse {
    let status = StatusCode::from_u16(entry.status).unwrap_or(StatusCode::OK);
    let mut builder = HttpResponse::build(status);
    for (name, value) in &entry.headers {
        builder.insert_header((name.clone(), value.clone()));
    }
    builder.body(entry.data)
}

/// Stands in for the real upstream call the gateway's data plane would make.
/// Returns a canned response naming the resolved forward target so the
/// cache has something real to store and replay.
fn forward_stub(route: &RouteConfig, params: &Params) -> (u16, Vec<u8>, HashMap<String, String>) {
    let target = gateway_core::model::join_upstream_url(&format!("upstream://{}", route.url_config_id), &route.uri);
    let body = serde_json::json!({
        "forwarded_to": target,
        "slug": route.slug,
        "params": params,
    });
    let mut headers = HashMap::new();
    headers.insert("content-type".to_string(), "application/json".to_string());
    (200, serde_json::to_vec(&body).unwrap_or_default(), headers)
}
