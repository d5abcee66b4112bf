//! Route configuration CRUD, backed by the `SqliteConfigStore` and kept in
//! sync with the live registry through the refresh coordinator — the same
//! `get`/`list`/`set`/`delete` shape `gateway_queries.rs` follows, adapted
//! to the `RouteConfig` model.

use actix_web::{delete, get, post, web, HttpResponse, Responder};
use gateway_core::{CancellationToken, RouteConfig};

use crate::AppState;

/// `GET /api/v1/routes` — every persisted route, not just what's currently
/// live in the registry.
#[get("/routes")]
pub async fn list_routes(state: web::Data<AppState>) -> impl Responder {
    match state.config_store.load_all_active(&CancellationToken::new()).await {
        Ok(routes) => HttpResponse::Ok().json(routes),
        Err(e) => {
            log::error!("failed to list routes: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({ "error": e.to_string() }))
        }
    }
}

/// `GET /api/v1/routes/{slug}` — looked up against the live registry, since
/// that's what actually serves traffic.
#[get("/routes/{slug}")]
pub async fn get_route(path: web::Path<String>, state: web::Data<AppState>) -> impl Responder {
    let slug = path.into_inner();
    match state.registry.get_by_slug(&slug) {
        Ok(route) => HttpResponse::Ok().json(route.as_ref()),
        Err(_) => HttpResponse::NotFound().json(serde_json::json!({ "error": format!("no route with slug {slug}") })),
    }
}

/// `POST /api/v1/routes` — persists the route, then hot-loads it into the
/// live registry via a targeted single-route refresh rather than waiting
/// for the next full reload.
#[post("/routes")]
pub async fn create_route(body: web::Json<RouteConfig>, state: web::Data<AppState>) -> impl Responder {
    let config = body.into_inner();
    let token = CancellationToken::new();

    if let Err(e) = state.config_store.create(&token, config.clone()).await {
        log::error!("failed to create route {}: {}", config.slug, e);
        return HttpResponse::BadRequest().json(serde_json::json!({ "error": e.to_string() }));
    }

    if let Err(e) = state.refresh.refresh_single(&token, &config.path, &config.method).await {
        log::warn!("route {} persisted but failed to hot-load: {}", config.slug, e);
    }

    HttpResponse::Ok().json(config)
}

/// `DELETE /api/v1/routes/{slug}` — removes the route from the store, the
/// live registry, and any cached responses under its slug.
#[delete("/routes/{slug}")]
pub async fn delete_route(path: web::Path<String>, state: web::Data<AppState>) -> impl Responder {
    let slug = path.into_inner();
    let token = CancellationToken::new();

    let route = match state.registry.get_by_slug(&slug) {
        Ok(route) => route,
        Err(_) => {
            return HttpResponse::NotFound().json(serde_json::json!({ "error": format!("no route with slug {slug}") }));
        }
    };

    if let Err(e) = state.config_store.delete(&token, &route.path, &route.method).await {
        log::error!("failed to delete route {}: {}", slug, e);
        return HttpResponse::InternalServerError().json(serde_json::json!({ "error": e.to_string() }));
    }

    state.refresh.invalidate(&route.path, &route.method).ok();
    if let Err(e) = state.cache.invalidate_path(&token, &slug).await {
        log::warn!("failed to invalidate cache for {}: {}", slug, e);
    }

    HttpResponse::Ok().json(serde_json::json!({ "message": "route deleted" }))
}

/// `POST /api/v1/routes/refresh` — forces a full reload from the store,
/// replacing the registry atomically.
#[post("/routes/refresh")]
pub async fn refresh_routes(state: web::Data<AppState>) -> impl Responder {
    match state.refresh.refresh(&CancellationToken::new()).await {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => {
            log::error!("refresh failed: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({ "error": e.to_string() }))
        }
    }
}

/// `GET /api/v1/stats` — registry and cache occupancy, mirroring the kind
/// of reload bookkeeping a production data plane exposes for observability.
#[get("/stats")]
pub async fn stats(state: web::Data<AppState>) -> impl Responder {
    let registry_stats = state.refresh.stats();
    let cache_stats = state.cache.stats(&CancellationToken::new()).await.unwrap_or_default();
    HttpResponse::Ok().json(serde_json::json!({
        "registry": registry_stats,
        "route_count": state.registry.count(),
        "cache": cache_stats,
    }))
}
