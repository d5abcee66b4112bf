//! # API Module
//!
//! Mounts the admin REST surface (route CRUD, refresh trigger, stats) under
//! `/api/v1`, and the demonstration forward path at `/gateway`.

pub mod demo;
pub mod routes;

use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(routes::list_routes)
            .service(routes::get_route)
            .service(routes::create_route)
            .service(routes::delete_route)
            .service(routes::refresh_routes)
            .service(routes::stats),
    );
    cfg.service(web::resource("/gateway/{tail:.*}").default_service(web::to(demo::forward)));
}
