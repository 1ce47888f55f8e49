/// HTTP handlers for rental-service
pub mod books;

use crate::metrics;
use actix_web::web;

/// Register every route served by rental-service
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(|| async { "OK" }))
        .route("/ready", web::get().to(|| async { "READY" }))
        .route("/metrics", web::get().to(metrics::serve_metrics))
        .configure(books::register_routes);
}
