use crate::error::ServiceError;
use crate::services::rented_books::{RentedBookService, DEFAULT_PAGE_SIZE};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

/// List currently rented books
///
/// GET /book?page=0&size=20
pub async fn get_rented_books(
    service: web::Data<Arc<RentedBookService>>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ServiceError> {
    let page = query.page.unwrap_or(0);
    let size = query.size.unwrap_or(DEFAULT_PAGE_SIZE);
    info!(page = page, size = size, "Received get rented books request");

    let books = service.list_rented(page, size).await?;
    Ok(HttpResponse::Ok().json(books))
}

/// Remove a rental by ISBN
///
/// DELETE /book/{isbn}
pub async fn delete_rental(
    service: web::Data<Arc<RentedBookService>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let isbn = path.into_inner();
    service.remove_by_isbn(&isbn).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/book")
            .route("", web::get().to(get_rented_books))
            .route("/{isbn}", web::delete().to(delete_rental)),
    );
}
