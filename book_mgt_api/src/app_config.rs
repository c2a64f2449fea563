use actix_web::error::InternalError;
use actix_web::web::{JsonConfig, PathConfig, QueryConfig};
use actix_web::HttpResponse;
use paperclip::actix::web;

use crate::api::DetailResponse;
use crate::handlers;

/// Turns an extractor failure into a 400 with a `{"detail": ...}` body
fn bad_request<E>(err: E) -> actix_web::Error
where
    E: std::fmt::Debug + std::fmt::Display + 'static,
{
    let detail = err.to_string();
    tracing::info!(detail, "Rejected request");
    InternalError::from_response(err, HttpResponse::BadRequest().json(DetailResponse::new(detail)))
        .into()
}

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.app_data(PathConfig::default().error_handler(|err, _| bad_request(err)))
        .app_data(JsonConfig::default().error_handler(|err, _| bad_request(err)))
        .app_data(QueryConfig::default().error_handler(|err, _| bad_request(err)))
        .service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::scope("/books")
                // both /books and /books/ list and create
                .service(
                    web::resource("")
                        .route(web::get().to(handlers::list_books))
                        .route(web::post().to(handlers::add_book)),
                )
                .service(
                    web::resource("/")
                        .route(web::get().to(handlers::list_books))
                        .route(web::post().to(handlers::add_book)),
                )
                .service(
                    web::scope("/{book_id}")
                        .service(
                            web::resource("")
                                .route(web::get().to(handlers::get_book))
                                .route(web::put().to(handlers::replace_book))
                                .route(web::patch().to(handlers::update_book))
                                .route(web::delete().to(handlers::delete_book)),
                        )
                        .service(
                            web::resource("/reviews")
                                .route(web::get().to(handlers::list_reviews))
                                .route(web::post().to(handlers::add_review)),
                        )
                        .service(
                            web::resource("/summary")
                                .route(web::get().to(handlers::review_summary)),
                        ),
                ),
        );
}
