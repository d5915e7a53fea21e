// bazaar/server/src/web/routes.rs

use crate::errors::AppError;
use crate::web::handlers::{auth_handlers, cart_handlers, order_handlers, product_handlers};
use actix_web::{web, HttpResponse};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Request-shape failures become `Validation` errors, so they share the
/// envelope and the 400 status with every other client error.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(
      web::JsonConfig::default()
        .error_handler(|err, _req| AppError::Validation(format!("Invalid request body: {}", err)).into()),
    )
    .app_data(
      web::PathConfig::default().error_handler(|err, _req| AppError::Validation(format!("Invalid path: {}", err)).into()),
    )
    .app_data(
      web::QueryConfig::default()
        .error_handler(|err, _req| AppError::Validation(format!("Invalid query: {}", err)).into()),
    );
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  extractor_configs(cfg);

  cfg
    .route("/health", web::get().to(health_check_handler))
    .service(
      web::scope("/auth")
        .route("/signup", web::post().to(auth_handlers::signup_handler))
        .route("/login", web::post().to(auth_handlers::login_handler)),
    )
    .service(
      web::scope("/cart")
        .route("", web::post().to(cart_handlers::add_to_cart_handler))
        .route("", web::get().to(cart_handlers::view_cart_handler))
        .route("", web::delete().to(cart_handlers::clear_cart_handler))
        .route("/{product_id}", web::delete().to(cart_handlers::remove_from_cart_handler)),
    )
    .service(
      web::scope("/order")
        .route("", web::post().to(order_handlers::place_order_handler))
        .route("", web::get().to(order_handlers::list_orders_handler))
        .route("/{order_id}/status", web::put().to(order_handlers::update_order_status_handler))
        .route("/{order_id}/cancel", web::put().to(order_handlers::cancel_order_handler)),
    )
    .service(
      web::scope("/product")
        .route("", web::get().to(product_handlers::list_products_handler))
        .route("/search", web::post().to(product_handlers::search_products_handler))
        .route("/{product_id}", web::get().to(product_handlers::get_product_handler)),
    );
}
