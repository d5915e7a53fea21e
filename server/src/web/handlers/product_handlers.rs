// bazaar/server/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use bazaar::{MarketError, ProductFilter};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::envelope;

#[derive(Deserialize, Debug)]
pub struct ListProductsQuery {
  pub seller: Option<Uuid>,
}

#[derive(Deserialize, Debug)]
pub struct SearchRequestPayload {
  pub q: String,
}

#[instrument(name = "handler::list_products", skip(app_state, query_params))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query_params: web::Query<ListProductsQuery>,
) -> Result<HttpResponse, AppError> {
  let filter = ProductFilter {
    seller_id: query_params.seller,
  };
  let products = app_state.catalog.list_products(&filter).await?;
  info!(count = products.len(), "Products listed.");
  Ok(envelope::ok(products))
}

#[instrument(name = "handler::get_product", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  match app_state.catalog.get_product(product_id).await? {
    Some(product) => Ok(envelope::ok(product)),
    None => {
      warn!(%product_id, "Product not found.");
      Err(MarketError::not_found("Product not found").into())
    }
  }
}

#[instrument(name = "handler::search_products", skip(app_state, req_payload))]
pub async fn search_products_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SearchRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let products = app_state.catalog.search_products(&req_payload.q).await?;
  info!(count = products.len(), "Product search finished.");
  Ok(envelope::ok(products))
}
