// bazaar/server/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use bazaar::{MarketError, Role};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::envelope;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct AddToCartRequestPayload {
  pub product: Uuid,
  // Signed so that zero and negative values reach the quantity check.
  pub quantity: i64,
}

impl AddToCartRequestPayload {
  fn quantity(&self) -> Result<u32, MarketError> {
    if self.quantity < 1 {
      return Err(MarketError::invalid_argument("Quantity must be at least 1"));
    }
    u32::try_from(self.quantity).map_err(|_| MarketError::invalid_argument("Quantity too large"))
  }
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, req_payload, auth_user),
  fields(account_id = %auth_user.account_id(), product_id = %req_payload.product, quantity = req_payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<AddToCartRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let buyer_id = auth_user.require(&[Role::Buyer])?;
  let quantity = req_payload.quantity()?;
  app_state
    .cart_engine
    .add_item(buyer_id, req_payload.product, quantity)
    .await?;
  Ok(envelope::ok_empty())
}

#[instrument(name = "handler::view_cart", skip(app_state, auth_user), fields(account_id = %auth_user.account_id()))]
pub async fn view_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let buyer_id = auth_user.require(&[Role::Buyer])?;
  let view = app_state.cart_engine.view_cart(buyer_id).await?;
  Ok(envelope::ok(view))
}

#[instrument(name = "handler::clear_cart", skip(app_state, auth_user), fields(account_id = %auth_user.account_id()))]
pub async fn clear_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let buyer_id = auth_user.require(&[Role::Buyer])?;
  app_state.cart_engine.clear_cart(buyer_id).await?;
  Ok(envelope::ok_empty())
}

#[instrument(
  name = "handler::remove_from_cart",
  skip(app_state, path, auth_user),
  fields(account_id = %auth_user.account_id(), product_id = %path.as_ref())
)]
pub async fn remove_from_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let buyer_id = auth_user.require(&[Role::Buyer])?;
  app_state
    .cart_engine
    .remove_item(buyer_id, path.into_inner())
    .await?;
  Ok(envelope::ok_empty())
}
