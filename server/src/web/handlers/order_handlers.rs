// bazaar/server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use bazaar::Role;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::envelope;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct UpdateStatusRequestPayload {
  pub status: String,
}

#[instrument(name = "handler::place_order", skip(app_state, auth_user), fields(account_id = %auth_user.account_id()))]
pub async fn place_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let buyer_id = auth_user.require(&[Role::Buyer])?;
  let order = app_state.order_engine.place_order(buyer_id).await?;
  info!(order_id = %order.id(), total_amount_cents = order.total_amount_cents(), "Checkout completed.");
  Ok(envelope::ok(order))
}

#[instrument(name = "handler::list_orders", skip(app_state, auth_user), fields(account_id = %auth_user.account_id()))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let buyer_id = auth_user.require(&[Role::Buyer])?;
  let orders = app_state.order_engine.list_orders(buyer_id).await?;
  Ok(envelope::ok(orders))
}

#[instrument(
  name = "handler::update_order_status",
  skip(app_state, path, req_payload, auth_user),
  fields(order_id = %path.as_ref(), status = %req_payload.status)
)]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<UpdateStatusRequestPayload>,
) -> Result<HttpResponse, AppError> {
  auth_user.require(&[Role::Admin])?;
  app_state
    .order_engine
    .advance_status(path.into_inner(), &req_payload.status)
    .await?;
  Ok(envelope::ok_empty())
}

#[instrument(
  name = "handler::cancel_order",
  skip(app_state, path, auth_user),
  fields(account_id = %auth_user.account_id(), order_id = %path.as_ref())
)]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let buyer_id = auth_user.require(&[Role::Buyer])?;
  app_state
    .order_engine
    .cancel_order(buyer_id, path.into_inner())
    .await?;
  Ok(envelope::ok_empty())
}
