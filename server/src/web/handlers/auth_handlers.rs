// bazaar/server/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use bazaar::{MarketError, NewAccount, Role};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::envelope;

#[derive(Deserialize, Debug)]
pub struct SignupRequestPayload {
  pub email: String,
  pub password: String,
  pub name: String,
  pub role: String,
}

#[derive(Deserialize, Debug)]
pub struct LoginRequestPayload {
  pub email: String,
  pub password: String,
}

#[instrument(name = "handler::signup", skip(app_state, req_payload), fields(role = %req_payload.role))]
pub async fn signup_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SignupRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let role = match payload.role.parse::<Role>()? {
    Role::Admin => return Err(MarketError::invalid_argument("Invalid role").into()),
    role => role,
  };

  let account = app_state.directory.create_account(NewAccount {
    email: payload.email,
    password: payload.password,
    name: payload.name,
    role,
  })
  .await?;

  info!(account_id = %account.id, "Signup completed.");
  Ok(envelope::created(account))
}

#[instrument(name = "handler::login", skip(app_state, req_payload))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<LoginRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let account = app_state
    .directory
    .verify_credentials(&req_payload.email, &req_payload.password)
    .await?;
  let issued = app_state.directory.issue_token(&account).await?;

  info!(account_id = %account.id, "Login succeeded.");
  Ok(envelope::ok(issued))
}
