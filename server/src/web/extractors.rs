// bazaar/server/src/web/extractors.rs

use crate::errors::AppError;
use crate::state::AppState;
use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use bazaar::{MarketError, Principal, Role};
use futures_util::future::LocalBoxFuture;
use tracing::warn;
use uuid::Uuid;

/// The caller behind an `Authorization: Bearer <token>` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub principal: Principal,
}

impl AuthenticatedUser {
  pub fn account_id(&self) -> Uuid {
    self.principal.account_id
  }

  /// The account id, if the caller holds one of `roles`.
  pub fn require(&self, roles: &[Role]) -> Result<Uuid, AppError> {
    self.principal.require(roles).map_err(|e| {
      warn!(account_id = %self.principal.account_id, role = %self.principal.role, "Role not allowed on this route.");
      AppError::from(e)
    })?;
    Ok(self.principal.account_id)
  }
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let state = req.app_data::<web::Data<AppState>>().cloned();
    let token = bearer_token(req);

    Box::pin(async move {
      let state = state.ok_or_else(|| MarketError::unexpected("Application state is not configured"))?;
      let token = token.ok_or_else(|| {
        warn!("Missing or malformed Authorization header.");
        MarketError::unauthorized("Unauthorized")
      })?;
      let principal = state.access.verify_token(&token).await?;
      Ok::<_, AppError>(AuthenticatedUser { principal })
    })
  }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
  let raw = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
  let (scheme, token) = raw.trim().split_once(' ')?;
  let token = token.trim();
  if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
    Some(token.to_string())
  } else {
    None
  }
}
