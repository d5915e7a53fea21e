// bazaar/server/src/errors.rs

use crate::web::envelope::Envelope;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use bazaar::MarketError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  /// Malformed requests: bad JSON, unparsable path ids, missing fields.
  #[error("{0}")]
  Validation(String),

  #[error("Configuration error: {0}")]
  Config(String),

  #[error(transparent)]
  Market(#[from] MarketError),
}

impl AppError {
  /// The text placed in the envelope's `error` field.
  pub fn public_message(&self) -> String {
    match self {
      AppError::Validation(m) => m.clone(),
      AppError::Config(_) => "Internal server error".to_string(),
      AppError::Market(e) => e.public_message(),
    }
  }
}

impl From<sqlx::Error> for AppError {
  fn from(err: sqlx::Error) -> Self {
    AppError::Market(MarketError::from(err))
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
      AppError::Market(e) => match e {
        MarketError::NotFound(_) => StatusCode::NOT_FOUND,
        MarketError::InvalidState(_) | MarketError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        MarketError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        MarketError::Unexpected(_) | MarketError::Storage(_) | MarketError::Flow(_) => {
          StatusCode::INTERNAL_SERVER_ERROR
        }
      },
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      // Full detail (including sources) stays in the log.
      tracing::error!(application_error = ?self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, status = status.as_u16(), "Responding with error");
    }
    HttpResponse::build(status).json(Envelope::<()>::failure(self.public_message()))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
