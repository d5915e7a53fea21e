// bazaar/src/error.rs
use thiserror::Error;

/// Failures of the step pipeline machinery itself (as opposed to the business
/// errors its handlers raise).
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Step already declared: {step_name}")]
  DuplicateStep { step_name: String },

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Pipeline '{pipeline}' finished without producing {missing}")]
  MissingOutput { pipeline: &'static str, missing: &'static str },

  #[error("Pipeline '{pipeline}' was halted before completion")]
  Halted { pipeline: &'static str },
}

/// The error taxonomy of the cart and order engines.
///
/// The messages of `NotFound`, `InvalidState`, `InvalidArgument`, `Unauthorized`
/// and `Unexpected` are meant for the caller and are surfaced verbatim.
/// `Storage` and `Flow` carry internal detail that must stay in the logs.
#[derive(Debug, Error)]
pub enum MarketError {
  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  InvalidState(String),

  #[error("{0}")]
  InvalidArgument(String),

  #[error("{0}")]
  Unauthorized(String),

  #[error("{0}")]
  Unexpected(String),

  #[error("Storage failure: {0}")]
  Storage(#[source] anyhow::Error),

  #[error("Pipeline failure: {0}")]
  Flow(#[from] FlowError),
}

impl MarketError {
  pub fn not_found(msg: impl Into<String>) -> Self {
    MarketError::NotFound(msg.into())
  }

  pub fn invalid_state(msg: impl Into<String>) -> Self {
    MarketError::InvalidState(msg.into())
  }

  pub fn invalid_argument(msg: impl Into<String>) -> Self {
    MarketError::InvalidArgument(msg.into())
  }

  pub fn unauthorized(msg: impl Into<String>) -> Self {
    MarketError::Unauthorized(msg.into())
  }

  pub fn unexpected(msg: impl Into<String>) -> Self {
    MarketError::Unexpected(msg.into())
  }

  /// The message that may be shown to a client. Internal variants collapse to
  /// a generic sentence.
  pub fn public_message(&self) -> String {
    match self {
      MarketError::Storage(_) => "Database operation failed".to_string(),
      MarketError::Flow(_) => "Internal server error".to_string(),
      other => other.to_string(),
    }
  }
}

impl From<sqlx::Error> for MarketError {
  fn from(err: sqlx::Error) -> Self {
    MarketError::Storage(err.into())
  }
}

pub type MarketResult<T, E = MarketError> = std::result::Result<T, E>;
