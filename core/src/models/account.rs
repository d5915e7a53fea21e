// bazaar/src/models/account.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::MarketError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Buyer,
  Seller,
  Admin,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Role::Buyer => "buyer",
      Role::Seller => "seller",
      Role::Admin => "admin",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Role {
  type Err = MarketError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "buyer" => Ok(Role::Buyer),
      "seller" => Ok(Role::Seller),
      "admin" => Ok(Role::Admin),
      other => Err(MarketError::invalid_argument(format!("Invalid role: {}", other))),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
  pub id: Uuid,
  pub email: String,
  pub name: String,
  #[serde(skip_serializing, default)] // Never send the password hash to a client
  pub password_hash: String,
  pub role: Role,
  pub created_at: DateTime<Utc>,
}

/// The identity a bearer credential resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
  pub account_id: Uuid,
  pub role: Role,
}

impl Principal {
  /// Fails with `Unauthorized` unless the principal holds one of `roles`.
  pub fn require(&self, roles: &[Role]) -> Result<(), MarketError> {
    if roles.contains(&self.role) {
      Ok(())
    } else {
      Err(MarketError::unauthorized("Unauthorized"))
    }
  }
}
