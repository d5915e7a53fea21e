// bazaar/src/models/product.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A catalog product as supplied by the [`Catalog`](crate::catalog::Catalog).
///
/// Prices are integer minor units (cents). `stock_quantity` is informational:
/// placing an order does not decrement it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub description: String,
  pub price_cents: i64,
  pub seller_id: Uuid,
  pub image_url: String,
  pub stock_quantity: i64,
  // kg, g, pcs, ...
  pub units: String,
}
