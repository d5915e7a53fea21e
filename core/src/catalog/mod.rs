// bazaar/src/catalog/mod.rs

//! The product catalog as seen by the cart and order engines.
//!
//! The engines only ever read from it: the cart resolves product ids when an
//! item is added and joins live snapshots for display, the order engine reads
//! the current price once, at placement.

pub mod memory;
pub mod postgres;

pub use memory::MemoryCatalog;
pub use postgres::PgCatalog;

use crate::error::MarketResult;
use crate::models::Product;
use async_trait::async_trait;
use uuid::Uuid;

/// Listing filter for [`Catalog::list_products`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
  pub seller_id: Option<Uuid>,
}

impl ProductFilter {
  pub fn matches(&self, product: &Product) -> bool {
    self.seller_id.map_or(true, |seller| product.seller_id == seller)
  }
}

#[async_trait]
pub trait Catalog: Send + Sync {
  async fn get_product(&self, id: Uuid) -> MarketResult<Option<Product>>;

  async fn list_products(&self, filter: &ProductFilter) -> MarketResult<Vec<Product>>;

  /// Case-insensitive free-text match on name and description.
  async fn search_products(&self, query: &str) -> MarketResult<Vec<Product>>;
}
