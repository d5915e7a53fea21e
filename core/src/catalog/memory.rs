// bazaar/src/catalog/memory.rs

use crate::catalog::{Catalog, ProductFilter};
use crate::error::{MarketError, MarketResult};
use crate::models::Product;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory catalog for tests, development and seeded demos.
///
/// Products are kept in insertion order so listings are stable.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
  products: Arc<RwLock<Vec<Product>>>,
}

impl MemoryCatalog {
  pub fn new() -> Self {
    Self::default()
  }

  /// Inserts or replaces a product by id.
  pub fn upsert_product(&self, product: Product) {
    let mut products = self.products.write();
    match products.iter_mut().find(|p| p.id == product.id) {
      Some(existing) => *existing = product,
      None => products.push(product),
    }
  }

  pub fn set_price(&self, id: Uuid, price_cents: i64) -> MarketResult<()> {
    let mut products = self.products.write();
    let product = products
      .iter_mut()
      .find(|p| p.id == id)
      .ok_or_else(|| MarketError::not_found("Product not found"))?;
    product.price_cents = price_cents;
    Ok(())
  }

  pub fn remove_product(&self, id: Uuid) -> bool {
    let mut products = self.products.write();
    let before = products.len();
    products.retain(|p| p.id != id);
    products.len() != before
  }
}

#[async_trait]
impl Catalog for MemoryCatalog {
  async fn get_product(&self, id: Uuid) -> MarketResult<Option<Product>> {
    Ok(self.products.read().iter().find(|p| p.id == id).cloned())
  }

  async fn list_products(&self, filter: &ProductFilter) -> MarketResult<Vec<Product>> {
    Ok(self.products.read().iter().filter(|p| filter.matches(p)).cloned().collect())
  }

  async fn search_products(&self, query: &str) -> MarketResult<Vec<Product>> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
      return Err(MarketError::invalid_argument("Please enter a query"));
    }
    Ok(
      self
        .products
        .read()
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&needle) || p.description.to_lowercase().contains(&needle))
        .cloned()
        .collect(),
    )
  }
}
