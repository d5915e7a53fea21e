// bazaar/src/catalog/postgres.rs

use crate::catalog::{Catalog, ProductFilter};
use crate::error::{MarketError, MarketResult};
use crate::models::Product;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

const PRODUCT_COLUMNS: &str =
  "id, name, description, price_cents, seller_id, image_url, stock_quantity, units";

/// Catalog backed by the `products` table (see `store/schema.sql`).
#[derive(Debug, Clone)]
pub struct PgCatalog {
  pool: PgPool,
}

impl PgCatalog {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  /// Inserts or replaces a product by id. Used for seeding.
  #[instrument(name = "PgCatalog::upsert_product", skip(self, product), fields(product_id = %product.id), err(Display))]
  pub async fn upsert_product(&self, product: &Product) -> MarketResult<()> {
    sqlx::query(
      r#"
      INSERT INTO products (id, name, description, price_cents, seller_id, image_url, stock_quantity, units)
      VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
      ON CONFLICT (id) DO UPDATE
      SET name = EXCLUDED.name,
          description = EXCLUDED.description,
          price_cents = EXCLUDED.price_cents,
          seller_id = EXCLUDED.seller_id,
          image_url = EXCLUDED.image_url,
          stock_quantity = EXCLUDED.stock_quantity,
          units = EXCLUDED.units
      "#,
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price_cents)
    .bind(product.seller_id)
    .bind(&product.image_url)
    .bind(product.stock_quantity)
    .bind(&product.units)
    .execute(&self.pool)
    .await?;
    Ok(())
  }
}

#[async_trait]
impl Catalog for PgCatalog {
  async fn get_product(&self, id: Uuid) -> MarketResult<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
    let product = sqlx::query_as::<_, Product>(&sql)
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(product)
  }

  async fn list_products(&self, filter: &ProductFilter) -> MarketResult<Vec<Product>> {
    let sql = format!(
      "SELECT {} FROM products WHERE ($1::uuid IS NULL OR seller_id = $1) ORDER BY name, id",
      PRODUCT_COLUMNS
    );
    let products = sqlx::query_as::<_, Product>(&sql)
      .bind(filter.seller_id)
      .fetch_all(&self.pool)
      .await?;
    Ok(products)
  }

  async fn search_products(&self, query: &str) -> MarketResult<Vec<Product>> {
    let needle = query.trim();
    if needle.is_empty() {
      return Err(MarketError::invalid_argument("Please enter a query"));
    }
    let pattern = format!("%{}%", escape_like(needle));
    let sql = format!(
      "SELECT {} FROM products WHERE name ILIKE $1 OR description ILIKE $1 ORDER BY name, id",
      PRODUCT_COLUMNS
    );
    let products = sqlx::query_as::<_, Product>(&sql)
      .bind(pattern)
      .fetch_all(&self.pool)
      .await?;
    Ok(products)
  }
}

fn escape_like(raw: &str) -> String {
  let mut escaped = String::with_capacity(raw.len());
  for c in raw.chars() {
    if matches!(c, '%' | '_' | '\\') {
      escaped.push('\\');
    }
    escaped.push(c);
  }
  escaped
}
