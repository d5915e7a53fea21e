// bazaar/src/store/postgres.rs

use crate::error::{MarketError, MarketResult};
use crate::models::{Cart, CartLineItem, Order, OrderLineItem, OrderStatus};
use crate::store::{CartStore, OrderStore, UnitOfWork, STATUS_CONFLICT};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use tracing::{error, info, instrument};
use uuid::Uuid;

const SCHEMA: &str = include_str!("schema.sql");

#[derive(Debug, FromRow)]
struct CartItemRow {
  id: Uuid,
  product_id: Uuid,
  quantity: i32,
}

#[derive(Debug, FromRow)]
struct OrderRow {
  id: Uuid,
  buyer_id: Uuid,
  total_amount_cents: i64,
  status: String,
  created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
  id: Uuid,
  order_id: Uuid,
  product_id: Uuid,
  quantity: i32,
  unit_price_cents: i64,
}

/// PostgreSQL backend. The order unit of work runs in one SQL transaction.
#[derive(Debug, Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  /// Applies the bundled schema. Safe to run on every start.
  #[instrument(name = "PgStore::migrate", skip(self), err(Display))]
  pub async fn migrate(&self) -> MarketResult<()> {
    sqlx::raw_sql(SCHEMA).execute(&self.pool).await.map_err(translate)?;
    info!("Database schema is up to date.");
    Ok(())
  }

  async fn load_cart_items(&self, cart_id: Uuid) -> MarketResult<Vec<CartLineItem>> {
    let rows = sqlx::query_as::<_, CartItemRow>(
      "SELECT id, product_id, quantity FROM cart_items WHERE cart_id = $1 ORDER BY position",
    )
    .bind(cart_id)
    .fetch_all(&self.pool)
    .await
    .map_err(translate)?;

    rows
      .into_iter()
      .map(|row| {
        Ok(CartLineItem {
          id: row.id,
          product_id: row.product_id,
          quantity: to_quantity(row.quantity)?,
        })
      })
      .collect()
  }

  async fn assemble_orders(&self, rows: Vec<OrderRow>) -> MarketResult<Vec<Order>> {
    if rows.is_empty() {
      return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let item_rows = sqlx::query_as::<_, OrderItemRow>(
      r#"
      SELECT id, order_id, product_id, quantity, unit_price_cents
      FROM order_items
      WHERE order_id = ANY($1)
      ORDER BY order_id, position
      "#,
    )
    .bind(&ids)
    .fetch_all(&self.pool)
    .await
    .map_err(translate)?;

    let mut lines_by_order: HashMap<Uuid, Vec<OrderLineItem>> = HashMap::new();
    for row in item_rows {
      lines_by_order.entry(row.order_id).or_default().push(OrderLineItem {
        id: row.id,
        product_id: row.product_id,
        quantity: to_quantity(row.quantity)?,
        unit_price_cents: row.unit_price_cents,
      });
    }

    rows
      .into_iter()
      .map(|row| {
        let items = lines_by_order.remove(&row.id).unwrap_or_default();
        Order::from_parts(
          row.id,
          row.buyer_id,
          items,
          row.total_amount_cents,
          row.status.parse::<OrderStatus>().map_err(|_| {
            MarketError::unexpected(format!("Stored order {} has unknown status '{}'", row.id, row.status))
          })?,
          row.created_at,
        )
      })
      .collect()
  }
}

#[async_trait]
impl CartStore for PgStore {
  async fn find_cart(&self, buyer_id: Uuid) -> MarketResult<Option<Cart>> {
    let cart_id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM carts WHERE buyer_id = $1")
      .bind(buyer_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(translate)?;

    match cart_id {
      Some(id) => {
        let items = self.load_cart_items(id).await?;
        Ok(Some(Cart::from_parts(id, buyer_id, items)))
      }
      None => Ok(None),
    }
  }

  async fn get_or_create_cart(&self, buyer_id: Uuid) -> MarketResult<Cart> {
    sqlx::query("INSERT INTO carts (id, buyer_id) VALUES ($1, $2) ON CONFLICT (buyer_id) DO NOTHING")
      .bind(Uuid::new_v4())
      .bind(buyer_id)
      .execute(&self.pool)
      .await
      .map_err(translate)?;

    self
      .find_cart(buyer_id)
      .await?
      .ok_or_else(|| MarketError::unexpected(format!("Cart for buyer {} vanished after creation", buyer_id)))
  }

  async fn save_cart(&self, cart: &Cart) -> MarketResult<()> {
    let mut tx = self.pool.begin().await.map_err(translate)?;

    sqlx::query("INSERT INTO carts (id, buyer_id) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
      .bind(cart.id)
      .bind(cart.buyer_id)
      .execute(&mut *tx)
      .await
      .map_err(translate)?;
    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
      .bind(cart.id)
      .execute(&mut *tx)
      .await
      .map_err(translate)?;
    for (position, line) in cart.items().iter().enumerate() {
      sqlx::query(
        "INSERT INTO cart_items (id, cart_id, product_id, quantity, position) VALUES ($1, $2, $3, $4, $5)",
      )
      .bind(line.id)
      .bind(cart.id)
      .bind(line.product_id)
      .bind(from_quantity(line.quantity)?)
      .bind(to_position(position)?)
      .execute(&mut *tx)
      .await
      .map_err(translate)?;
    }

    tx.commit().await.map_err(translate)?;
    Ok(())
  }
}

#[async_trait]
impl OrderStore for PgStore {
  async fn find_order(&self, order_id: Uuid) -> MarketResult<Option<Order>> {
    let row = sqlx::query_as::<_, OrderRow>(
      "SELECT id, buyer_id, total_amount_cents, status, created_at FROM orders WHERE id = $1",
    )
    .bind(order_id)
    .fetch_optional(&self.pool)
    .await
    .map_err(translate)?;

    match row {
      Some(row) => Ok(self.assemble_orders(vec![row]).await?.pop()),
      None => Ok(None),
    }
  }

  async fn list_orders(&self, buyer_id: Uuid) -> MarketResult<Vec<Order>> {
    let rows = sqlx::query_as::<_, OrderRow>(
      r#"
      SELECT id, buyer_id, total_amount_cents, status, created_at
      FROM orders
      WHERE buyer_id = $1
      ORDER BY created_at, id
      "#,
    )
    .bind(buyer_id)
    .fetch_all(&self.pool)
    .await
    .map_err(translate)?;

    self.assemble_orders(rows).await
  }

  async fn update_status(&self, order: &Order, expected: OrderStatus) -> MarketResult<()> {
    let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1 AND status = $3")
      .bind(order.id())
      .bind(order.status().as_str())
      .bind(expected.as_str())
      .execute(&self.pool)
      .await
      .map_err(translate)?;

    if result.rows_affected() == 0 {
      let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM orders WHERE id = $1")
        .bind(order.id())
        .fetch_optional(&self.pool)
        .await
        .map_err(translate)?;
      return Err(match exists {
        Some(_) => MarketError::invalid_state(STATUS_CONFLICT),
        None => MarketError::not_found("Order not found"),
      });
    }
    Ok(())
  }
}

#[async_trait]
impl UnitOfWork for PgStore {
  #[instrument(name = "PgStore::commit_order", skip(self, order), fields(order_id = %order.id(), buyer_id = %order.buyer_id()), err(Display))]
  async fn commit_order(&self, order: &Order) -> MarketResult<()> {
    let mut tx = self.pool.begin().await.map_err(translate)?;
    insert_order(&mut tx, order).await?;

    sqlx::query("DELETE FROM cart_items WHERE cart_id IN (SELECT id FROM carts WHERE buyer_id = $1)")
      .bind(order.buyer_id())
      .execute(&mut *tx)
      .await
      .map_err(translate)?;

    // Dropping an uncommitted transaction rolls it back, so any `?` above
    // leaves neither the order nor the cleared cart behind.
    tx.commit().await.map_err(translate)?;
    Ok(())
  }
}

async fn insert_order(tx: &mut Transaction<'_, Postgres>, order: &Order) -> MarketResult<()> {
  sqlx::query(
    "INSERT INTO orders (id, buyer_id, total_amount_cents, status, created_at) VALUES ($1, $2, $3, $4, $5)",
  )
  .bind(order.id())
  .bind(order.buyer_id())
  .bind(order.total_amount_cents())
  .bind(order.status().as_str())
  .bind(order.created_at())
  .execute(&mut **tx)
  .await
  .map_err(translate)?;

  for (position, line) in order.items().iter().enumerate() {
    sqlx::query(
      r#"
      INSERT INTO order_items (id, order_id, product_id, quantity, unit_price_cents, position)
      VALUES ($1, $2, $3, $4, $5, $6)
      "#,
    )
    .bind(line.id)
    .bind(order.id())
    .bind(line.product_id)
    .bind(from_quantity(line.quantity)?)
    .bind(line.unit_price_cents)
    .bind(to_position(position)?)
    .execute(&mut **tx)
    .await
    .map_err(translate)?;
  }
  Ok(())
}

/// Maps driver errors onto the domain taxonomy. Constraint violations get a
/// client-safe message; everything else stays an opaque storage failure.
fn translate(err: sqlx::Error) -> MarketError {
  if let sqlx::Error::Database(db_err) = &err {
    if db_err.is_unique_violation() {
      error!(error = %err, "Unique constraint violated.");
      return MarketError::invalid_state("Record already exists");
    }
    if db_err.is_check_violation() || db_err.is_foreign_key_violation() {
      error!(error = %err, "Integrity constraint violated.");
      return MarketError::unexpected("Data integrity check failed");
    }
  }
  MarketError::from(err)
}

fn to_quantity(raw: i32) -> MarketResult<u32> {
  u32::try_from(raw).map_err(|_| MarketError::unexpected(format!("Stored quantity {} is negative", raw)))
}

fn from_quantity(quantity: u32) -> MarketResult<i32> {
  i32::try_from(quantity).map_err(|_| MarketError::invalid_argument("Quantity too large"))
}

fn to_position(idx: usize) -> MarketResult<i32> {
  i32::try_from(idx).map_err(|_| MarketError::invalid_argument("Too many lines"))
}
