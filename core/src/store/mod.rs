// bazaar/src/store/mod.rs

//! Persistence for carts and orders.
//!
//! [`CartStore`] and [`OrderStore`] cover single-entity reads and writes.
//! [`UnitOfWork`] covers the one cross-entity mutation of the core: placing an
//! order and emptying the source cart, which must be observed together.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::MarketResult;
use crate::models::{Cart, Order, OrderStatus};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait CartStore: Send + Sync {
  async fn find_cart(&self, buyer_id: Uuid) -> MarketResult<Option<Cart>>;

  /// Returns the buyer's cart, creating an empty one first if needed.
  /// Idempotent under concurrent first use: the buyer key is unique.
  async fn get_or_create_cart(&self, buyer_id: Uuid) -> MarketResult<Cart>;

  /// Replaces the stored items of `cart` with its current items.
  async fn save_cart(&self, cart: &Cart) -> MarketResult<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn find_order(&self, order_id: Uuid) -> MarketResult<Option<Order>>;

  /// Every order of a buyer, in creation order.
  async fn list_orders(&self, buyer_id: Uuid) -> MarketResult<Vec<Order>>;

  /// Writes the status of `order` if the stored status is still `expected`.
  /// `NotFound` if the order is gone, `InvalidState` if another writer moved
  /// its status first.
  async fn update_status(&self, order: &Order, expected: OrderStatus) -> MarketResult<()>;
}

#[async_trait]
pub trait UnitOfWork: Send + Sync {
  /// Inserts `order` and empties its buyer's cart atomically: either both
  /// effects are stored or neither is.
  async fn commit_order(&self, order: &Order) -> MarketResult<()>;
}

pub(crate) const STATUS_CONFLICT: &str = "Order status was changed by another request";

/// Everything the engines need from a storage backend.
pub trait MarketStore: CartStore + OrderStore + UnitOfWork {}

impl<T: CartStore + OrderStore + UnitOfWork> MarketStore for T {}
