// bazaar/src/store/memory.rs

use crate::error::{MarketError, MarketResult};
use crate::models::{Cart, Order, OrderStatus};
use crate::store::{CartStore, OrderStore, UnitOfWork, STATUS_CONFLICT};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
struct MemoryState {
  // keyed by buyer id, which is what makes the cart unique per buyer
  carts: HashMap<Uuid, Cart>,
  // creation order
  orders: Vec<Order>,
}

/// In-memory backend. Carts and orders share one lock, so
/// [`commit_order`](UnitOfWork::commit_order) is trivially atomic.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn order_count(&self) -> usize {
    self.state.read().orders.len()
  }
}

#[async_trait]
impl CartStore for MemoryStore {
  async fn find_cart(&self, buyer_id: Uuid) -> MarketResult<Option<Cart>> {
    Ok(self.state.read().carts.get(&buyer_id).cloned())
  }

  async fn get_or_create_cart(&self, buyer_id: Uuid) -> MarketResult<Cart> {
    let mut state = self.state.write();
    let cart = state.carts.entry(buyer_id).or_insert_with(|| {
      debug!(%buyer_id, "Creating cart on first use.");
      Cart::new(buyer_id)
    });
    Ok(cart.clone())
  }

  async fn save_cart(&self, cart: &Cart) -> MarketResult<()> {
    let mut state = self.state.write();
    match state.carts.get(&cart.buyer_id) {
      Some(existing) if existing.id != cart.id => Err(MarketError::unexpected(format!(
        "Buyer {} already owns cart {}",
        cart.buyer_id, existing.id
      ))),
      _ => {
        state.carts.insert(cart.buyer_id, cart.clone());
        Ok(())
      }
    }
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn find_order(&self, order_id: Uuid) -> MarketResult<Option<Order>> {
    Ok(self.state.read().orders.iter().find(|o| o.id() == order_id).cloned())
  }

  async fn list_orders(&self, buyer_id: Uuid) -> MarketResult<Vec<Order>> {
    Ok(
      self
        .state
        .read()
        .orders
        .iter()
        .filter(|o| o.buyer_id() == buyer_id)
        .cloned()
        .collect(),
    )
  }

  async fn update_status(&self, order: &Order, expected: OrderStatus) -> MarketResult<()> {
    let mut state = self.state.write();
    let stored = state
      .orders
      .iter_mut()
      .find(|o| o.id() == order.id())
      .ok_or_else(|| MarketError::not_found("Order not found"))?;
    if stored.status() != expected {
      return Err(MarketError::invalid_state(STATUS_CONFLICT));
    }
    *stored = order.clone();
    Ok(())
  }
}

#[async_trait]
impl UnitOfWork for MemoryStore {
  async fn commit_order(&self, order: &Order) -> MarketResult<()> {
    let mut state = self.state.write();
    if state.orders.iter().any(|o| o.id() == order.id()) {
      return Err(MarketError::unexpected(format!("Order {} already exists", order.id())));
    }
    state.orders.push(order.clone());
    if let Some(cart) = state.carts.get_mut(&order.buyer_id()) {
      cart.clear();
    }
    Ok(())
  }
}
