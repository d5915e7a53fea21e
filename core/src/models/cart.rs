// bazaar/src/models/cart.rs

use serde::Serialize;
use uuid::Uuid;

use crate::error::{MarketError, MarketResult};
use crate::models::product::Product;

/// One product-and-quantity entry of a cart. Holds a reference to the catalog
/// product, never its price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
  pub id: Uuid,
  pub product_id: Uuid,
  pub quantity: u32,
}

/// A buyer's cart.
///
/// Invariants: at most one line per product, every quantity is positive.
/// Both are maintained by [`add`](Cart::add) and [`remove_one`](Cart::remove_one);
/// the item list is only reachable read-only from outside the crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
  pub id: Uuid,
  pub buyer_id: Uuid,
  items: Vec<CartLineItem>,
}

impl Cart {
  pub fn new(buyer_id: Uuid) -> Self {
    Self {
      id: Uuid::new_v4(),
      buyer_id,
      items: Vec::new(),
    }
  }

  /// Rebuilds a cart read back from storage. Lines are merged and zero
  /// quantities dropped so a malformed row set cannot break the invariants.
  pub(crate) fn from_parts(id: Uuid, buyer_id: Uuid, lines: Vec<CartLineItem>) -> Self {
    let mut cart = Self {
      id,
      buyer_id,
      items: Vec::with_capacity(lines.len()),
    };
    for line in lines.into_iter().filter(|l| l.quantity > 0) {
      match cart.items.iter_mut().find(|l| l.product_id == line.product_id) {
        Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
        None => cart.items.push(line),
      }
    }
    cart
  }

  pub fn items(&self) -> &[CartLineItem] {
    &self.items
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn line(&self, product_id: Uuid) -> Option<&CartLineItem> {
    self.items.iter().find(|l| l.product_id == product_id)
  }

  /// Adds `quantity` units of a product, aggregating into the existing line
  /// when there is one. Returns the resulting quantity of that line.
  pub fn add(&mut self, product_id: Uuid, quantity: u32) -> MarketResult<u32> {
    if quantity == 0 {
      return Err(MarketError::invalid_argument("Quantity must be at least 1"));
    }

    match self.items.iter_mut().find(|l| l.product_id == product_id) {
      Some(line) => {
        line.quantity = line
          .quantity
          .checked_add(quantity)
          .ok_or_else(|| MarketError::invalid_argument("Quantity too large"))?;
        Ok(line.quantity)
      }
      None => {
        self.items.push(CartLineItem {
          id: Uuid::new_v4(),
          product_id,
          quantity,
        });
        Ok(quantity)
      }
    }
  }

  /// Takes one unit of a product out of the cart. The line is deleted once its
  /// quantity reaches zero. Returns the remaining quantity (0 when deleted).
  pub fn remove_one(&mut self, product_id: Uuid) -> MarketResult<u32> {
    let idx = self
      .items
      .iter()
      .position(|l| l.product_id == product_id)
      .ok_or_else(|| MarketError::not_found("Product not found in cart"))?;

    let remaining = self.items[idx].quantity.saturating_sub(1);
    if remaining == 0 {
      self.items.remove(idx);
    } else {
      self.items[idx].quantity = remaining;
    }
    Ok(remaining)
  }

  pub fn clear(&mut self) {
    self.items.clear();
  }
}

/// A cart joined against the live catalog, for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
  pub id: Uuid,
  pub buyer_id: Uuid,
  pub items: Vec<CartViewItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartViewItem {
  pub id: Uuid,
  pub product: Product,
  pub quantity: u32,
}
