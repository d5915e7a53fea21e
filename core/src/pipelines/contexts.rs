// bazaar/src/pipelines/contexts.rs

//! Context data threaded through the engine pipelines. Each pipeline reads
//! its inputs from the first fields and fills the `Option`s as steps complete.

use crate::models::{Cart, CartView, Order, OrderLineItem, OrderStatus, Product};
use uuid::Uuid;

// --- Cart pipelines ---

#[derive(Debug, Clone)]
pub struct AddItemCtxData {
  pub buyer_id: Uuid,
  pub product_id: Uuid,
  pub quantity: u32,
  pub product: Option<Product>,
  pub cart: Option<Cart>,
  pub line_quantity: Option<u32>,
}

impl AddItemCtxData {
  pub fn new(buyer_id: Uuid, product_id: Uuid, quantity: u32) -> Self {
    Self {
      buyer_id,
      product_id,
      quantity,
      product: None,
      cart: None,
      line_quantity: None,
    }
  }
}

#[derive(Debug, Clone)]
pub struct RemoveItemCtxData {
  pub buyer_id: Uuid,
  pub product_id: Uuid,
  pub cart: Option<Cart>,
  pub remaining: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ClearCartCtxData {
  pub buyer_id: Uuid,
  pub cart: Option<Cart>,
}

#[derive(Debug, Clone)]
pub struct ViewCartCtxData {
  pub buyer_id: Uuid,
  pub cart: Option<Cart>,
  pub view: Option<CartView>,
}

// --- Order pipelines ---

#[derive(Debug, Clone)]
pub struct PlaceOrderCtxData {
  pub buyer_id: Uuid,
  pub cart: Option<Cart>,
  pub priced_lines: Vec<OrderLineItem>,
  pub order: Option<Order>,
}

#[derive(Debug, Clone)]
pub struct CancelOrderCtxData {
  pub buyer_id: Uuid,
  pub order_id: Uuid,
  pub order: Option<Order>,
}

#[derive(Debug, Clone)]
pub struct AdvanceStatusCtxData {
  pub order_id: Uuid,
  pub requested_status: String,
  pub status: Option<OrderStatus>,
  pub order: Option<Order>,
  pub previous_status: Option<OrderStatus>,
  pub changed: bool,
}
