// bazaar/src/pipelines/order_pipeline.rs

use crate::catalog::Catalog;
use crate::error::{FlowError, MarketError, MarketResult};
use crate::flow::{ContextData, Pipeline, PipelineControl};
use crate::models::{Order, OrderLineItem, OrderStatus};
use crate::pipelines::contexts::{AdvanceStatusCtxData, CancelOrderCtxData, PlaceOrderCtxData};
use crate::pipelines::run_to_completion;
use crate::store::MarketStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

pub use crate::models::StatusPolicy;

/// Turns carts into orders and owns the order lifecycle.
pub struct OrderEngine {
  store: Arc<dyn MarketStore>,
  policy: StatusPolicy,
  place_order: Pipeline<PlaceOrderCtxData, MarketError>,
  cancel_order: Pipeline<CancelOrderCtxData, MarketError>,
  advance_status: Pipeline<AdvanceStatusCtxData, MarketError>,
}

impl std::fmt::Debug for OrderEngine {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OrderEngine")
      .field("policy", &self.policy)
      .field("place_order", &self.place_order)
      .field("cancel_order", &self.cancel_order)
      .field("advance_status", &self.advance_status)
      .finish_non_exhaustive()
  }
}

impl OrderEngine {
  pub fn new(store: Arc<dyn MarketStore>, catalog: Arc<dyn Catalog>, policy: StatusPolicy) -> MarketResult<Self> {
    Ok(Self {
      place_order: build_place_order_pipeline(&store, &catalog)?,
      cancel_order: build_cancel_order_pipeline(&store)?,
      advance_status: build_advance_status_pipeline(&store, policy)?,
      store,
      policy,
    })
  }

  /// Prices the buyer's cart at current catalog prices, records a `pending`
  /// order and empties the cart in one unit of work.
  #[instrument(name = "OrderEngine::place_order", skip(self), err(Display))]
  pub async fn place_order(&self, buyer_id: Uuid) -> MarketResult<Order> {
    let done = run_to_completion(
      &self.place_order,
      PlaceOrderCtxData {
        buyer_id,
        cart: None,
        priced_lines: Vec::new(),
        order: None,
      },
    )
    .await?;
    done.order.ok_or_else(|| {
      FlowError::MissingOutput {
        pipeline: self.place_order.name(),
        missing: "order",
      }
      .into()
    })
  }

  /// All orders of a buyer, oldest first.
  #[instrument(name = "OrderEngine::list_orders", skip(self), err(Display))]
  pub async fn list_orders(&self, buyer_id: Uuid) -> MarketResult<Vec<Order>> {
    let orders = self.store.list_orders(buyer_id).await?;
    debug!(count = orders.len(), "Orders listed.");
    Ok(orders)
  }

  /// A single order, visible only to its buyer.
  #[instrument(name = "OrderEngine::get_order", skip(self), err(Display))]
  pub async fn get_order(&self, buyer_id: Uuid, order_id: Uuid) -> MarketResult<Order> {
    find_owned_order(self.store.as_ref(), buyer_id, order_id).await
  }

  /// Administrative status change. `new_status` is the raw wire value.
  #[instrument(name = "OrderEngine::advance_status", skip(self), err(Display))]
  pub async fn advance_status(&self, order_id: Uuid, new_status: &str) -> MarketResult<()> {
    let done = run_to_completion(
      &self.advance_status,
      AdvanceStatusCtxData {
        order_id,
        requested_status: new_status.to_string(),
        status: None,
        order: None,
        previous_status: None,
        changed: false,
      },
    )
    .await?;
    info!(%order_id, status = new_status, changed = done.changed, "Order status set.");
    Ok(())
  }

  #[instrument(name = "OrderEngine::cancel_order", skip(self), err(Display))]
  pub async fn cancel_order(&self, buyer_id: Uuid, order_id: Uuid) -> MarketResult<()> {
    run_to_completion(
      &self.cancel_order,
      CancelOrderCtxData {
        buyer_id,
        order_id,
        order: None,
      },
    )
    .await?;
    info!(%buyer_id, %order_id, "Order cancelled.");
    Ok(())
  }
}

/// Looks an order up for its owner. Foreign and unknown ids are
/// indistinguishable to the caller.
async fn find_owned_order(store: &dyn MarketStore, buyer_id: Uuid, order_id: Uuid) -> MarketResult<Order> {
  match store.find_order(order_id).await? {
    Some(order) if order.buyer_id() == buyer_id => Ok(order),
    Some(_) => {
      warn!(%buyer_id, %order_id, "Order requested by a buyer who does not own it.");
      Err(MarketError::not_found("Order not found"))
    }
    None => Err(MarketError::not_found("Order not found")),
  }
}

fn build_place_order_pipeline(
  store: &Arc<dyn MarketStore>,
  catalog: &Arc<dyn Catalog>,
) -> MarketResult<Pipeline<PlaceOrderCtxData, MarketError>> {
  let mut p = Pipeline::<PlaceOrderCtxData, MarketError>::new(
    "place_order",
    &[
      ("load_cart", false),
      ("price_lines", false),
      ("build_order", false),
      ("commit_order", false),
    ],
  )?;

  let load_store = Arc::clone(store);
  p.on("load_cart", move |ctx: ContextData<PlaceOrderCtxData>| {
    let store = Arc::clone(&load_store);
    async move {
      let buyer_id = ctx.read().buyer_id;
      let cart = store
        .find_cart(buyer_id)
        .await?
        .filter(|cart| !cart.is_empty())
        .ok_or_else(|| MarketError::invalid_state("Your cart is empty."))?;
      ctx.write().cart = Some(cart);
      Ok::<_, MarketError>(PipelineControl::Continue)
    }
  })?;

  let catalog = Arc::clone(catalog);
  p.on("price_lines", move |ctx: ContextData<PlaceOrderCtxData>| {
    let catalog = Arc::clone(&catalog);
    async move {
      let cart = ctx.read().cart.clone();
      let cart = cart.ok_or_else(|| MarketError::unexpected("Cart was not loaded"))?;

      // Lines the cart view cannot show are not sold either.
      let mut priced = Vec::with_capacity(cart.items().len());
      for line in cart.items() {
        match catalog.get_product(line.product_id).await? {
          Some(product) => priced.push(OrderLineItem::new(product.id, line.quantity, product.price_cents)),
          None => {
            warn!(product_id = %line.product_id, cart_id = %cart.id, "Dropping cart line whose product left the catalog.");
          }
        }
      }
      if priced.is_empty() {
        return Err(MarketError::invalid_state("Your cart is empty."));
      }

      ctx.write().priced_lines = priced;
      Ok::<_, MarketError>(PipelineControl::Continue)
    }
  })?;

  p.on("build_order", |ctx: ContextData<PlaceOrderCtxData>| async move {
    let (buyer_id, lines) = {
      let mut guard = ctx.write();
      (guard.buyer_id, std::mem::take(&mut guard.priced_lines))
    };
    let order = Order::place(buyer_id, lines, Utc::now())?;
    ctx.write().order = Some(order);
    Ok::<_, MarketError>(PipelineControl::Continue)
  })?;

  let commit_store = Arc::clone(store);
  p.on("commit_order", move |ctx: ContextData<PlaceOrderCtxData>| {
    let store = Arc::clone(&commit_store);
    async move {
      let order = ctx.read().order.clone();
      let order = order.ok_or_else(|| MarketError::unexpected("Order was not built"))?;
      store.commit_order(&order).await?;
      Ok::<_, MarketError>(PipelineControl::Continue)
    }
  })?;

  p.after("commit_order", |ctx: ContextData<PlaceOrderCtxData>| async move {
    if let Some(order) = ctx.read().order.as_ref() {
      info!(
        order_id = %order.id(),
        buyer_id = %order.buyer_id(),
        lines = order.items().len(),
        total_amount_cents = order.total_amount_cents(),
        "Order placed."
      );
    }
    Ok::<_, MarketError>(PipelineControl::Continue)
  })?;

  Ok(p)
}

fn build_cancel_order_pipeline(store: &Arc<dyn MarketStore>) -> MarketResult<Pipeline<CancelOrderCtxData, MarketError>> {
  let mut p = Pipeline::<CancelOrderCtxData, MarketError>::new(
    "cancel_order",
    &[("load_order", false), ("transition", false), ("persist_status", false)],
  )?;

  let load_store = Arc::clone(store);
  p.on("load_order", move |ctx: ContextData<CancelOrderCtxData>| {
    let store = Arc::clone(&load_store);
    async move {
      let (buyer_id, order_id) = {
        let guard = ctx.read();
        (guard.buyer_id, guard.order_id)
      };
      let order = find_owned_order(store.as_ref(), buyer_id, order_id).await?;
      ctx.write().order = Some(order);
      Ok::<_, MarketError>(PipelineControl::Continue)
    }
  })?;

  p.on("transition", |ctx: ContextData<CancelOrderCtxData>| async move {
    let mut guard = ctx.write();
    let order = guard
      .order
      .as_mut()
      .ok_or_else(|| MarketError::unexpected("Order was not loaded"))?;
    order.cancel()?;
    Ok::<_, MarketError>(PipelineControl::Continue)
  })?;

  let persist_store = Arc::clone(store);
  p.on("persist_status", move |ctx: ContextData<CancelOrderCtxData>| {
    let store = Arc::clone(&persist_store);
    async move {
      let order = ctx.read().order.clone();
      let order = order.ok_or_else(|| MarketError::unexpected("Order was not loaded"))?;
      // A concurrent completion must not be overwritten by the cancel.
      store.update_status(&order, OrderStatus::Pending).await?;
      Ok::<_, MarketError>(PipelineControl::Continue)
    }
  })?;

  Ok(p)
}

fn build_advance_status_pipeline(
  store: &Arc<dyn MarketStore>,
  policy: StatusPolicy,
) -> MarketResult<Pipeline<AdvanceStatusCtxData, MarketError>> {
  let mut p = Pipeline::<AdvanceStatusCtxData, MarketError>::new(
    "advance_status",
    &[
      ("parse_status", false),
      ("load_order", false),
      ("transition", false),
      ("persist_status", false),
    ],
  )?;

  p.on("parse_status", |ctx: ContextData<AdvanceStatusCtxData>| async move {
    let status = ctx.read().requested_status.parse::<OrderStatus>()?;
    ctx.write().status = Some(status);
    Ok::<_, MarketError>(PipelineControl::Continue)
  })?;

  let load_store = Arc::clone(store);
  p.on("load_order", move |ctx: ContextData<AdvanceStatusCtxData>| {
    let store = Arc::clone(&load_store);
    async move {
      let order_id = ctx.read().order_id;
      let order = store
        .find_order(order_id)
        .await?
        .ok_or_else(|| MarketError::not_found("Order not found"))?;
      ctx.write().order = Some(order);
      Ok::<_, MarketError>(PipelineControl::Continue)
    }
  })?;

  p.on("transition", move |ctx: ContextData<AdvanceStatusCtxData>| async move {
    let mut guard = ctx.write();
    let next = guard
      .status
      .ok_or_else(|| MarketError::unexpected("Status was not parsed"))?;
    let order = guard
      .order
      .as_mut()
      .ok_or_else(|| MarketError::unexpected("Order was not loaded"))?;
    let previous = order.status();
    let changed = order.advance(next, policy)?;
    guard.previous_status = Some(previous);
    guard.changed = changed;
    Ok::<_, MarketError>(PipelineControl::Continue)
  })?;

  let persist_store = Arc::clone(store);
  p.on("persist_status", move |ctx: ContextData<AdvanceStatusCtxData>| {
    let store = Arc::clone(&persist_store);
    async move {
      let (changed, previous, order) = {
        let guard = ctx.read();
        (guard.changed, guard.previous_status, guard.order.clone())
      };
      if !changed {
        debug!("Status unchanged, nothing to persist.");
        return Ok(PipelineControl::Continue);
      }
      let (Some(order), Some(previous)) = (order, previous) else {
        return Err(MarketError::unexpected("Order was not loaded"));
      };
      store.update_status(&order, previous).await?;
      Ok::<_, MarketError>(PipelineControl::Continue)
    }
  })?;

  Ok(p)
}
