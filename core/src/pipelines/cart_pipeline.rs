// bazaar/src/pipelines/cart_pipeline.rs

use crate::catalog::Catalog;
use crate::error::{FlowError, MarketError, MarketResult};
use crate::flow::{ContextData, Pipeline, PipelineControl};
use crate::models::{Cart, CartView, CartViewItem};
use crate::pipelines::contexts::{AddItemCtxData, ClearCartCtxData, RemoveItemCtxData, ViewCartCtxData};
use crate::pipelines::run_to_completion;
use crate::store::MarketStore;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Owns every buyer's cart: aggregation on add, decrement-to-delete on remove,
/// in-place clearing, and the live catalog join used for display.
pub struct CartEngine {
  store: Arc<dyn MarketStore>,
  add_item: Pipeline<AddItemCtxData, MarketError>,
  remove_item: Pipeline<RemoveItemCtxData, MarketError>,
  clear_cart: Pipeline<ClearCartCtxData, MarketError>,
  view_cart: Pipeline<ViewCartCtxData, MarketError>,
}

impl std::fmt::Debug for CartEngine {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CartEngine")
      .field("add_item", &self.add_item)
      .field("remove_item", &self.remove_item)
      .field("clear_cart", &self.clear_cart)
      .field("view_cart", &self.view_cart)
      .finish_non_exhaustive()
  }
}

impl CartEngine {
  pub fn new(store: Arc<dyn MarketStore>, catalog: Arc<dyn Catalog>) -> MarketResult<Self> {
    Ok(Self {
      add_item: build_add_item_pipeline(&store, &catalog)?,
      remove_item: build_remove_item_pipeline(&store)?,
      clear_cart: build_clear_cart_pipeline(&store)?,
      view_cart: build_view_cart_pipeline(&store, &catalog)?,
      store,
    })
  }

  /// Fetches the buyer's cart, creating an empty one on first use.
  #[instrument(name = "CartEngine::get_or_create_cart", skip(self), err(Display))]
  pub async fn get_or_create_cart(&self, buyer_id: Uuid) -> MarketResult<Cart> {
    self.store.get_or_create_cart(buyer_id).await
  }

  /// Adds `quantity` units of a catalog product to the buyer's cart.
  #[instrument(name = "CartEngine::add_item", skip(self), err(Display))]
  pub async fn add_item(&self, buyer_id: Uuid, product_id: Uuid, quantity: u32) -> MarketResult<()> {
    let done = run_to_completion(&self.add_item, AddItemCtxData::new(buyer_id, product_id, quantity)).await?;
    info!(
      %buyer_id, %product_id,
      line_quantity = done.line_quantity.unwrap_or_default(),
      "Item added to cart."
    );
    Ok(())
  }

  /// Takes one unit of a product out of the buyer's cart.
  #[instrument(name = "CartEngine::remove_item", skip(self), err(Display))]
  pub async fn remove_item(&self, buyer_id: Uuid, product_id: Uuid) -> MarketResult<()> {
    let done = run_to_completion(
      &self.remove_item,
      RemoveItemCtxData {
        buyer_id,
        product_id,
        cart: None,
        remaining: None,
      },
    )
    .await?;
    info!(%buyer_id, %product_id, remaining = done.remaining.unwrap_or_default(), "Item removed from cart.");
    Ok(())
  }

  #[instrument(name = "CartEngine::clear_cart", skip(self), err(Display))]
  pub async fn clear_cart(&self, buyer_id: Uuid) -> MarketResult<()> {
    run_to_completion(&self.clear_cart, ClearCartCtxData { buyer_id, cart: None }).await?;
    info!(%buyer_id, "Cart cleared.");
    Ok(())
  }

  /// The buyer's cart with every line resolved to its current catalog product.
  #[instrument(name = "CartEngine::view_cart", skip(self), err(Display))]
  pub async fn view_cart(&self, buyer_id: Uuid) -> MarketResult<CartView> {
    let done = run_to_completion(
      &self.view_cart,
      ViewCartCtxData {
        buyer_id,
        cart: None,
        view: None,
      },
    )
    .await?;
    done.view.ok_or_else(|| {
      FlowError::MissingOutput {
        pipeline: self.view_cart.name(),
        missing: "view",
      }
      .into()
    })
  }
}

fn build_add_item_pipeline(
  store: &Arc<dyn MarketStore>,
  catalog: &Arc<dyn Catalog>,
) -> MarketResult<Pipeline<AddItemCtxData, MarketError>> {
  let mut p = Pipeline::<AddItemCtxData, MarketError>::new(
    "add_item",
    &[
      ("validate_quantity", false),
      ("resolve_product", false),
      ("load_cart", false),
      ("merge_line", false),
      ("persist_cart", false),
    ],
  )?;

  p.on("validate_quantity", |ctx: ContextData<AddItemCtxData>| async move {
    let quantity = ctx.read().quantity;
    if quantity < 1 {
      return Err(MarketError::invalid_argument("Quantity must be at least 1"));
    }
    Ok::<_, MarketError>(PipelineControl::Continue)
  })?;

  let catalog = Arc::clone(catalog);
  p.on("resolve_product", move |ctx: ContextData<AddItemCtxData>| {
    let catalog = Arc::clone(&catalog);
    async move {
      let product_id = ctx.read().product_id;
      let product = catalog.get_product(product_id).await?.ok_or_else(|| {
        warn!(%product_id, "Add to cart: product not found in catalog.");
        MarketError::not_found("Product not found")
      })?;
      ctx.write().product = Some(product);
      Ok::<_, MarketError>(PipelineControl::Continue)
    }
  })?;

  let load_store = Arc::clone(store);
  p.on("load_cart", move |ctx: ContextData<AddItemCtxData>| {
    let store = Arc::clone(&load_store);
    async move {
      let buyer_id = ctx.read().buyer_id;
      let cart = store.get_or_create_cart(buyer_id).await?;
      ctx.write().cart = Some(cart);
      Ok::<_, MarketError>(PipelineControl::Continue)
    }
  })?;

  p.on("merge_line", |ctx: ContextData<AddItemCtxData>| async move {
    let mut guard = ctx.write();
    let (product_id, quantity) = (guard.product_id, guard.quantity);
    let cart = guard
      .cart
      .as_mut()
      .ok_or_else(|| MarketError::unexpected("Cart was not loaded"))?;
    let line_quantity = cart.add(product_id, quantity)?;
    debug!(%product_id, line_quantity, "Cart line merged.");
    guard.line_quantity = Some(line_quantity);
    Ok::<_, MarketError>(PipelineControl::Continue)
  })?;

  let persist_store = Arc::clone(store);
  p.on("persist_cart", move |ctx: ContextData<AddItemCtxData>| {
    let store = Arc::clone(&persist_store);
    async move {
      let cart = ctx.read().cart.clone();
      let cart = cart.ok_or_else(|| MarketError::unexpected("Cart was not loaded"))?;
      store.save_cart(&cart).await?;
      Ok::<_, MarketError>(PipelineControl::Continue)
    }
  })?;

  Ok(p)
}

fn build_remove_item_pipeline(store: &Arc<dyn MarketStore>) -> MarketResult<Pipeline<RemoveItemCtxData, MarketError>> {
  let mut p = Pipeline::<RemoveItemCtxData, MarketError>::new(
    "remove_item",
    &[("load_cart", false), ("decrement_line", false), ("persist_cart", false)],
  )?;

  let load_store = Arc::clone(store);
  p.on("load_cart", move |ctx: ContextData<RemoveItemCtxData>| {
    let store = Arc::clone(&load_store);
    async move {
      let buyer_id = ctx.read().buyer_id;
      // A buyer without a cart has nothing to remove.
      let cart = store
        .find_cart(buyer_id)
        .await?
        .ok_or_else(|| MarketError::not_found("Product not found in cart"))?;
      ctx.write().cart = Some(cart);
      Ok::<_, MarketError>(PipelineControl::Continue)
    }
  })?;

  p.on("decrement_line", |ctx: ContextData<RemoveItemCtxData>| async move {
    let mut guard = ctx.write();
    let product_id = guard.product_id;
    let cart = guard
      .cart
      .as_mut()
      .ok_or_else(|| MarketError::unexpected("Cart was not loaded"))?;
    let remaining = cart.remove_one(product_id)?;
    guard.remaining = Some(remaining);
    Ok::<_, MarketError>(PipelineControl::Continue)
  })?;

  let persist_store = Arc::clone(store);
  p.on("persist_cart", move |ctx: ContextData<RemoveItemCtxData>| {
    let store = Arc::clone(&persist_store);
    async move {
      let cart = ctx.read().cart.clone();
      let cart = cart.ok_or_else(|| MarketError::unexpected("Cart was not loaded"))?;
      store.save_cart(&cart).await?;
      Ok::<_, MarketError>(PipelineControl::Continue)
    }
  })?;

  Ok(p)
}

fn build_clear_cart_pipeline(store: &Arc<dyn MarketStore>) -> MarketResult<Pipeline<ClearCartCtxData, MarketError>> {
  let mut p = Pipeline::<ClearCartCtxData, MarketError>::new(
    "clear_cart",
    &[("load_cart", false), ("empty_items", false), ("persist_cart", false)],
  )?;

  let load_store = Arc::clone(store);
  p.on("load_cart", move |ctx: ContextData<ClearCartCtxData>| {
    let store = Arc::clone(&load_store);
    async move {
      let buyer_id = ctx.read().buyer_id;
      let cart = store
        .find_cart(buyer_id)
        .await?
        .ok_or_else(|| MarketError::not_found("Cart not found"))?;
      ctx.write().cart = Some(cart);
      Ok::<_, MarketError>(PipelineControl::Continue)
    }
  })?;

  p.on("empty_items", |ctx: ContextData<ClearCartCtxData>| async move {
    let mut guard = ctx.write();
    let cart = guard
      .cart
      .as_mut()
      .ok_or_else(|| MarketError::unexpected("Cart was not loaded"))?;
    cart.clear();
    Ok::<_, MarketError>(PipelineControl::Continue)
  })?;

  let persist_store = Arc::clone(store);
  p.on("persist_cart", move |ctx: ContextData<ClearCartCtxData>| {
    let store = Arc::clone(&persist_store);
    async move {
      let cart = ctx.read().cart.clone();
      let cart = cart.ok_or_else(|| MarketError::unexpected("Cart was not loaded"))?;
      store.save_cart(&cart).await?;
      Ok::<_, MarketError>(PipelineControl::Continue)
    }
  })?;

  Ok(p)
}

fn build_view_cart_pipeline(
  store: &Arc<dyn MarketStore>,
  catalog: &Arc<dyn Catalog>,
) -> MarketResult<Pipeline<ViewCartCtxData, MarketError>> {
  let mut p = Pipeline::<ViewCartCtxData, MarketError>::new(
    "view_cart",
    &[("load_cart", false), ("join_catalog", false)],
  )?;

  let store = Arc::clone(store);
  p.on("load_cart", move |ctx: ContextData<ViewCartCtxData>| {
    let store = Arc::clone(&store);
    async move {
      let buyer_id = ctx.read().buyer_id;
      let cart = store.get_or_create_cart(buyer_id).await?;
      ctx.write().cart = Some(cart);
      Ok::<_, MarketError>(PipelineControl::Continue)
    }
  })?;

  let catalog = Arc::clone(catalog);
  p.on("join_catalog", move |ctx: ContextData<ViewCartCtxData>| {
    let catalog = Arc::clone(&catalog);
    async move {
      let cart = ctx.read().cart.clone();
      let cart = cart.ok_or_else(|| MarketError::unexpected("Cart was not loaded"))?;

      let mut items = Vec::with_capacity(cart.items().len());
      for line in cart.items() {
        match catalog.get_product(line.product_id).await? {
          Some(product) => items.push(CartViewItem {
            id: line.id,
            product,
            quantity: line.quantity,
          }),
          None => warn!(product_id = %line.product_id, cart_id = %cart.id, "Cart line refers to a product missing from the catalog; omitted from view."),
        }
      }

      ctx.write().view = Some(CartView {
        id: cart.id,
        buyer_id: cart.buyer_id,
        items,
      });
      Ok::<_, MarketError>(PipelineControl::Continue)
    }
  })?;

  Ok(p)
}
