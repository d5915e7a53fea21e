// tests/common/mod.rs
#![allow(dead_code)] // Not every test binary uses every fixture.

use bazaar::{CartEngine, Catalog, MarketStore, MemoryCatalog, MemoryStore, OrderEngine, Product, StatusPolicy};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

// --- Tracing setup (once per test binary) ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Fixtures ---

/// Both engines wired to the same in-memory store and catalog.
pub struct Market {
  pub store: MemoryStore,
  pub catalog: MemoryCatalog,
  pub carts: CartEngine,
  pub orders: OrderEngine,
}

pub fn market() -> Market {
  market_with_policy(StatusPolicy::default())
}

pub fn market_with_policy(policy: StatusPolicy) -> Market {
  setup_tracing();
  let store = MemoryStore::new();
  let catalog = MemoryCatalog::new();
  let shared_store: Arc<dyn MarketStore> = Arc::new(store.clone());
  let shared_catalog: Arc<dyn Catalog> = Arc::new(catalog.clone());

  let carts = match CartEngine::new(Arc::clone(&shared_store), Arc::clone(&shared_catalog)) {
    Ok(engine) => engine,
    Err(e) => panic!("cart engine setup failed: {}", e),
  };
  let orders = match OrderEngine::new(shared_store, shared_catalog, policy) {
    Ok(engine) => engine,
    Err(e) => panic!("order engine setup failed: {}", e),
  };

  Market {
    store,
    catalog,
    carts,
    orders,
  }
}

pub fn product(name: &str, price_cents: i64) -> Product {
  Product {
    id: Uuid::new_v4(),
    name: name.to_string(),
    description: format!("{} for testing", name),
    price_cents,
    seller_id: Uuid::new_v4(),
    image_url: String::new(),
    stock_quantity: 10,
    units: "pcs".to_string(),
  }
}

impl Market {
  /// Adds a product to the catalog and returns its id.
  pub fn stock(&self, name: &str, price_cents: i64) -> Uuid {
    let p = product(name, price_cents);
    let id = p.id;
    self.catalog.upsert_product(p);
    id
  }
}
