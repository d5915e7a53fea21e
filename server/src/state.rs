// bazaar/server/src/state.rs

use crate::config::AppConfig;
use anyhow::Context;
use bazaar::{
  AccessControl, AccountDirectory, AccountStore, CartEngine, Catalog, MarketError, MarketResult, MarketStore,
  MemoryAccountStore, MemoryCatalog, MemoryStore, OrderEngine, PgAccountStore, PgCatalog, PgStore, Product,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;

/// The storage backend selected at startup.
#[derive(Debug, Clone)]
pub enum Backend {
  Memory {
    store: MemoryStore,
    catalog: MemoryCatalog,
    accounts: MemoryAccountStore,
  },
  Postgres {
    store: PgStore,
    catalog: PgCatalog,
    accounts: PgAccountStore,
  },
}

impl Backend {
  pub fn in_memory() -> Self {
    Backend::Memory {
      store: MemoryStore::new(),
      catalog: MemoryCatalog::new(),
      accounts: MemoryAccountStore::new(),
    }
  }

  /// Connects to PostgreSQL when `DATABASE_URL` is set, otherwise stays in memory.
  pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
    let Some(url) = config.database_url.as_deref() else {
      info!("No DATABASE_URL set; using the in-memory backend.");
      return Ok(Self::in_memory());
    };

    let pool = PgPoolOptions::new()
      .max_connections(config.database_max_connections)
      .connect(url)
      .await
      .context("Failed to connect to the database")?;
    info!("Successfully connected to the database.");

    let store = PgStore::new(pool.clone());
    store.migrate().await.context("Failed to apply the database schema")?;
    Ok(Backend::Postgres {
      store,
      catalog: PgCatalog::new(pool.clone()),
      accounts: PgAccountStore::new(pool),
    })
  }

  pub fn store(&self) -> Arc<dyn MarketStore> {
    match self {
      Backend::Memory { store, .. } => Arc::new(store.clone()),
      Backend::Postgres { store, .. } => Arc::new(store.clone()),
    }
  }

  pub fn catalog(&self) -> Arc<dyn Catalog> {
    match self {
      Backend::Memory { catalog, .. } => Arc::new(catalog.clone()),
      Backend::Postgres { catalog, .. } => Arc::new(catalog.clone()),
    }
  }

  pub fn accounts(&self) -> Arc<dyn AccountStore> {
    match self {
      Backend::Memory { accounts, .. } => Arc::new(accounts.clone()),
      Backend::Postgres { accounts, .. } => Arc::new(accounts.clone()),
    }
  }

  pub async fn upsert_product(&self, product: Product) -> MarketResult<()> {
    match self {
      Backend::Memory { catalog, .. } => {
        catalog.upsert_product(product);
        Ok(())
      }
      Backend::Postgres { catalog, .. } => catalog.upsert_product(&product).await,
    }
  }
}

#[derive(Clone)]
pub struct AppState {
  pub cart_engine: Arc<CartEngine>,
  pub order_engine: Arc<OrderEngine>,
  pub catalog: Arc<dyn Catalog>,
  pub directory: Arc<AccountDirectory>,
  pub access: Arc<dyn AccessControl>,
}

impl AppState {
  pub fn new(config: &AppConfig, backend: &Backend) -> MarketResult<Self> {
    let store = backend.store();
    let catalog = backend.catalog();
    let token_ttl = chrono::Duration::try_hours(config.token_ttl_hours)
      .ok_or_else(|| MarketError::invalid_argument("Token lifetime is out of range"))?;
    let directory = Arc::new(AccountDirectory::new(backend.accounts(), token_ttl));

    Ok(Self {
      cart_engine: Arc::new(CartEngine::new(Arc::clone(&store), Arc::clone(&catalog))?),
      order_engine: Arc::new(OrderEngine::new(store, Arc::clone(&catalog), config.status_policy)?),
      catalog,
      access: directory.clone(),
      directory,
    })
  }
}
