// tests/postgres_store_tests.rs
//
// Runs against the database in DATABASE_URL; every test returns early when it
// is unset. Each test works on fresh buyer ids, so no truncation is needed.
//
//   DATABASE_URL=postgres://localhost/bazaar_test cargo test --test postgres_store_tests
mod common;

use bazaar::{
  AccountStore, Cart, CartEngine, CartStore, Catalog, MarketError, MarketStore, Order, OrderEngine, OrderLineItem,
  OrderStatus, OrderStore, PgAccountStore, PgCatalog, PgStore, Principal, Role, Session, StatusPolicy, UnitOfWork,
};
use chrono::{Duration, Utc};
use common::*;
use serial_test::serial;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

async fn pg_pool() -> Option<PgPool> {
  setup_tracing();
  let Ok(url) = std::env::var("DATABASE_URL") else {
    eprintln!("DATABASE_URL not set; skipping PostgreSQL test.");
    return None;
  };
  let pool = PgPoolOptions::new()
    .max_connections(2)
    .connect(&url)
    .await
    .expect("connect to DATABASE_URL");
  PgStore::new(pool.clone()).migrate().await.expect("apply schema");
  Some(pool)
}

async fn stored_cart(store: &PgStore, buyer: Uuid, lines: &[(Uuid, u32)]) -> Cart {
  let mut cart = store.get_or_create_cart(buyer).await.expect("cart");
  for (product_id, quantity) in lines {
    cart.add(*product_id, *quantity).expect("add line");
  }
  store.save_cart(&cart).await.expect("save cart");
  cart
}

fn priced_order(buyer: Uuid, lines: &[(Uuid, u32, i64)]) -> Order {
  let items = lines
    .iter()
    .map(|(product_id, quantity, price)| OrderLineItem::new(*product_id, *quantity, *price))
    .collect();
  Order::place(buyer, items, Utc::now()).expect("place")
}

#[tokio::test]
#[serial]
async fn commit_stores_the_order_and_empties_the_cart_together() {
  let Some(pool) = pg_pool().await else { return };
  let store = PgStore::new(pool);
  let buyer = Uuid::new_v4();
  let (apple, pear) = (Uuid::new_v4(), Uuid::new_v4());
  let cart = stored_cart(&store, buyer, &[(apple, 2), (pear, 1)]).await;

  let order = priced_order(buyer, &[(apple, 2, 100), (pear, 1, 50)]);
  store.commit_order(&order).await.expect("commit");

  let after = store.find_cart(buyer).await.expect("find cart").expect("cart kept");
  assert_eq!(after.id, cart.id);
  assert!(after.is_empty());
  let stored = store.find_order(order.id()).await.expect("find order").expect("order stored");
  assert_eq!(stored.total_amount_cents(), 250);
  assert_eq!(stored.status(), OrderStatus::Pending);
  assert_eq!(stored.buyer_id(), buyer);
}

#[tokio::test]
#[serial]
async fn a_failed_commit_leaves_the_cart_and_orders_untouched() {
  let Some(pool) = pg_pool().await else { return };
  let store = PgStore::new(pool);
  let buyer = Uuid::new_v4();
  let apple = Uuid::new_v4();

  stored_cart(&store, buyer, &[(apple, 1)]).await;
  let order = priced_order(buyer, &[(apple, 1, 100)]);
  store.commit_order(&order).await.expect("first commit");

  stored_cart(&store, buyer, &[(apple, 3)]).await;
  let again = store.commit_order(&order).await;
  assert!(matches!(again, Err(MarketError::InvalidState(m)) if m == "Record already exists"));

  let cart = store.find_cart(buyer).await.expect("find cart").expect("cart");
  assert_eq!(cart.items().len(), 1);
  assert_eq!(cart.items()[0].quantity, 3);
  assert_eq!(store.list_orders(buyer).await.expect("list").len(), 1);
}

#[tokio::test]
#[serial]
async fn cart_and_order_lines_keep_their_order() {
  let Some(pool) = pg_pool().await else { return };
  let store = PgStore::new(pool);
  let buyer = Uuid::new_v4();
  let products: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();

  let lines: Vec<(Uuid, u32)> = products.iter().rev().map(|id| (*id, 1)).collect();
  let cart = stored_cart(&store, buyer, &lines).await;
  let loaded = store.find_cart(buyer).await.expect("find").expect("cart");
  let loaded_ids: Vec<Uuid> = loaded.items().iter().map(|l| l.product_id).collect();
  let saved_ids: Vec<Uuid> = cart.items().iter().map(|l| l.product_id).collect();
  assert_eq!(loaded_ids, saved_ids);

  let order = priced_order(buyer, &[(products[2], 3, 70), (products[0], 1, 999), (products[3], 2, 5)]);
  store.commit_order(&order).await.expect("commit");
  let stored = store.find_order(order.id()).await.expect("find").expect("order");
  assert_eq!(stored.items(), order.items());
  assert_eq!(stored.total_amount_cents(), 3 * 70 + 999 + 2 * 5);
}

#[tokio::test]
#[serial]
async fn status_writes_only_land_on_the_expected_status() {
  let Some(pool) = pg_pool().await else { return };
  let store = PgStore::new(pool);
  let buyer = Uuid::new_v4();
  let order = priced_order(buyer, &[(Uuid::new_v4(), 1, 100)]);
  store.commit_order(&order).await.expect("commit");

  let mut completed = order.clone();
  completed.advance(OrderStatus::Completed, StatusPolicy::AdminOverride).expect("advance");
  store.update_status(&completed, OrderStatus::Pending).await.expect("complete");

  let mut cancelled = order.clone();
  cancelled.cancel().expect("pending copy");
  let stale = store.update_status(&cancelled, OrderStatus::Pending).await;
  assert!(matches!(stale, Err(MarketError::InvalidState(_))));
  let stored = store.find_order(order.id()).await.expect("find").expect("order");
  assert_eq!(stored.status(), OrderStatus::Completed);

  let unknown = priced_order(buyer, &[(Uuid::new_v4(), 1, 1)]);
  let missing = store.update_status(&unknown, OrderStatus::Pending).await;
  assert!(matches!(missing, Err(MarketError::NotFound(_))));
}

#[tokio::test]
#[serial]
async fn engines_place_orders_against_postgres() {
  let Some(pool) = pg_pool().await else { return };
  let store: Arc<dyn MarketStore> = Arc::new(PgStore::new(pool.clone()));
  let pg_catalog = PgCatalog::new(pool);
  let apple = product("apple", 100);
  pg_catalog.upsert_product(&apple).await.expect("stock apple");
  let catalog: Arc<dyn Catalog> = Arc::new(pg_catalog);

  let carts = CartEngine::new(Arc::clone(&store), Arc::clone(&catalog)).expect("cart engine");
  let orders = OrderEngine::new(store, catalog, StatusPolicy::default()).expect("order engine");
  let buyer = Uuid::new_v4();

  carts.add_item(buyer, apple.id, 2).await.expect("add");
  carts.add_item(buyer, apple.id, 1).await.expect("add again");
  let order = orders.place_order(buyer).await.expect("place");
  assert_eq!(order.total_amount_cents(), 300);
  assert!(carts.view_cart(buyer).await.expect("view").items.is_empty());

  orders.cancel_order(buyer, order.id()).await.expect("cancel");
  let listed = orders.list_orders(buyer).await.expect("list");
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].status(), OrderStatus::Cancelled);
}

#[tokio::test]
#[serial]
async fn accounts_and_sessions_persist() {
  let Some(pool) = pg_pool().await else { return };
  let accounts = PgAccountStore::new(pool);
  let email = format!("{}@bazaar.test", Uuid::new_v4());
  let account = bazaar::Account {
    id: Uuid::new_v4(),
    email: email.clone(),
    name: "Ada".to_string(),
    password_hash: "$argon2id$placeholder".to_string(),
    role: Role::Seller,
    created_at: Utc::now(),
  };
  accounts.insert_account(&account).await.expect("insert");

  let duplicate = bazaar::Account {
    id: Uuid::new_v4(),
    ..account.clone()
  };
  assert!(matches!(
    accounts.insert_account(&duplicate).await,
    Err(MarketError::InvalidArgument(m)) if m == "User already exists"
  ));
  let found = accounts.find_account_by_email(&email).await.expect("find").expect("account");
  assert_eq!(found.id, account.id);
  assert_eq!(found.role, Role::Seller);

  let token = Uuid::new_v4().to_string();
  let session = Session {
    principal: Principal {
      account_id: account.id,
      role: account.role,
    },
    expires_at: Utc::now() - Duration::seconds(1),
  };
  accounts.insert_session(&token, &session).await.expect("session");
  let loaded = accounts.find_session(&token).await.expect("find session").expect("session");
  assert_eq!(loaded.principal, session.principal);

  assert!(accounts.purge_sessions(Utc::now()).await.expect("purge") >= 1);
  assert!(accounts.find_session(&token).await.expect("find session").is_none());
}
