// bazaar/server/src/seed.rs

//! Demo data for `SEED_DB=true`: one account per role and a few products.

use crate::state::{AppState, Backend};
use anyhow::Context;
use bazaar::{Account, NewAccount, Product, ProductFilter, Role};
use tracing::{debug, info};
use uuid::Uuid;

pub const SEED_PASSWORD: &str = "bazaar-demo";

#[derive(Debug)]
pub struct SeedSummary {
  pub seller: Account,
  pub admin: Account,
  pub buyer: Account,
  pub products: Vec<Product>,
}

const PRODUCTS: &[(&str, &str, i64, i64, &str)] = &[
  ("Basmati Rice", "Aged long-grain rice", 1299, 40, "kg"),
  ("Olive Oil", "Cold-pressed extra virgin olive oil", 1850, 25, "l"),
  ("Green Tea", "Loose-leaf sencha", 799, 60, "g"),
  ("Honey", "Raw wildflower honey", 1100, 30, "pcs"),
];

/// Seeds the demo market. Running it again against the same storage reuses
/// the accounts (matched by email) and products (matched by seller and name).
pub async fn seed_market(state: &AppState, backend: &Backend) -> anyhow::Result<SeedSummary> {
  let seller = ensure_account(state, "seller@bazaar.test", "Demo Seller", Role::Seller).await?;
  let admin = ensure_account(state, "admin@bazaar.test", "Demo Admin", Role::Admin).await?;
  let buyer = ensure_account(state, "buyer@bazaar.test", "Demo Buyer", Role::Buyer).await?;

  let existing = state
    .catalog
    .list_products(&ProductFilter {
      seller_id: Some(seller.id),
    })
    .await
    .context("Failed to read the seeded catalog")?;

  let mut products = Vec::with_capacity(PRODUCTS.len());
  for (name, description, price_cents, stock_quantity, units) in PRODUCTS {
    let id = existing
      .iter()
      .find(|p| p.name == *name)
      .map_or_else(Uuid::new_v4, |p| p.id);
    let product = Product {
      id,
      name: name.to_string(),
      description: description.to_string(),
      price_cents: *price_cents,
      seller_id: seller.id,
      image_url: String::new(),
      stock_quantity: *stock_quantity,
      units: units.to_string(),
    };
    backend
      .upsert_product(product.clone())
      .await
      .with_context(|| format!("Failed to seed product '{}'", name))?;
    products.push(product);
  }

  for acct in [&seller, &admin, &buyer] {
    info!(email = %acct.email, role = %acct.role, password = SEED_PASSWORD, "Seeded account.");
  }
  info!(count = products.len(), "Seeded products.");

  Ok(SeedSummary {
    seller,
    admin,
    buyer,
    products,
  })
}

async fn ensure_account(state: &AppState, email: &str, name: &str, role: Role) -> anyhow::Result<Account> {
  if let Some(existing) = state.directory.find_by_email(email).await? {
    debug!(email, "Seed account already present.");
    return Ok(existing);
  }
  let account = state
    .directory
    .create_account(NewAccount {
      email: email.to_string(),
      password: SEED_PASSWORD.to_string(),
      name: name.to_string(),
      role,
    })
    .await
    .with_context(|| format!("Failed to seed the {} account", role))?;
  Ok(account)
}
