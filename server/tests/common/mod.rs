// tests/common/mod.rs
#![allow(dead_code)]

use bazaar_server::config::AppConfig;
use bazaar_server::seed::{seed_market, SeedSummary};
use bazaar_server::state::{AppState, Backend};
use once_cell::sync::Lazy;
use tracing::Level;

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

pub struct TestMarket {
  pub state: AppState,
  pub backend: Backend,
  pub seed: SeedSummary,
}

/// In-memory state with the demo accounts and products loaded.
pub async fn seeded_market(config: AppConfig) -> TestMarket {
  setup_tracing();
  let backend = Backend::in_memory();
  let state = AppState::new(&config, &backend).expect("state");
  let seed = seed_market(&state, &backend).await.expect("seed");
  TestMarket { state, backend, seed }
}

/// Initialises the full route table over `state`.
macro_rules! test_app {
  ($state:expr) => {
    actix_web::test::init_service(
      actix_web::App::new()
        .app_data(actix_web::web::Data::new($state.clone()))
        .configure(bazaar_server::web::configure_app_routes),
    )
    .await
  };
}

/// Logs a seeded account in and evaluates to its bearer token.
macro_rules! login {
  ($app:expr, $email:expr) => {{
    let req = actix_web::test::TestRequest::post()
      .uri("/auth/login")
      .set_json(serde_json::json!({ "email": $email, "password": bazaar_server::seed::SEED_PASSWORD }))
      .to_request();
    let body: serde_json::Value = actix_web::test::call_and_read_body_json(&$app, req).await;
    body["data"]["token"].as_str().expect("token in login response").to_string()
  }};
}

pub fn bearer(token: &str) -> (&'static str, String) {
  ("Authorization", format!("Bearer {}", token))
}
