// bazaar/server/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use anyhow::Context;
use bazaar_server::config::{AppConfig, LogFormat};
use bazaar_server::state::{AppState, Backend};
use bazaar_server::{seed, web};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Pretty => builder.init(),
  }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  let app_config = AppConfig::from_env()?;
  init_tracing(app_config.log_format);
  tracing::info!(
    backend = app_config.backend_name(),
    status_policy = ?app_config.status_policy,
    "Application configuration loaded."
  );
  tracing::info!("Starting Bazaar marketplace server...");

  let backend = Backend::from_config(&app_config).await?;
  let app_state = AppState::new(&app_config, &backend).context("Failed to build the engines")?;

  if app_config.seed_db {
    seed::seed_market(&app_state, &backend).await?;
  }

  let server_address = app_config.bind_address();
  tracing::info!("Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("Failed to bind {}", server_address))?
  .run()
  .await
  .context("Server terminated with an error")
}
