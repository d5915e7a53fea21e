// bazaar/server/src/web/mod.rs

pub mod envelope;
pub mod extractors;
pub mod handlers;
pub mod routes;

pub use routes::configure_app_routes;
