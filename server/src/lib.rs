// bazaar/server/src/lib.rs

//! HTTP surface of the Bazaar marketplace: configuration, shared state, error
//! mapping and the actix-web routes over the `bazaar` engines.

pub mod config;
pub mod errors;
pub mod seed;
pub mod state;
pub mod web;

pub use config::{AppConfig, LogFormat};
pub use errors::AppError;
pub use state::{AppState, Backend};
