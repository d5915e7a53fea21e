// src/lib.rs

//! Bazaar: the cart-to-order transaction engine of a small marketplace.
//!
//! The crate owns the part of the marketplace with real invariants:
//!  - Carts that aggregate line items per product and never keep zero-quantity lines.
//!  - Orders that freeze the catalog price of every line at the moment they are placed.
//!  - An order lifecycle (`pending -> completed | cancelled`) with owner-scoped cancellation.
//!  - A single unit of work that creates the order and empties the source cart.
//!
//! Engine mutations (and the cart view) run as named-step [`Pipeline`]s over a
//! shared [`ContextData`]. Catalog lookups, credential checks and persistence sit behind
//! traits ([`Catalog`], [`AccessControl`], [`AccountStore`], [`MarketStore`]) with in-memory and
//! PostgreSQL implementations.

pub mod access;
pub mod catalog;
pub mod error;
pub mod flow;
pub mod models;
pub mod pipelines;
pub mod store;

// --- Re-exports for the Public API ---

pub use crate::flow::{ContextData, Handler, Pipeline, PipelineControl, PipelineResult, StepDef};

pub use crate::error::{FlowError, MarketError, MarketResult};

pub use crate::models::{
  Account, Cart, CartLineItem, CartView, CartViewItem, Order, OrderLineItem, OrderStatus, Principal, Product, Role,
};

pub use crate::access::{
  AccessControl, AccountDirectory, AccountStore, IssuedToken, MemoryAccountStore, NewAccount, PgAccountStore, Session,
};
pub use crate::catalog::{Catalog, MemoryCatalog, PgCatalog, ProductFilter};
pub use crate::store::{CartStore, MarketStore, MemoryStore, OrderStore, PgStore, UnitOfWork};

pub use crate::pipelines::cart_pipeline::CartEngine;
pub use crate::pipelines::order_pipeline::{OrderEngine, StatusPolicy};
