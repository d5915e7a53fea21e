// bazaar/src/models/mod.rs

//! Records owned by the marketplace core and its collaborators.
//!
//! Carts and orders deliberately use different shapes: a cart line points at a
//! catalog product and never stores a price, an order line owns the price it
//! was sold at.

pub mod account;
pub mod cart;
pub mod order;
pub mod product;

pub use account::{Account, Principal, Role};
pub use cart::{Cart, CartLineItem, CartView, CartViewItem};
pub use order::{Order, OrderLineItem, OrderStatus, StatusPolicy};
pub use product::Product;
