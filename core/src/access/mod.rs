// bazaar/src/access/mod.rs

//! Access control: turning a bearer credential into a [`Principal`].
//!
//! The engines never look at credentials themselves; the HTTP layer resolves
//! the caller through [`AccessControl`] and passes plain account ids down.
//! Accounts and their sessions live behind [`AccountStore`], in memory or in
//! PostgreSQL next to carts and orders.

pub mod directory;
pub mod memory;
pub mod postgres;

pub use directory::{AccountDirectory, IssuedToken, NewAccount};
pub use memory::MemoryAccountStore;
pub use postgres::PgAccountStore;

use crate::error::MarketResult;
use crate::models::{Account, Principal};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait AccessControl: Send + Sync {
  /// Resolves a bearer token. Unknown or expired tokens are `Unauthorized`.
  async fn verify_token(&self, token: &str) -> MarketResult<Principal>;
}

/// A stored bearer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
  pub principal: Principal,
  pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
  /// Looks an account up by its normalized email.
  async fn find_account_by_email(&self, email: &str) -> MarketResult<Option<Account>>;

  /// Stores a new account. `InvalidArgument("User already exists")` when the
  /// email is taken.
  async fn insert_account(&self, account: &Account) -> MarketResult<()>;

  async fn insert_session(&self, token: &str, session: &Session) -> MarketResult<()>;

  async fn find_session(&self, token: &str) -> MarketResult<Option<Session>>;

  /// Deletes sessions that expired at or before `now`. Returns how many went.
  async fn purge_sessions(&self, now: DateTime<Utc>) -> MarketResult<u64>;
}
