// bazaar/src/access/memory.rs

use crate::access::{AccountStore, Session};
use crate::error::{MarketError, MarketResult};
use crate::models::Account;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Default)]
struct AccountState {
  accounts: HashMap<Uuid, Account>,
  // normalized email -> account id
  emails: HashMap<String, Uuid>,
  sessions: HashMap<String, Session>,
}

/// Accounts and sessions held in process memory. Everything is lost on restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccountStore {
  state: Arc<RwLock<AccountState>>,
}

impl MemoryAccountStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
  async fn find_account_by_email(&self, email: &str) -> MarketResult<Option<Account>> {
    let state = self.state.read();
    Ok(state.emails.get(email).and_then(|id| state.accounts.get(id)).cloned())
  }

  async fn insert_account(&self, account: &Account) -> MarketResult<()> {
    let mut state = self.state.write();
    if state.emails.contains_key(&account.email) {
      return Err(MarketError::invalid_argument("User already exists"));
    }
    state.emails.insert(account.email.clone(), account.id);
    state.accounts.insert(account.id, account.clone());
    Ok(())
  }

  async fn insert_session(&self, token: &str, session: &Session) -> MarketResult<()> {
    self.state.write().sessions.insert(token.to_string(), *session);
    Ok(())
  }

  async fn find_session(&self, token: &str) -> MarketResult<Option<Session>> {
    Ok(self.state.read().sessions.get(token).copied())
  }

  async fn purge_sessions(&self, now: DateTime<Utc>) -> MarketResult<u64> {
    let mut state = self.state.write();
    let before = state.sessions.len();
    state.sessions.retain(|_, s| s.expires_at > now);
    Ok((before - state.sessions.len()) as u64)
  }
}
