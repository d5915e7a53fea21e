// bazaar/src/access/directory.rs

//! Account directory: Argon2 password hashes and opaque bearer tokens over an
//! [`AccountStore`].

use crate::access::{AccessControl, AccountStore, MemoryAccountStore, Session};
use crate::error::{MarketError, MarketResult};
use crate::models::{Account, Principal, Role};
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand_core::RngCore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Signup input for [`AccountDirectory::create_account`].
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub email: String,
  pub password: String,
  pub name: String,
  pub role: Role,
}

/// A freshly issued bearer token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
  pub token: String,
  pub expires_at: DateTime<Utc>,
  pub account: Account,
}

#[derive(Clone)]
pub struct AccountDirectory {
  accounts: Arc<dyn AccountStore>,
  token_ttl: Duration,
}

impl std::fmt::Debug for AccountDirectory {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AccountDirectory")
      .field("token_ttl", &self.token_ttl)
      .finish_non_exhaustive()
  }
}

impl AccountDirectory {
  pub fn new(accounts: Arc<dyn AccountStore>, token_ttl: Duration) -> Self {
    Self { accounts, token_ttl }
  }

  pub fn in_memory(token_ttl: Duration) -> Self {
    Self::new(Arc::new(MemoryAccountStore::new()), token_ttl)
  }

  /// Registers an account. Emails are unique, compared case-insensitively.
  #[instrument(name = "AccountDirectory::create_account", skip(self, new_account), fields(role = %new_account.role), err(Display))]
  pub async fn create_account(&self, new_account: NewAccount) -> MarketResult<Account> {
    let email = normalize_email(&new_account.email)?;
    if new_account.name.trim().is_empty() {
      return Err(MarketError::invalid_argument("Name is required"));
    }
    if self.accounts.find_account_by_email(&email).await?.is_some() {
      return Err(MarketError::invalid_argument("User already exists"));
    }

    let account = Account {
      id: Uuid::new_v4(),
      email,
      name: new_account.name.trim().to_string(),
      password_hash: hash_password(&new_account.password)?,
      role: new_account.role,
      created_at: Utc::now(),
    };
    // The store re-checks the email, so a concurrent signup still loses.
    self.accounts.insert_account(&account).await?;
    info!(account_id = %account.id, "Account created.");
    Ok(account)
  }

  /// The account registered under `email`, if any.
  pub async fn find_by_email(&self, email: &str) -> MarketResult<Option<Account>> {
    match normalize_email(email) {
      Ok(email) => self.accounts.find_account_by_email(&email).await,
      Err(_) => Ok(None),
    }
  }

  /// Checks an email/password pair. Both an unknown email and a wrong password
  /// yield the same `Unauthorized("Invalid credentials")`.
  #[instrument(name = "AccountDirectory::verify_credentials", skip(self, email, password), err(Display))]
  pub async fn verify_credentials(&self, email: &str, password: &str) -> MarketResult<Account> {
    let invalid = || MarketError::unauthorized("Invalid credentials");
    let account = self.find_by_email(email).await?.ok_or_else(invalid)?;

    if verify_password(&account.password_hash, password)? {
      Ok(account)
    } else {
      warn!(account_id = %account.id, "Password mismatch.");
      Err(invalid())
    }
  }

  pub async fn issue_token(&self, account: &Account) -> MarketResult<IssuedToken> {
    let mut raw = [0u8; 32];
    OsRng.fill_bytes(&mut raw);
    let token: String = raw.iter().map(|b| format!("{:02x}", b)).collect();
    let now = Utc::now();
    let expires_at = now + self.token_ttl;

    let purged = self.accounts.purge_sessions(now).await?;
    if purged > 0 {
      debug!(purged, "Expired sessions removed.");
    }
    self
      .accounts
      .insert_session(
        &token,
        &Session {
          principal: Principal {
            account_id: account.id,
            role: account.role,
          },
          expires_at,
        },
      )
      .await?;
    debug!(account_id = %account.id, %expires_at, "Token issued.");

    Ok(IssuedToken {
      token,
      expires_at,
      account: account.clone(),
    })
  }
}

#[async_trait]
impl AccessControl for AccountDirectory {
  async fn verify_token(&self, token: &str) -> MarketResult<Principal> {
    let session = self
      .accounts
      .find_session(token)
      .await?
      .ok_or_else(|| MarketError::unauthorized("Unauthorized"))?;
    if session.expires_at <= Utc::now() {
      debug!(account_id = %session.principal.account_id, "Expired token presented.");
      return Err(MarketError::unauthorized("Unauthorized"));
    }
    Ok(session.principal)
  }
}

fn normalize_email(raw: &str) -> MarketResult<String> {
  let email = raw.trim().to_lowercase();
  match email.split_once('@') {
    Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') => Ok(email),
    _ => Err(MarketError::invalid_argument("A valid email is required")),
  }
}

fn hash_password(password: &str) -> MarketResult<String> {
  if password.is_empty() {
    return Err(MarketError::invalid_argument("Password cannot be empty"));
  }

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|argon_err| {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      MarketError::unexpected("Password hashing failed")
    })
}

fn verify_password(stored_hash: &str, provided: &str) -> MarketResult<bool> {
  if provided.is_empty() {
    return Ok(false);
  }
  let parsed = PasswordHash::new(stored_hash).map_err(|parse_err| {
    error!(error = %parse_err, "Stored password hash is malformed.");
    MarketError::unexpected("Stored credentials are unreadable")
  })?;

  match Argon2::default().verify_password(provided.as_bytes(), &parsed) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => Ok(false),
    Err(other) => {
      error!(error = %other, "Argon2 password verification failed.");
      Err(MarketError::unexpected("Password verification failed"))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn directory() -> AccountDirectory {
    AccountDirectory::in_memory(Duration::hours(1))
  }

  fn buyer(email: &str) -> NewAccount {
    NewAccount {
      email: email.to_string(),
      password: "correct horse".to_string(),
      name: "Ada".to_string(),
      role: Role::Buyer,
    }
  }

  #[tokio::test]
  async fn duplicate_emails_are_rejected_case_insensitively() {
    let dir = directory();
    assert!(dir.create_account(buyer("ada@example.com")).await.is_ok());
    assert!(matches!(
      dir.create_account(buyer("ADA@example.com ")).await,
      Err(MarketError::InvalidArgument(m)) if m == "User already exists"
    ));
  }

  #[tokio::test]
  async fn credentials_are_checked_against_the_hash() {
    let dir = directory();
    let created = dir.create_account(buyer("ada@example.com")).await.ok();
    assert!(created.as_ref().is_some_and(|a| a.password_hash.starts_with("$argon2")));

    assert!(dir.verify_credentials("Ada@Example.com", "correct horse").await.is_ok());
    assert!(matches!(
      dir.verify_credentials("ada@example.com", "wrong").await,
      Err(MarketError::Unauthorized(m)) if m == "Invalid credentials"
    ));
    assert!(matches!(
      dir.verify_credentials("nobody@example.com", "correct horse").await,
      Err(MarketError::Unauthorized(_))
    ));
  }

  #[tokio::test]
  async fn issued_tokens_resolve_until_they_expire() {
    let dir = directory();
    let account = match dir.create_account(buyer("ada@example.com")).await {
      Ok(a) => a,
      Err(e) => panic!("signup failed: {}", e),
    };
    let issued = match dir.issue_token(&account).await {
      Ok(t) => t,
      Err(e) => panic!("token failed: {}", e),
    };
    let principal = dir.verify_token(&issued.token).await.ok();
    assert_eq!(principal.map(|p| p.account_id), Some(account.id));
    assert!(dir.verify_token("not-a-token").await.is_err());

    let expired = AccountDirectory::in_memory(Duration::zero());
    let account = match expired.create_account(buyer("bob@example.com")).await {
      Ok(a) => a,
      Err(e) => panic!("signup failed: {}", e),
    };
    let issued = match expired.issue_token(&account).await {
      Ok(t) => t,
      Err(e) => panic!("token failed: {}", e),
    };
    assert!(matches!(expired.verify_token(&issued.token).await, Err(MarketError::Unauthorized(_))));
  }

  #[tokio::test]
  async fn a_directory_over_the_same_store_sees_earlier_accounts_and_sessions() {
    let store = Arc::new(MemoryAccountStore::new());
    let first = AccountDirectory::new(store.clone(), Duration::hours(1));
    let account = match first.create_account(buyer("ada@example.com")).await {
      Ok(a) => a,
      Err(e) => panic!("signup failed: {}", e),
    };
    let issued = match first.issue_token(&account).await {
      Ok(t) => t,
      Err(e) => panic!("token failed: {}", e),
    };

    let restarted = AccountDirectory::new(store, Duration::hours(1));
    assert!(restarted.verify_credentials("ada@example.com", "correct horse").await.is_ok());
    assert_eq!(restarted.verify_token(&issued.token).await.ok().map(|p| p.account_id), Some(account.id));
    assert_eq!(
      restarted.find_by_email("ADA@example.com").await.ok().flatten().map(|a| a.id),
      Some(account.id)
    );
  }

  #[tokio::test]
  async fn malformed_emails_are_invalid() {
    let dir = directory();
    assert!(matches!(
      dir.create_account(buyer("not-an-email")).await,
      Err(MarketError::InvalidArgument(_))
    ));
    assert!(matches!(dir.find_by_email("not-an-email").await, Ok(None)));
  }
}
