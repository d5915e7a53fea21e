// bazaar/src/access/postgres.rs

use crate::access::{AccountStore, Session};
use crate::error::{MarketError, MarketResult};
use crate::models::{Account, Principal, Role};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct AccountRow {
  id: Uuid,
  email: String,
  name: String,
  password_hash: String,
  role: String,
  created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
  type Error = MarketError;

  fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
    Ok(Account {
      role: parse_role(&row.role, row.id)?,
      id: row.id,
      email: row.email,
      name: row.name,
      password_hash: row.password_hash,
      created_at: row.created_at,
    })
  }
}

#[derive(Debug, FromRow)]
struct SessionRow {
  account_id: Uuid,
  role: String,
  expires_at: DateTime<Utc>,
}

/// Accounts and sessions in the `accounts` and `sessions` tables (see
/// `store/schema.sql`). Sessions survive restarts along with the accounts.
#[derive(Debug, Clone)]
pub struct PgAccountStore {
  pool: PgPool,
}

impl PgAccountStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl AccountStore for PgAccountStore {
  async fn find_account_by_email(&self, email: &str) -> MarketResult<Option<Account>> {
    let row = sqlx::query_as::<_, AccountRow>(
      "SELECT id, email, name, password_hash, role, created_at FROM accounts WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(&self.pool)
    .await?;
    row.map(Account::try_from).transpose()
  }

  #[instrument(name = "PgAccountStore::insert_account", skip(self, account), fields(account_id = %account.id), err(Display))]
  async fn insert_account(&self, account: &Account) -> MarketResult<()> {
    sqlx::query(
      r#"
      INSERT INTO accounts (id, email, name, password_hash, role, created_at)
      VALUES ($1, $2, $3, $4, $5, $6)
      "#,
    )
    .bind(account.id)
    .bind(&account.email)
    .bind(&account.name)
    .bind(&account.password_hash)
    .bind(account.role.as_str())
    .bind(account.created_at)
    .execute(&self.pool)
    .await
    .map_err(|err| match &err {
      sqlx::Error::Database(db_err) if db_err.is_unique_violation() => MarketError::invalid_argument("User already exists"),
      _ => MarketError::from(err),
    })?;
    Ok(())
  }

  async fn insert_session(&self, token: &str, session: &Session) -> MarketResult<()> {
    sqlx::query("INSERT INTO sessions (token, account_id, expires_at) VALUES ($1, $2, $3)")
      .bind(token)
      .bind(session.principal.account_id)
      .bind(session.expires_at)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn find_session(&self, token: &str) -> MarketResult<Option<Session>> {
    let row = sqlx::query_as::<_, SessionRow>(
      r#"
      SELECT s.account_id, a.role, s.expires_at
      FROM sessions s
      JOIN accounts a ON a.id = s.account_id
      WHERE s.token = $1
      "#,
    )
    .bind(token)
    .fetch_optional(&self.pool)
    .await?;

    row
      .map(|row| {
        Ok(Session {
          principal: Principal {
            account_id: row.account_id,
            role: parse_role(&row.role, row.account_id)?,
          },
          expires_at: row.expires_at,
        })
      })
      .transpose()
  }

  async fn purge_sessions(&self, now: DateTime<Utc>) -> MarketResult<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
      .bind(now)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected())
  }
}

fn parse_role(raw: &str, account_id: Uuid) -> MarketResult<Role> {
  raw
    .parse::<Role>()
    .map_err(|_| MarketError::unexpected(format!("Stored account {} has unknown role '{}'", account_id, raw)))
}
