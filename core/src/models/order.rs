// bazaar/src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{MarketError, MarketResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Completed,
  Cancelled,
}

impl OrderStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Completed => "completed",
      OrderStatus::Cancelled => "cancelled",
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = MarketError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "pending" => Ok(OrderStatus::Pending),
      "completed" => Ok(OrderStatus::Completed),
      "cancelled" => Ok(OrderStatus::Cancelled),
      _ => Err(MarketError::invalid_argument("Invalid status")),
    }
  }
}

/// How administrative status changes treat terminal orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPolicy {
  /// Any status may be set from any status.
  #[default]
  AdminOverride,
  /// `completed` and `cancelled` cannot be left. Re-asserting the current
  /// status is accepted as a no-op.
  TerminalLocked,
}

impl FromStr for StatusPolicy {
  type Err = MarketError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "admin_override" => Ok(StatusPolicy::AdminOverride),
      "terminal_locked" => Ok(StatusPolicy::TerminalLocked),
      other => Err(MarketError::invalid_argument(format!("Invalid status policy: {}", other))),
    }
  }
}

/// One line of a placed order, with the unit price frozen at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
  pub id: Uuid,
  pub product_id: Uuid,
  pub quantity: u32,
  /// Integer cents.
  #[serde(rename = "unitPriceAtOrderTime")]
  pub unit_price_cents: i64,
}

impl OrderLineItem {
  pub fn new(product_id: Uuid, quantity: u32, unit_price_cents: i64) -> Self {
    Self {
      id: Uuid::new_v4(),
      product_id,
      quantity,
      unit_price_cents,
    }
  }

  /// `quantity x unit price`, or `None` on overflow.
  pub fn line_total_cents(&self) -> Option<i64> {
    self.unit_price_cents.checked_mul(i64::from(self.quantity))
  }
}

/// An immutable, priced order.
///
/// `items` is never empty and `total_amount_cents` is always the sum of the
/// line totals; both are established by [`Order::place`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  id: Uuid,
  buyer_id: Uuid,
  items: Vec<OrderLineItem>,
  // Integer cents on the wire too.
  #[serde(rename = "totalAmount")]
  total_amount_cents: i64,
  status: OrderStatus,
  created_at: DateTime<Utc>,
}

impl Order {
  /// Creates a `pending` order from priced lines.
  pub fn place(buyer_id: Uuid, items: Vec<OrderLineItem>, created_at: DateTime<Utc>) -> MarketResult<Self> {
    if items.is_empty() {
      return Err(MarketError::invalid_state("Your cart is empty."));
    }
    if let Some(bad) = items.iter().find(|l| l.quantity == 0 || l.unit_price_cents < 0) {
      return Err(MarketError::unexpected(format!(
        "Order line for product {} is not sellable",
        bad.product_id
      )));
    }
    let total_amount_cents = sum_line_totals(&items)?;

    Ok(Self {
      id: Uuid::new_v4(),
      buyer_id,
      items,
      total_amount_cents,
      status: OrderStatus::Pending,
      created_at,
    })
  }

  /// Rebuilds an order read back from storage, re-checking its invariants.
  pub(crate) fn from_parts(
    id: Uuid,
    buyer_id: Uuid,
    items: Vec<OrderLineItem>,
    total_amount_cents: i64,
    status: OrderStatus,
    created_at: DateTime<Utc>,
  ) -> MarketResult<Self> {
    if items.is_empty() {
      return Err(MarketError::unexpected(format!("Stored order {} has no lines", id)));
    }
    if sum_line_totals(&items)? != total_amount_cents {
      return Err(MarketError::unexpected(format!("Stored order {} has an inconsistent total", id)));
    }
    Ok(Self {
      id,
      buyer_id,
      items,
      total_amount_cents,
      status,
      created_at,
    })
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn buyer_id(&self) -> Uuid {
    self.buyer_id
  }

  pub fn items(&self) -> &[OrderLineItem] {
    &self.items
  }

  pub fn total_amount_cents(&self) -> i64 {
    self.total_amount_cents
  }

  pub fn status(&self) -> OrderStatus {
    self.status
  }

  pub fn created_at(&self) -> DateTime<Utc> {
    self.created_at
  }

  /// Buyer-initiated cancellation. Only a pending order can be cancelled.
  pub fn cancel(&mut self) -> MarketResult<()> {
    if self.status != OrderStatus::Pending {
      return Err(MarketError::invalid_state("Only pending orders can be cancelled"));
    }
    self.status = OrderStatus::Cancelled;
    Ok(())
  }

  /// Administrative status change under `policy`. Returns whether the status changed.
  pub fn advance(&mut self, next: OrderStatus, policy: StatusPolicy) -> MarketResult<bool> {
    if self.status == next {
      return Ok(false);
    }
    if policy == StatusPolicy::TerminalLocked && self.status.is_terminal() {
      return Err(MarketError::invalid_state(format!(
        "Order is already {} and cannot become {}",
        self.status, next
      )));
    }
    self.status = next;
    Ok(true)
  }
}

fn sum_line_totals(items: &[OrderLineItem]) -> MarketResult<i64> {
  items.iter().try_fold(0i64, |acc, line| {
    line
      .line_total_cents()
      .and_then(|t| acc.checked_add(t))
      .ok_or_else(|| MarketError::unexpected("Order total overflows"))
  })
}
