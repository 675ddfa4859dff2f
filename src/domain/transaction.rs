//! Buy-in / cash-out transactions.

use crate::domain::{AgentId, CustomerId, Decimal, TimeMs, TripId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of money movement. Unknown kinds found in storage are kept verbatim
/// so the aggregator can log and skip them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    BuyIn,
    CashOut,
    Unsupported(String),
}

impl TransactionKind {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy-in" | "buy_in" | "buyin" => TransactionKind::BuyIn,
            "cash-out" | "cash_out" | "cashout" => TransactionKind::CashOut,
            _ => TransactionKind::Unsupported(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TransactionKind::BuyIn => "buy-in",
            TransactionKind::CashOut => "cash-out",
            TransactionKind::Unsupported(raw) => raw,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, TransactionKind::Unsupported(_))
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TransactionKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TransactionKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TransactionKind::parse(&raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(TransactionStatus::Pending),
            "completed" => Some(TransactionStatus::Completed),
            "cancelled" | "canceled" => Some(TransactionStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded buy-in or cash-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub trip_id: TripId,
    pub customer_id: CustomerId,
    pub agent_id: Option<AgentId>,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub created_at: TimeMs,
}

/// Input for recording a new transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub trip_id: TripId,
    pub customer_id: CustomerId,
    pub agent_id: Option<AgentId>,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
}
