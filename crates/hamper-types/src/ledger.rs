//! Wallet ledger types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{SubscriptionId, UserId};

/// Unique ledger entry identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerEntryId(pub Uuid);

impl LedgerEntryId {
    /// Create a new random ledger entry ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LedgerEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LedgerEntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryDirection {
    /// Funds added to the wallet
    Credit,
    /// Funds taken from the wallet
    Debit,
}

impl std::fmt::Display for EntryDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Credit => write!(f, "credit"),
            Self::Debit => write!(f, "debit"),
        }
    }
}

impl std::str::FromStr for EntryDirection {
    type Err = LedgerParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            _ => Err(LedgerParseError(s.to_string())),
        }
    }
}

/// Outcome recorded on a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// The balance change was applied
    Success,
    /// The attempt was recorded but no balance changed
    Failed,
    /// Awaiting settlement
    Pending,
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::Pending => write!(f, "pending"),
        }
    }
}

impl std::str::FromStr for EntryStatus {
    type Err = LedgerParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "pending" => Ok(Self::Pending),
            _ => Err(LedgerParseError(s.to_string())),
        }
    }
}

/// Error parsing a ledger enum string
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid ledger field: {0}")]
pub struct LedgerParseError(pub String);

/// An immutable wallet ledger entry
///
/// Entries are append-only; the spendable balance is the sum of successful
/// credits minus successful debits, maintained as a denormalized balance on
/// the user row and updated atomically with entry insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry ID
    pub id: LedgerEntryId,
    /// Owning user
    pub user_id: UserId,
    /// Subscription this entry was billed for, when it is a billing debit
    pub subscription_id: Option<SubscriptionId>,
    /// Amount in cents, always positive
    pub amount_cents: i64,
    /// Credit or debit
    pub direction: EntryDirection,
    /// Whether the balance change was applied
    pub status: EntryStatus,
    /// Human-readable description of the entry
    pub description: String,
    /// When the entry was written
    pub created_at: DateTime<Utc>,
}
