//! Transaction domain entity.
//! Framework-agnostic representation of a financial transaction moving
//! through the settlement lifecycle.

use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Whether a transaction increases or decreases the account balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Credit,
    Debit,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Credit => write!(f, "credit"),
            Direction::Debit => write!(f, "debit"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(Direction::Credit),
            "debit" => Ok(Direction::Debit),
            other => Err(format!("unknown direction '{}'", other)),
        }
    }
}

/// Settlement status. Transitions are monotonic: once a transaction reaches
/// a terminal status it never reverts to pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Completed,
    Failed,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStatus::Completed | TxStatus::Failed)
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxStatus::Pending => write!(f, "pending"),
            TxStatus::Completed => write!(f, "completed"),
            TxStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for TxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TxStatus::Pending),
            "completed" => Ok(TxStatus::Completed),
            "failed" => Ok(TxStatus::Failed),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// Domain entity representing a transaction against a single account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: Uuid,
    /// Strictly positive; the sign of the balance effect comes from `direction`.
    #[schema(value_type = String, example = "50.00")]
    pub amount: BigDecimal,
    pub direction: Direction,
    pub status: TxStatus,
    /// Absent means immediately eligible for settlement.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Set exactly once, when the status becomes terminal.
    pub settled_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        account_id: Uuid,
        amount: BigDecimal,
        direction: Direction,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            account_id,
            amount,
            direction,
            status: TxStatus::Pending,
            scheduled_at,
            settled_at: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The balance delta this transaction applies when it completes.
    pub fn signed_amount(&self) -> BigDecimal {
        match self.direction {
            Direction::Credit => self.amount.clone(),
            Direction::Debit => -self.amount.clone(),
        }
    }

    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.status == TxStatus::Pending && self.scheduled_at.map_or(true, |at| at <= now)
    }
}
