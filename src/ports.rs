//! Store boundary for the settlement engine.
//!
//! Account and transaction records live in a durable store reached only
//! through [`LedgerStore`]. The two settlement commits are conditional
//! writes: they succeed only if the transaction was still pending (and, for
//! [`LedgerStore::apply_settlement`], the balance precondition still holds)
//! at write time, so concurrent settlers of the same transaction cannot
//! both apply its amount.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Account, Transaction};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a conditional settlement write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementCommit {
    /// Both the status transition and (for completion) the balance mutation
    /// were applied together.
    Applied,
    /// The transaction was no longer pending at write time; nothing changed.
    StatusConflict,
    /// The balance precondition no longer held at write time; nothing changed.
    BalanceConflict,
    /// The referenced account row was gone at write time; nothing changed.
    AccountMissing,
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Cheap connectivity probe for health reporting.
    async fn ping(&self) -> StoreResult<()>;

    async fn account(&self, id: Uuid) -> StoreResult<Option<Account>>;

    async fn transaction(&self, id: Uuid) -> StoreResult<Option<Transaction>>;

    async fn insert_transaction(&self, tx: &Transaction) -> StoreResult<Transaction>;

    async fn list_transactions(&self, limit: i64, offset: i64) -> StoreResult<Vec<Transaction>>;

    /// All pending transactions whose scheduled time has elapsed (absent
    /// scheduled time = immediately eligible), ordered by scheduled time
    /// ascending with absent first, ties broken by id ascending.
    async fn eligible_transactions(&self, now: DateTime<Utc>) -> StoreResult<Vec<Transaction>>;

    /// Conditionally transition a pending transaction to `failed` without
    /// touching the account balance.
    async fn mark_failed(
        &self,
        id: Uuid,
        reason: &str,
        settled_at: DateTime<Utc>,
    ) -> StoreResult<SettlementCommit>;

    /// Atomically apply `delta` to the account balance and transition the
    /// pending transaction to `completed`. Either both writes commit or
    /// neither does; the non-negative balance invariant is re-checked
    /// against the latest committed balance inside the write.
    async fn apply_settlement(
        &self,
        id: Uuid,
        account_id: Uuid,
        delta: &BigDecimal,
        settled_at: DateTime<Utc>,
    ) -> StoreResult<SettlementCommit>;
}
