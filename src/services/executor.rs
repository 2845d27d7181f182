//! Settlement executor: the per-transaction state machine.

use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::ports::{LedgerStore, SettlementCommit, StoreError, StoreResult};

pub const INSUFFICIENT_FUNDS: &str = "insufficient funds";

/// Terminal classification of one settle call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    Completed,
    Failed { reason: String },
    /// The transaction had already left pending — a race resolved by
    /// another runner, or a re-invocation after a crash.
    AlreadyTerminal,
    /// The referenced account is missing. The transaction is left pending
    /// so it can settle once the anomaly is remediated.
    AccountNotFound,
}

/// Advances a single pending transaction to a terminal status, applying its
/// balance effect exactly once.
///
/// Both commit paths are conditional writes that only succeed if the status
/// was still pending at write time; the completion path additionally
/// re-validates the balance against the latest committed value. A balance
/// that moved between the read and the commit triggers one re-read and
/// retry of the whole call.
#[derive(Clone)]
pub struct SettlementExecutor {
    store: Arc<dyn LedgerStore>,
}

impl SettlementExecutor {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn settle(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<SettlementOutcome> {
        let Some(tx) = self.store.transaction(id).await? else {
            return Err(StoreError::NotFound(format!("transaction {}", id)));
        };
        if tx.status.is_terminal() {
            return Ok(SettlementOutcome::AlreadyTerminal);
        }

        let delta = tx.signed_amount();

        for _ in 0..2 {
            let Some(account) = self.store.account(tx.account_id).await? else {
                return Ok(SettlementOutcome::AccountNotFound);
            };

            let candidate = &account.balance + &delta;
            if candidate < BigDecimal::from(0) {
                return match self.store.mark_failed(tx.id, INSUFFICIENT_FUNDS, now).await? {
                    SettlementCommit::Applied => Ok(SettlementOutcome::Failed {
                        reason: INSUFFICIENT_FUNDS.to_string(),
                    }),
                    _ => Ok(SettlementOutcome::AlreadyTerminal),
                };
            }

            match self
                .store
                .apply_settlement(tx.id, tx.account_id, &delta, now)
                .await?
            {
                SettlementCommit::Applied => return Ok(SettlementOutcome::Completed),
                SettlementCommit::StatusConflict => {
                    return Ok(SettlementOutcome::AlreadyTerminal)
                }
                SettlementCommit::AccountMissing => {
                    return Ok(SettlementOutcome::AccountNotFound)
                }
                SettlementCommit::BalanceConflict => {
                    debug!(
                        "balance of account {} moved while settling transaction {}; retrying",
                        tx.account_id, tx.id
                    );
                }
            }
        }

        // The balance kept moving under us; leave the transaction pending
        // for the next batch.
        Err(StoreError::Conflict(format!(
            "balance re-validation failed twice for transaction {}",
            id
        )))
    }
}
