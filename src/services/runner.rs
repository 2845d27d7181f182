//! Batch runner: one settlement pass over the eligible set.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Transaction;
use crate::ports::{LedgerStore, StoreError, StoreResult};
use crate::services::executor::{SettlementExecutor, SettlementOutcome};
use crate::services::notifier::{NotificationSink, SettlementNotice};
use crate::services::selector::SettlementSelector;

/// Bounded retry for transient per-transaction storage errors. The delay
/// grows linearly with the attempt number; operations are never retried
/// indefinitely.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Outcome counters for one batch pass, serialized into the trigger
/// response. `already_terminal` and `anomalies` surface races resolved by
/// other runners and integrity problems left pending for remediation.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct BatchReport {
    pub completed: u64,
    pub failed: u64,
    pub retryable: u64,
    pub already_terminal: u64,
    pub anomalies: u64,
    pub total: u64,
}

/// Orchestrates one settlement pass: select once, settle each transaction
/// in order, classify outcomes. An individual transaction's failure never
/// aborts the pass — every transaction in the initial eligible set gets its
/// attempt. Overlapping or repeated runs are safe: the executor's
/// conditional writes make re-settlement a no-op.
pub struct BatchRunner {
    selector: SettlementSelector,
    executor: SettlementExecutor,
    notifier: Arc<dyn NotificationSink>,
    retry: RetryPolicy,
}

impl BatchRunner {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        notifier: Arc<dyn NotificationSink>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            selector: SettlementSelector::new(store.clone()),
            executor: SettlementExecutor::new(store),
            notifier,
            retry,
        }
    }

    /// Run one batch. Only a failure of the initial selection — the store
    /// being unreachable — aborts the run; no partial state is left behind
    /// when it does.
    pub async fn run(&self, now: DateTime<Utc>) -> StoreResult<BatchReport> {
        let eligible = self.selector.eligible(now).await?;

        let mut report = BatchReport {
            total: eligible.len() as u64,
            ..Default::default()
        };

        for tx in &eligible {
            match self.settle_with_retry(tx.id, now).await {
                Ok(SettlementOutcome::Completed) => {
                    report.completed += 1;
                    self.notify(tx, "completed").await;
                }
                Ok(SettlementOutcome::Failed { reason }) => {
                    report.failed += 1;
                    info!("transaction {} failed: {}", tx.id, reason);
                    self.notify(tx, "failed").await;
                }
                Ok(SettlementOutcome::AlreadyTerminal) => {
                    report.already_terminal += 1;
                    debug!("transaction {} already settled by another runner", tx.id);
                }
                Ok(SettlementOutcome::AccountNotFound) => {
                    report.anomalies += 1;
                    warn!(
                        "account {} missing for transaction {}; left pending",
                        tx.account_id, tx.id
                    );
                }
                Err(StoreError::NotFound(msg)) | Err(StoreError::Malformed(msg)) => {
                    report.anomalies += 1;
                    warn!("transaction {} skipped: {}", tx.id, msg);
                }
                Err(e) => {
                    report.retryable += 1;
                    warn!(
                        "transaction {} left pending after storage error: {}",
                        tx.id, e
                    );
                }
            }
        }

        info!(
            "settlement batch done: {} completed, {} failed, {} retryable, {} already terminal, {} anomalies of {} eligible",
            report.completed,
            report.failed,
            report.retryable,
            report.already_terminal,
            report.anomalies,
            report.total
        );

        Ok(report)
    }

    async fn settle_with_retry(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<SettlementOutcome> {
        let mut attempt: u32 = 1;
        loop {
            let err = match self.executor.settle(id, now).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => e,
            };

            let transient = matches!(err, StoreError::Storage(_) | StoreError::Conflict(_));
            if !transient || attempt >= self.retry.max_attempts {
                return Err(err);
            }

            let delay = self.retry.delay_for(attempt);
            warn!(
                "settle attempt {} for transaction {} failed ({}); retrying in {:?}",
                attempt, id, err, delay
            );
            sleep(delay).await;
            attempt += 1;
        }
    }

    async fn notify(&self, tx: &Transaction, outcome: &str) {
        let notice = SettlementNotice {
            account_id: tx.account_id,
            transaction_id: tx.id,
            outcome: outcome.to_string(),
            amount: tx.amount.clone(),
            direction: tx.direction,
        };

        if let Err(e) = self.notifier.notify(&notice).await {
            warn!("notification for transaction {} dropped: {}", tx.id, e);
        }
    }
}
