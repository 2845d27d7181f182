//! Settlement selector: the read-only query for settleable transactions.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::Transaction;
use crate::ports::{LedgerStore, StoreResult};

/// Selects transactions eligible for settlement at a given instant:
/// pending, with an elapsed (or absent) scheduled time. The result is
/// deterministic — oldest scheduled first, unscheduled before everything,
/// ids as tiebreak — and re-querying is always safe: the eligible set only
/// shrinks as a batch progresses.
#[derive(Clone)]
pub struct SettlementSelector {
    store: Arc<dyn LedgerStore>,
}

impl SettlementSelector {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn eligible(&self, now: DateTime<Utc>) -> StoreResult<Vec<Transaction>> {
        self.store.eligible_transactions(now).await
    }
}
