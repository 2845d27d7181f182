//! In-memory implementation of LedgerStore.
//!
//! Backs the engine tests and local experimentation. A single mutex guards
//! the whole ledger, which makes every settlement commit trivially atomic
//! while keeping the same conditional-write semantics as the Postgres
//! adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{Account, Transaction, TxStatus};
use crate::ports::{LedgerStore, SettlementCommit, StoreError, StoreResult};

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<Uuid, Account>,
    transactions: HashMap<Uuid, Transaction>,
}

#[derive(Default)]
pub struct MemoryLedgerStore {
    state: Mutex<LedgerState>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_account(&self, account: Account) {
        let mut state = self.state.lock().await;
        state.accounts.insert(account.id, account);
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let state = self.state.lock().await;
        Ok(state.accounts.get(&id).cloned())
    }

    async fn transaction(&self, id: Uuid) -> StoreResult<Option<Transaction>> {
        let state = self.state.lock().await;
        Ok(state.transactions.get(&id).cloned())
    }

    async fn insert_transaction(&self, tx: &Transaction) -> StoreResult<Transaction> {
        let mut state = self.state.lock().await;
        if state.transactions.contains_key(&tx.id) {
            return Err(StoreError::Conflict(format!(
                "transaction {} already exists",
                tx.id
            )));
        }
        state.transactions.insert(tx.id, tx.clone());
        Ok(tx.clone())
    }

    async fn list_transactions(&self, limit: i64, offset: i64) -> StoreResult<Vec<Transaction>> {
        let state = self.state.lock().await;
        let mut all: Vec<Transaction> = state.transactions.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn eligible_transactions(&self, now: DateTime<Utc>) -> StoreResult<Vec<Transaction>> {
        let state = self.state.lock().await;
        let mut eligible: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|t| t.is_eligible(now))
            .cloned()
            .collect();
        // Oldest scheduled first, absent scheduled time first, id as tiebreak.
        eligible.sort_by_key(|t| (t.scheduled_at, t.id));
        Ok(eligible)
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        reason: &str,
        settled_at: DateTime<Utc>,
    ) -> StoreResult<SettlementCommit> {
        let mut state = self.state.lock().await;
        let Some(tx) = state.transactions.get_mut(&id) else {
            return Err(StoreError::NotFound(format!("transaction {}", id)));
        };
        if tx.status != TxStatus::Pending {
            return Ok(SettlementCommit::StatusConflict);
        }

        tx.status = TxStatus::Failed;
        tx.failure_reason = Some(reason.to_string());
        tx.settled_at = Some(settled_at);
        tx.updated_at = Utc::now();
        Ok(SettlementCommit::Applied)
    }

    async fn apply_settlement(
        &self,
        id: Uuid,
        account_id: Uuid,
        delta: &BigDecimal,
        settled_at: DateTime<Utc>,
    ) -> StoreResult<SettlementCommit> {
        let mut state = self.state.lock().await;

        match state.transactions.get(&id) {
            None => return Err(StoreError::NotFound(format!("transaction {}", id))),
            Some(tx) if tx.status != TxStatus::Pending => {
                return Ok(SettlementCommit::StatusConflict);
            }
            Some(_) => {}
        }

        let Some(account) = state.accounts.get_mut(&account_id) else {
            return Ok(SettlementCommit::AccountMissing);
        };
        let candidate = &account.balance + delta;
        if candidate < BigDecimal::from(0) {
            return Ok(SettlementCommit::BalanceConflict);
        }
        account.balance = candidate;
        account.updated_at = Utc::now();

        if let Some(tx) = state.transactions.get_mut(&id) {
            tx.status = TxStatus::Completed;
            tx.settled_at = Some(settled_at);
            tx.updated_at = Utc::now();
        }

        Ok(SettlementCommit::Applied)
    }
}
