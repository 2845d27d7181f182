//! Postgres implementation of LedgerStore.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Account, Transaction};
use crate::ports::{LedgerStore, SettlementCommit, StoreError, StoreResult};

/// Postgres-backed ledger store.
///
/// Settlement commits are realized as guarded `UPDATE`s inside a single
/// database transaction: the status guard (`status = 'pending'`) and the
/// balance guard (`balance + delta >= 0`) are both evaluated at write time,
/// so a rejected guard means another writer got there first and nothing is
/// modified.
#[derive(Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(AccountRow::into_domain))
    }

    async fn transaction(&self, id: Uuid) -> StoreResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TransactionRow::try_into_domain).transpose()
    }

    async fn insert_transaction(&self, tx: &Transaction) -> StoreResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            INSERT INTO transactions (
                id, account_id, amount, direction, status,
                scheduled_at, settled_at, failure_reason, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, account_id, amount, direction, status,
                scheduled_at, settled_at, failure_reason, created_at, updated_at
            "#,
        )
        .bind(tx.id)
        .bind(tx.account_id)
        .bind(&tx.amount)
        .bind(tx.direction.to_string())
        .bind(tx.status.to_string())
        .bind(tx.scheduled_at)
        .bind(tx.settled_at)
        .bind(&tx.failure_reason)
        .bind(tx.created_at)
        .bind(tx.updated_at)
        .fetch_one(&self.pool)
        .await?;

        row.try_into_domain()
    }

    async fn list_transactions(&self, limit: i64, offset: i64) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(TransactionRow::try_into_domain)
            .collect()
    }

    async fn eligible_transactions(&self, now: DateTime<Utc>) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT * FROM transactions
            WHERE status = 'pending'
            AND (scheduled_at IS NULL OR scheduled_at <= $1)
            ORDER BY scheduled_at ASC NULLS FIRST, id ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(TransactionRow::try_into_domain)
            .collect()
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        reason: &str,
        settled_at: DateTime<Utc>,
    ) -> StoreResult<SettlementCommit> {
        let rows = sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'failed', failure_reason = $2, settled_at = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(reason)
        .bind(settled_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            Ok(SettlementCommit::StatusConflict)
        } else {
            Ok(SettlementCommit::Applied)
        }
    }

    async fn apply_settlement(
        &self,
        id: Uuid,
        account_id: Uuid,
        delta: &BigDecimal,
        settled_at: DateTime<Utc>,
    ) -> StoreResult<SettlementCommit> {
        let mut db_tx = self.pool.begin().await?;

        let status_rows = sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'completed', settled_at = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(settled_at)
        .execute(&mut *db_tx)
        .await?
        .rows_affected();

        if status_rows == 0 {
            db_tx.rollback().await?;
            return Ok(SettlementCommit::StatusConflict);
        }

        let balance_rows = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = balance + $2, updated_at = NOW()
            WHERE id = $1 AND balance + $2 >= 0
            "#,
        )
        .bind(account_id)
        .bind(delta)
        .execute(&mut *db_tx)
        .await?
        .rows_affected();

        if balance_rows == 0 {
            // Distinguish a vanished account from a balance that moved under us.
            let account_exists =
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts WHERE id = $1")
                    .bind(account_id)
                    .fetch_one(&mut *db_tx)
                    .await?;

            db_tx.rollback().await?;
            return Ok(if account_exists == 0 {
                SettlementCommit::AccountMissing
            } else {
                SettlementCommit::BalanceConflict
            });
        }

        db_tx.commit().await?;
        Ok(SettlementCommit::Applied)
    }
}

/// Internal row types for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    balance: BigDecimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_domain(self) -> Account {
        Account {
            id: self.id,
            balance: self.balance,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    account_id: Uuid,
    amount: BigDecimal,
    direction: String,
    status: String,
    scheduled_at: Option<DateTime<Utc>>,
    settled_at: Option<DateTime<Utc>>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TransactionRow {
    /// Reject malformed stored values here rather than letting a partial
    /// record propagate into the engine.
    fn try_into_domain(self) -> StoreResult<Transaction> {
        let direction = self
            .direction
            .parse()
            .map_err(|e| StoreError::Malformed(format!("transaction {}: {}", self.id, e)))?;
        let status = self
            .status
            .parse()
            .map_err(|e| StoreError::Malformed(format!("transaction {}: {}", self.id, e)))?;

        Ok(Transaction {
            id: self.id,
            account_id: self.account_id,
            amount: self.amount,
            direction,
            status,
            scheduled_at: self.scheduled_at,
            settled_at: self.settled_at,
            failure_reason: self.failure_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
