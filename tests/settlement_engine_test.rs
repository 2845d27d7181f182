//! Executor-level settlement properties over the in-memory store.

use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{Duration, Utc};
use uuid::Uuid;

use ledger_core::adapters::MemoryLedgerStore;
use ledger_core::domain::{Account, Direction, Transaction, TxStatus};
use ledger_core::ports::{LedgerStore, StoreError};
use ledger_core::services::executor::{SettlementExecutor, SettlementOutcome};

fn amount(s: &str) -> BigDecimal {
    s.parse().unwrap()
}

async fn seed_account(store: &MemoryLedgerStore, balance: &str) -> Account {
    let account = Account::new(Uuid::new_v4(), amount(balance));
    store.put_account(account.clone()).await;
    account
}

async fn seed_tx(
    store: &MemoryLedgerStore,
    account: &Account,
    amt: &str,
    direction: Direction,
) -> Transaction {
    let tx = Transaction::new(account.id, amount(amt), direction, None);
    store.insert_transaction(&tx).await.unwrap()
}

#[tokio::test]
async fn test_credit_increases_balance_and_completes() {
    let store = Arc::new(MemoryLedgerStore::new());
    let account = seed_account(&store, "100.00").await;
    let tx = seed_tx(&store, &account, "50.00", Direction::Credit).await;

    let executor = SettlementExecutor::new(store.clone());
    let outcome = executor.settle(tx.id, Utc::now()).await.unwrap();

    assert_eq!(outcome, SettlementOutcome::Completed);
    let stored = store.transaction(tx.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TxStatus::Completed);
    assert!(stored.settled_at.is_some());
    assert_eq!(
        store.account(account.id).await.unwrap().unwrap().balance,
        amount("150.00")
    );
}

#[tokio::test]
async fn test_covered_debit_decreases_balance_by_exactly_amount() {
    let store = Arc::new(MemoryLedgerStore::new());
    let account = seed_account(&store, "100.00").await;
    let tx = seed_tx(&store, &account, "100.00", Direction::Debit).await;

    let executor = SettlementExecutor::new(store.clone());
    let outcome = executor.settle(tx.id, Utc::now()).await.unwrap();

    assert_eq!(outcome, SettlementOutcome::Completed);
    assert_eq!(
        store.account(account.id).await.unwrap().unwrap().balance,
        amount("0.00")
    );
}

#[tokio::test]
async fn test_uncovered_debit_fails_without_touching_balance() {
    let store = Arc::new(MemoryLedgerStore::new());
    let account = seed_account(&store, "100.00").await;
    let tx = seed_tx(&store, &account, "100.01", Direction::Debit).await;

    let executor = SettlementExecutor::new(store.clone());
    let outcome = executor.settle(tx.id, Utc::now()).await.unwrap();

    assert_eq!(
        outcome,
        SettlementOutcome::Failed {
            reason: "insufficient funds".to_string()
        }
    );
    let stored = store.transaction(tx.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TxStatus::Failed);
    assert_eq!(stored.failure_reason.as_deref(), Some("insufficient funds"));
    assert!(stored.settled_at.is_some());
    assert_eq!(
        store.account(account.id).await.unwrap().unwrap().balance,
        amount("100.00")
    );

    // A failed transaction is terminal too: re-settling is a no-op.
    let again = executor.settle(tx.id, Utc::now()).await.unwrap();
    assert_eq!(again, SettlementOutcome::AlreadyTerminal);
}

#[tokio::test]
async fn test_second_sequential_settle_is_already_terminal() {
    let store = Arc::new(MemoryLedgerStore::new());
    let account = seed_account(&store, "100.00").await;
    let tx = seed_tx(&store, &account, "40.00", Direction::Debit).await;

    let executor = SettlementExecutor::new(store.clone());
    let first = executor.settle(tx.id, Utc::now()).await.unwrap();
    let second = executor.settle(tx.id, Utc::now()).await.unwrap();

    assert_eq!(first, SettlementOutcome::Completed);
    assert_eq!(second, SettlementOutcome::AlreadyTerminal);
    // The amount was applied exactly once.
    assert_eq!(
        store.account(account.id).await.unwrap().unwrap().balance,
        amount("60.00")
    );
}

#[tokio::test]
async fn test_concurrent_settles_apply_exactly_once() {
    let store = Arc::new(MemoryLedgerStore::new());
    let account = seed_account(&store, "100.00").await;
    let tx = seed_tx(&store, &account, "30.00", Direction::Debit).await;

    let a = SettlementExecutor::new(store.clone());
    let b = SettlementExecutor::new(store.clone());
    let now = Utc::now();
    let tx_id = tx.id;

    let (ra, rb) = tokio::join!(
        tokio::spawn(async move { a.settle(tx_id, now).await.unwrap() }),
        tokio::spawn(async move { b.settle(tx_id, now).await.unwrap() }),
    );
    let outcomes = [ra.unwrap(), rb.unwrap()];

    let completed = outcomes
        .iter()
        .filter(|o| **o == SettlementOutcome::Completed)
        .count();
    let already_terminal = outcomes
        .iter()
        .filter(|o| **o == SettlementOutcome::AlreadyTerminal)
        .count();

    assert_eq!(completed, 1);
    assert_eq!(already_terminal, 1);
    assert_eq!(
        store.account(account.id).await.unwrap().unwrap().balance,
        amount("70.00")
    );
}

#[tokio::test]
async fn test_missing_account_leaves_transaction_pending() {
    let store = Arc::new(MemoryLedgerStore::new());
    let orphan = Transaction::new(Uuid::new_v4(), amount("10.00"), Direction::Credit, None);
    store.insert_transaction(&orphan).await.unwrap();

    let executor = SettlementExecutor::new(store.clone());
    let outcome = executor.settle(orphan.id, Utc::now()).await.unwrap();

    assert_eq!(outcome, SettlementOutcome::AccountNotFound);
    let stored = store.transaction(orphan.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TxStatus::Pending);
    assert!(stored.settled_at.is_none());
}

#[tokio::test]
async fn test_unknown_transaction_is_an_integrity_error() {
    let store = Arc::new(MemoryLedgerStore::new());
    let executor = SettlementExecutor::new(store);

    let result = executor.settle(Uuid::new_v4(), Utc::now()).await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_balances_stay_non_negative_under_arbitrary_settlement_order() {
    let store = Arc::new(MemoryLedgerStore::new());
    let account = seed_account(&store, "20.00").await;
    let now = Utc::now();

    // Debits that together exceed the balance, interleaved with credits.
    let mut ids = Vec::new();
    for (amt, direction) in [
        ("15.00", Direction::Debit),
        ("15.00", Direction::Debit),
        ("5.00", Direction::Credit),
        ("15.00", Direction::Debit),
    ] {
        let tx = Transaction::new(
            account.id,
            amount(amt),
            direction,
            Some(now - Duration::minutes(1)),
        );
        store.insert_transaction(&tx).await.unwrap();
        ids.push(tx.id);
    }

    let executor = SettlementExecutor::new(store.clone());
    for id in ids {
        executor.settle(id, now).await.unwrap();
        let balance = store.account(account.id).await.unwrap().unwrap().balance;
        assert!(balance >= amount("0.00"), "balance went negative: {}", balance);
    }
}
