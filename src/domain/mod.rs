pub mod account;
pub mod transaction;

pub use account::Account;
pub use transaction::{Direction, Transaction, TxStatus};
