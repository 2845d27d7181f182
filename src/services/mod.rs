pub mod executor;
pub mod notifier;
pub mod runner;
pub mod scheduler;
pub mod selector;

pub use executor::{SettlementExecutor, SettlementOutcome};
pub use notifier::{NotificationSink, NullSink, SettlementNotice, WebhookSink};
pub use runner::{BatchReport, BatchRunner, RetryPolicy};
pub use selector::SettlementSelector;
