use std::env;
use std::time::Duration;

use dotenvy::dotenv;

use crate::services::runner::RetryPolicy;

/// Runtime configuration, loaded once from the environment and passed
/// explicitly into each component.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    /// Cron expression (seconds field included) for the in-process
    /// settlement scheduler.
    pub settlement_schedule: String,
    pub settle_max_attempts: u32,
    pub settle_retry_base_ms: u64,
    pub notify_webhook_url: Option<String>,
    pub notify_webhook_secret: Option<String>,
    pub cors_allowed_origins: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")?,
            settlement_schedule: env::var("SETTLEMENT_SCHEDULE")
                .unwrap_or_else(|_| "0 * * * * *".to_string()),
            settle_max_attempts: env::var("SETTLE_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()?,
            settle_retry_base_ms: env::var("SETTLE_RETRY_BASE_MS")
                .unwrap_or_else(|_| "250".to_string())
                .parse()?,
            notify_webhook_url: env::var("NOTIFY_WEBHOOK_URL").ok(),
            notify_webhook_secret: env::var("NOTIFY_WEBHOOK_SECRET").ok(),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS").ok(),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.settle_max_attempts.max(1),
            base_delay: Duration::from_millis(self.settle_retry_base_ms),
        }
    }
}
