//! Notification sink for terminal settlement outcomes.
//!
//! Delivery is best-effort: a failed notification is logged and dropped,
//! never rolling back or blocking settlement.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::domain::Direction;

const SIGNATURE_HEADER: &str = "X-Ledger-Signature";

/// Record emitted for each completed or failed settlement.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementNotice {
    pub account_id: Uuid,
    pub transaction_id: Uuid,
    pub outcome: String,
    pub amount: BigDecimal,
    pub direction: Direction,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notice: &SettlementNotice) -> anyhow::Result<()>;
}

/// Sink used when no webhook is configured; outcomes are only logged.
pub struct NullSink;

#[async_trait]
impl NotificationSink for NullSink {
    async fn notify(&self, notice: &SettlementNotice) -> anyhow::Result<()> {
        debug!(
            "settlement notice: transaction {} on account {} -> {}",
            notice.transaction_id, notice.account_id, notice.outcome
        );
        Ok(())
    }
}

/// Posts signed JSON notices to a webhook endpoint.
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
    secret: Option<String>,
}

impl WebhookSink {
    pub fn new(url: String, secret: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            secret,
        }
    }

    fn sign(secret: &str, body: &[u8]) -> anyhow::Result<String> {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .context("invalid webhook secret")?;
        mac.update(body);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn notify(&self, notice: &SettlementNotice) -> anyhow::Result<()> {
        let body = serde_json::to_vec(notice)?;

        let mut request = self
            .client
            .post(&self.url)
            .header("content-type", "application/json");

        if let Some(secret) = &self.secret {
            request = request.header(SIGNATURE_HEADER, Self::sign(secret, &body)?);
        }

        request
            .body(body)
            .send()
            .await
            .context("webhook request failed")?
            .error_for_status()
            .context("webhook endpoint rejected notice")?;

        Ok(())
    }
}

/// Build the configured sink: webhook when a URL is set, null otherwise.
pub fn sink_from_config(config: &Config) -> Arc<dyn NotificationSink> {
    match &config.notify_webhook_url {
        Some(url) => Arc::new(WebhookSink::new(
            url.clone(),
            config.notify_webhook_secret.clone(),
        )),
        None => Arc::new(NullSink),
    }
}
