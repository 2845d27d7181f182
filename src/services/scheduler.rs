//! In-process settlement scheduler.
//!
//! Runs batches on a cron schedule without blocking the HTTP server.
//! Overlapping with an externally triggered run is safe: the executor's
//! conditional writes resolve any race.

use std::time::Duration;

use chrono::Utc;
use cron::Schedule;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::services::runner::BatchRunner;

pub async fn run_settlement_loop(runner: BatchRunner, schedule: Schedule) {
    info!("settlement scheduler started");

    loop {
        let Some(next) = schedule.upcoming(Utc).next() else {
            warn!("settlement schedule has no upcoming fire times; scheduler stopping");
            return;
        };

        let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        sleep(wait).await;

        match runner.run(Utc::now()).await {
            Ok(report) => info!(
                "scheduled settlement batch: {} completed, {} failed, {} retryable of {}",
                report.completed, report.failed, report.retryable, report.total
            ),
            Err(e) => error!("scheduled settlement batch aborted: {}", e),
        }
    }
}
