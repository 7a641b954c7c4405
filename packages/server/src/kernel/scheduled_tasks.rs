//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! The dispatcher's polling loop runs on its own interval; this module owns
//! the slow periodic work — currently just outbox compaction.

use std::sync::Arc;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use txoutbox::Dispatcher;

/// Start all scheduled tasks. Compaction runs hourly and deletes processed
/// outbox rows older than the retention window, on every shard's outbox.
pub async fn start_scheduler(dispatchers: Vec<Arc<Dispatcher>>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let compact_job = Job::new_async("0 0 * * * *", move |_uuid, _lock| {
        let dispatchers = dispatchers.clone();
        Box::pin(async move {
            for dispatcher in &dispatchers {
                match dispatcher.compact().await {
                    Ok(removed) => {
                        tracing::info!(removed, "Outbox compaction complete");
                    }
                    Err(e) => tracing::error!(error = %e, "Outbox compaction failed"),
                }
            }
        })
    })?;

    scheduler.add(compact_job).await?;
    scheduler.start().await?;

    tracing::info!("Scheduled tasks started (outbox compaction hourly)");
    Ok(scheduler)
}
