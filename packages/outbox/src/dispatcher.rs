//! Polling dispatcher that drains the outbox into the message log.
//!
//! Each tick runs in a single transaction: claim a batch with skip-locked
//! row locks, publish every record, mark the batch processed, commit. A
//! failure anywhere rolls the claim back and the same rows are retried on
//! the next tick; downstream idempotence absorbs the replay.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use sqlx::PgPool;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::publisher::{EventEnvelope, EventPublisher};
use crate::record::OutboxRecord;

/// Dispatcher tuning knobs.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// How often to poll for unprocessed records.
    pub poll_interval: Duration,
    /// Maximum records claimed per tick.
    pub batch_size: i64,
    /// Deadline for a single publish. Row locks are held for the duration
    /// of the tick, so a hung publish must not starve adjacent ticks.
    pub publish_timeout: Duration,
    /// How long processed records are kept before compaction.
    pub retention: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            batch_size: 100,
            publish_timeout: Duration::from_secs(30),
            retention: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Background service that moves outbox rows onto the message log.
///
/// Multiple dispatchers may run against the same table; skip-locked claims
/// make them share the backlog without coordination.
pub struct Dispatcher {
    pool: PgPool,
    publisher: Arc<dyn EventPublisher>,
    config: DispatcherConfig,
    shutdown: Arc<AtomicBool>,
}

impl Dispatcher {
    pub fn new(pool: PgPool, publisher: Arc<dyn EventPublisher>, config: DispatcherConfig) -> Self {
        Self {
            pool,
            publisher,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for signalling shutdown from another task.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Poll until shutdown is signalled. Tick errors are logged and the
    /// loop continues; a poisoned record must not halt the pipeline.
    pub async fn run(&self) {
        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            "Outbox dispatcher starting"
        );

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            if self.shutdown.load(Ordering::SeqCst) {
                info!("Outbox dispatcher shutting down");
                return;
            }

            match self.tick().await {
                Ok(0) => debug!("No outbox records to dispatch"),
                Ok(count) => info!(dispatched = count, "Dispatched outbox records"),
                Err(e) => error!(error = %e, "Outbox dispatch tick failed"),
            }
        }
    }

    /// One claim-publish-mark cycle. Exposed so tests and schedulers can
    /// drive the dispatcher without the polling loop.
    pub async fn tick(&self) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        let records = OutboxRecord::claim_batch(&mut tx, self.config.batch_size).await?;
        if records.is_empty() {
            tx.commit().await?;
            return Ok(0);
        }

        // Publish in claim order (created_at ASC) so per-aggregate order on
        // the log matches append order.
        for record in &records {
            let envelope = EventEnvelope::from_record(record);
            tokio::time::timeout(self.config.publish_timeout, self.publisher.publish(&envelope))
                .await
                .map_err(|_| {
                    anyhow!(
                        "publish of event {} timed out after {:?}",
                        record.id,
                        self.config.publish_timeout
                    )
                })??;
        }

        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        OutboxRecord::mark_processed(&mut tx, &ids).await?;
        tx.commit().await?;

        Ok(ids.len())
    }

    /// Delete processed records older than the retention window.
    pub async fn compact(&self) -> Result<u64> {
        let cutoff = chrono::Utc::now()
            - chrono::Duration::from_std(self.config.retention)
                .map_err(|e| anyhow!("retention out of range: {e}"))?;

        let removed = OutboxRecord::compact_processed_older_than(&self.pool, cutoff).await?;
        if removed > 0 {
            info!(removed, "Compacted processed outbox records");
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_contract() {
        let config = DispatcherConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.publish_timeout, Duration::from_secs(30));
        assert_eq!(config.retention, Duration::from_secs(86_400));
    }
}
