//! Message-log implementations behind the dispatcher's publisher contract.
//!
//! Two implementations of [`EventPublisher`]:
//!
//! - [`KafkaEventLog`] — production. One topic, key = aggregate id; Kafka's
//!   key partitioner keeps all events of one aggregate on one partition, in
//!   publish order.
//! - [`InMemoryEventLog`] — tests and single-node runs. Hash-partitioned
//!   ordered channels with one consumer task per partition, preserving the
//!   same per-key ordering guarantee without a broker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use tokio::sync::mpsc;

use txoutbox::{EventEnvelope, EventPublisher};

use super::shard::fnv1a_64;

/// Consumes envelopes off the log. Implementations must be idempotent and
/// must not propagate per-event failures: a poisoned message is logged and
/// the partition advances.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle(&self, envelope: EventEnvelope);
}

// =============================================================================
// Kafka
// =============================================================================

pub struct KafkaEventLog {
    producer: FutureProducer,
    topic: String,
}

impl KafkaEventLog {
    /// Producer configured for idempotent, fully-acked sends; required so a
    /// dispatcher retry cannot reorder an aggregate's events.
    pub fn new(brokers: &str, topic: &str) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("message.timeout.ms", "30000")
            .create()
            .context("Failed to create Kafka producer")?;

        Ok(Self {
            producer,
            topic: topic.to_string(),
        })
    }
}

#[async_trait]
impl EventPublisher for KafkaEventLog {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload =
            serde_json::to_string(&envelope.payload).context("Failed to serialize event payload")?;
        let event_id = envelope.event_id.to_string();

        let headers = OwnedHeaders::new()
            .insert(Header {
                key: "eventType",
                value: Some(envelope.event_type.as_bytes()),
            })
            .insert(Header {
                key: "eventId",
                value: Some(event_id.as_bytes()),
            })
            .insert(Header {
                key: "requestId",
                value: Some(envelope.request_id.as_bytes()),
            });

        let record = FutureRecord::to(&self.topic)
            .key(&envelope.key)
            .payload(&payload)
            .headers(headers);

        self.producer
            .send(record, Duration::from_secs(30))
            .await
            .map_err(|(err, _)| anyhow!("Kafka publish failed: {err}"))?;

        tracing::debug!(
            event_id = %envelope.event_id,
            event_type = %envelope.event_type,
            key = %envelope.key,
            topic = %self.topic,
            "Event published to log"
        );

        Ok(())
    }
}

// =============================================================================
// In-memory partitioned log
// =============================================================================

/// Hash-partitioned in-process log.
///
/// `partition = fnv1a(key) % N`; each partition is an ordered channel
/// drained by a dedicated consumer task, so per-key order holds while
/// partitions run in parallel — the same shape as the Kafka deployment.
pub struct InMemoryEventLog {
    senders: Vec<mpsc::UnboundedSender<EventEnvelope>>,
    in_flight: Arc<AtomicUsize>,
}

impl InMemoryEventLog {
    /// Start `partition_count` consumer tasks feeding `handler`.
    pub fn start(partition_count: usize, handler: Arc<dyn EventHandler>) -> Self {
        assert!(partition_count > 0, "log needs at least one partition");

        let in_flight = Arc::new(AtomicUsize::new(0));
        let mut senders = Vec::with_capacity(partition_count);

        for partition in 0..partition_count {
            let (tx, mut rx) = mpsc::unbounded_channel::<EventEnvelope>();
            senders.push(tx);

            let handler = handler.clone();
            let in_flight = in_flight.clone();
            tokio::spawn(async move {
                while let Some(envelope) = rx.recv().await {
                    tracing::trace!(
                        partition,
                        event_type = %envelope.event_type,
                        key = %envelope.key,
                        "Consuming event"
                    );
                    handler.handle(envelope).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                }
            });
        }

        Self { senders, in_flight }
    }

    fn partition_for(&self, key: &str) -> usize {
        (fnv1a_64(key.as_bytes()) % self.senders.len() as u64) as usize
    }

    /// Wait until every published event has been handled. Test settling.
    pub async fn drain(&self) {
        while self.in_flight.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventLog {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<()> {
        let partition = self.partition_for(&envelope.key);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.senders[partition]
            .send(envelope.clone())
            .map_err(|_| {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                anyhow!("log partition {partition} is closed")
            })?;
        Ok(())
    }
}
