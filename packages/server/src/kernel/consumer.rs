//! Kafka consumer loop feeding the timeline materializer.
//!
//! One `StreamConsumer` per process, joined into a consumer group. Messages
//! are handled sequentially in arrival order, which preserves each
//! partition's order; horizontal parallelism comes from running more
//! instances in the group. Offsets are committed only after the handler
//! returns, so a crash replays the tail — handlers are idempotent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Headers, Message};
use tracing::{error, info, warn};
use uuid::Uuid;

use txoutbox::EventEnvelope;

use super::event_log::EventHandler;
use crate::config::Config;

/// Build the group consumer from configuration.
pub fn build_consumer(config: &Config) -> Result<StreamConsumer> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &config.kafka_brokers)
        .set("group.id", &config.kafka_group_id)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .create()
        .context("Failed to create Kafka consumer")?;

    consumer
        .subscribe(&[&config.kafka_topic])
        .context("Failed to subscribe to topic")?;

    Ok(consumer)
}

/// Consume until shutdown is signalled.
///
/// Handler failures never stop the loop; the handler itself is responsible
/// for logging and swallowing per-event errors so the partition advances.
pub async fn run_consumer(
    consumer: StreamConsumer,
    handler: Arc<dyn EventHandler>,
    shutdown: Arc<AtomicBool>,
) {
    info!("Timeline event consumer starting");

    loop {
        if shutdown.load(Ordering::SeqCst) {
            info!("Timeline event consumer shutting down");
            return;
        }

        // Bounded recv so the shutdown flag is observed even on an idle
        // partition assignment.
        let message = match tokio::time::timeout(Duration::from_secs(1), consumer.recv()).await {
            Err(_) => continue,
            Ok(Err(e)) => {
                error!(error = %e, "Kafka receive failed");
                continue;
            }
            Ok(Ok(m)) => m,
        };

        let envelope = match envelope_from_message(&message) {
            Ok(envelope) => envelope,
            Err(e) => {
                // Undecodable messages are skipped, not retried forever.
                warn!(error = %e, offset = message.offset(), "Discarding undecodable message");
                let _ = consumer.commit_message(&message, CommitMode::Async);
                continue;
            }
        };

        handler.handle(envelope).await;

        if let Err(e) = consumer.commit_message(&message, CommitMode::Async) {
            error!(error = %e, offset = message.offset(), "Offset commit failed");
        }
    }
}

fn envelope_from_message(message: &BorrowedMessage<'_>) -> Result<EventEnvelope> {
    let key = message
        .key()
        .map(|k| String::from_utf8_lossy(k).into_owned())
        .unwrap_or_default();

    let payload: serde_json::Value = serde_json::from_slice(
        message.payload().context("Message has no payload")?,
    )
    .context("Payload is not valid JSON")?;

    let mut event_type = String::new();
    let mut event_id = Uuid::nil();
    let mut request_id = String::new();

    if let Some(headers) = message.headers() {
        for header in headers.iter() {
            let Some(value) = header.value else { continue };
            match header.key {
                "eventType" => event_type = String::from_utf8_lossy(value).into_owned(),
                "eventId" => {
                    event_id = std::str::from_utf8(value)
                        .ok()
                        .and_then(|s| Uuid::parse_str(s).ok())
                        .unwrap_or_else(Uuid::nil);
                }
                "requestId" => request_id = String::from_utf8_lossy(value).into_owned(),
                _ => {}
            }
        }
    }

    Ok(EventEnvelope {
        event_id,
        event_type,
        key,
        payload,
        request_id,
    })
}
