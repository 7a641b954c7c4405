//! Publisher contract between the dispatcher and the message log.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::record::OutboxRecord;

/// One event as it travels on the message log.
///
/// `key` is the aggregate identity. The log's partitioner must be a
/// deterministic function of the key so that all events of one aggregate
/// land on one partition and are consumed in publish order.
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub event_type: String,
    pub key: String,
    pub payload: serde_json::Value,
    pub request_id: String,
}

impl EventEnvelope {
    pub fn from_record(record: &OutboxRecord) -> Self {
        Self {
            event_id: record.id,
            event_type: record.event_type.clone(),
            key: record.aggregate_id.clone(),
            payload: record.payload.clone(),
            request_id: record.request_id.clone(),
        }
    }
}

/// Sink the dispatcher publishes claimed records into.
///
/// Implementations must tolerate redelivery: the dispatcher may publish the
/// same record twice if it crashes before committing the processed mark.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<()>;
}
