//! Transactional outbox for same-transaction event persistence.
//!
//! Writes that must be observable as events append a row to the
//! `outbox_events` table inside the same database transaction as the
//! business mutation. A background dispatcher drains unprocessed rows and
//! hands them to an [`EventPublisher`], keyed by aggregate so a partitioned
//! log preserves per-aggregate order.
//!
//! # Guarantees
//!
//! - **Same-transaction durability**: an event survives iff the business
//!   write survives.
//! - **At-least-once delivery**: a crash between publish and commit causes
//!   the same rows to be reclaimed on the next tick. Consumers must be
//!   idempotent.
//! - **Multi-instance safe**: claims use `FOR UPDATE SKIP LOCKED`, so
//!   concurrent dispatchers share the queue without blocking or double
//!   delivery.
//!
//! # Lifecycle
//!
//! `NEW -> CLAIMED -> PUBLISHED -> PROCESSED -> (retention) -> COMPACTED`
//!
//! Rows enter CLAIMED via the skip-locked select, PUBLISHED by the send to
//! the log, PROCESSED when `processed_at` is set and the claiming
//! transaction commits. A periodic sweep deletes processed rows older than
//! the retention window.

pub mod dispatcher;
pub mod publisher;
pub mod record;

pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use publisher::{EventEnvelope, EventPublisher};
pub use record::OutboxRecord;
