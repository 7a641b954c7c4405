//! Outbox lifecycle: skip-locked claims, crash-replay semantics, and
//! compaction.

mod common;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use common::TestHarness;
use server_core::domains::posts::actions::create_post;
use test_context::test_context;
use tokio::sync::Mutex;
use txoutbox::{Dispatcher, EventEnvelope, EventPublisher, OutboxRecord};
use uuid::Uuid;

/// Publisher that records every envelope it sees.
#[derive(Default)]
struct RecordingPublisher {
    seen: Mutex<Vec<Uuid>>,
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<()> {
        self.seen.lock().await.push(envelope.event_id);
        Ok(())
    }
}

/// Publisher that always fails, simulating a dead broker.
struct FailingPublisher;

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn publish(&self, _envelope: &EventEnvelope) -> Result<()> {
        Err(anyhow!("broker unavailable"))
    }
}

#[test_context(TestHarness)]
#[tokio::test]
async fn records_move_from_pending_to_processed(ctx: &mut TestHarness) {
    let author = ctx.user();
    create_post(author, "event one", &ctx.ctx(), &ctx.kernel).await.unwrap();
    create_post(author, "event two", &ctx.ctx(), &ctx.kernel).await.unwrap();

    assert_eq!(OutboxRecord::count_pending(&ctx.db_pool).await.unwrap(), 2);

    let dispatched = ctx.dispatcher.tick().await.unwrap();
    assert_eq!(dispatched, 2);
    assert_eq!(OutboxRecord::count_pending(&ctx.db_pool).await.unwrap(), 0);

    // processed_at is set and never cleared.
    let unprocessed: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM outbox_events WHERE processed_at IS NULL")
            .fetch_one(&ctx.db_pool)
            .await
            .unwrap();
    assert_eq!(unprocessed, 0);

    ctx.log.drain().await;
}

#[test_context(TestHarness)]
#[tokio::test]
async fn publish_failure_rolls_the_claim_back(ctx: &mut TestHarness) {
    let author = ctx.user();
    create_post(author, "must not be lost", &ctx.ctx(), &ctx.kernel)
        .await
        .unwrap();

    let failing = Dispatcher::new(
        ctx.db_pool.clone(),
        Arc::new(FailingPublisher),
        ctx.kernel.config.dispatcher_config(),
    );
    assert!(failing.tick().await.is_err());

    // The claim rolled back: the record is still pending for the next tick.
    assert_eq!(OutboxRecord::count_pending(&ctx.db_pool).await.unwrap(), 1);

    // A healthy tick then delivers it exactly as if nothing had happened.
    let dispatched = ctx.dispatcher.tick().await.unwrap();
    assert_eq!(dispatched, 1);
    assert_eq!(OutboxRecord::count_pending(&ctx.db_pool).await.unwrap(), 0);
    ctx.log.drain().await;
}

#[test_context(TestHarness)]
#[tokio::test]
async fn concurrent_dispatchers_share_without_duplicates(ctx: &mut TestHarness) {
    let author = ctx.user();
    for i in 0..10 {
        create_post(author, &format!("event {i}"), &ctx.ctx(), &ctx.kernel)
            .await
            .unwrap();
    }

    let publisher = Arc::new(RecordingPublisher::default());
    let config = txoutbox::DispatcherConfig {
        batch_size: 3,
        ..ctx.kernel.config.dispatcher_config()
    };
    let d1 = Dispatcher::new(ctx.db_pool.clone(), publisher.clone(), config.clone());
    let d2 = Dispatcher::new(ctx.db_pool.clone(), publisher.clone(), config);

    // Tick both until the backlog is drained. Skip-locked claims mean the
    // two dispatchers partition the queue instead of re-delivering.
    loop {
        let (a, b) = tokio::join!(d1.tick(), d2.tick());
        if a.unwrap() == 0 && b.unwrap() == 0 {
            break;
        }
    }

    let seen = publisher.seen.lock().await;
    assert_eq!(seen.len(), 10, "every event delivered exactly once");
    let unique: std::collections::HashSet<_> = seen.iter().collect();
    assert_eq!(unique.len(), 10, "no event delivered twice");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn ordering_follows_created_at_within_an_aggregate(ctx: &mut TestHarness) {
    let author = ctx.user();
    for i in 0..5 {
        create_post(author, &format!("event {i}"), &ctx.ctx(), &ctx.kernel)
            .await
            .unwrap();
    }

    let publisher = Arc::new(RecordingPublisher::default());
    let dispatcher = Dispatcher::new(
        ctx.db_pool.clone(),
        publisher.clone(),
        ctx.kernel.config.dispatcher_config(),
    );
    dispatcher.tick().await.unwrap();

    // Outbox ids are v7: created order equals id order. Publishing must
    // have preserved it.
    let seen = publisher.seen.lock().await;
    let mut sorted = seen.clone();
    sorted.sort();
    assert_eq!(*seen, sorted);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn compaction_removes_only_old_processed_records(ctx: &mut TestHarness) {
    let author = ctx.user();
    create_post(author, "old", &ctx.ctx(), &ctx.kernel).await.unwrap();
    ctx.dispatcher.tick().await.unwrap();
    ctx.log.drain().await;

    create_post(author, "still pending", &ctx.ctx(), &ctx.kernel)
        .await
        .unwrap();

    // Age the processed record past the 24h retention window.
    sqlx::query(
        "UPDATE outbox_events SET processed_at = NOW() - INTERVAL '25 hours' WHERE processed_at IS NOT NULL",
    )
    .execute(&ctx.db_pool)
    .await
    .unwrap();

    let removed = ctx.dispatcher.compact().await.unwrap();
    assert_eq!(removed, 1);

    // The pending record survived.
    assert_eq!(OutboxRecord::count_pending(&ctx.db_pool).await.unwrap(), 1);
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM outbox_events")
        .fetch_one(&ctx.db_pool)
        .await
        .unwrap();
    assert_eq!(total, 1);

    ctx.drive().await.unwrap();
}
