//! Outbox row model and its SQL surface.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// A row of the `outbox_events` table.
///
/// `processed_at = NULL` means undelivered. Once set it is never cleared;
/// the row becomes a compaction candidate after the retention window.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct OutboxRecord {
    pub id: Uuid,
    pub event_type: String,
    /// Identity of the aggregate the event belongs to; doubles as the
    /// partition key on the message log.
    pub aggregate_id: String,
    pub payload: serde_json::Value,
    pub request_id: String,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl OutboxRecord {
    /// Append an event inside the caller's transaction.
    ///
    /// Must share the transaction of the business write it describes; that
    /// is the whole point of the pattern.
    pub async fn append(
        tx: &mut Transaction<'_, Postgres>,
        event_type: &str,
        aggregate_id: &str,
        payload: serde_json::Value,
        request_id: &str,
    ) -> Result<Self> {
        let record = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO outbox_events (id, event_type, aggregate_id, payload, request_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, event_type, aggregate_id, payload, request_id, created_at, processed_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(event_type)
        .bind(aggregate_id)
        .bind(payload)
        .bind(request_id)
        .fetch_one(&mut **tx)
        .await?;

        tracing::debug!(
            event_id = %record.id,
            event_type = %record.event_type,
            aggregate_id = %record.aggregate_id,
            "Event appended to outbox"
        );

        Ok(record)
    }

    /// Claim up to `limit` unprocessed rows, oldest first.
    ///
    /// Uses `FOR UPDATE SKIP LOCKED` so parallel dispatchers partition the
    /// backlog instead of serializing on it. Claims hold until the caller's
    /// transaction commits or rolls back.
    pub async fn claim_batch(
        tx: &mut Transaction<'_, Postgres>,
        limit: i64,
    ) -> Result<Vec<Self>> {
        let records = sqlx::query_as::<_, Self>(
            r#"
            SELECT id, event_type, aggregate_id, payload, request_id, created_at, processed_at
            FROM outbox_events
            WHERE processed_at IS NULL
            ORDER BY created_at ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(limit)
        .fetch_all(&mut **tx)
        .await?;

        Ok(records)
    }

    /// Mark a claimed batch as processed. Never un-set.
    pub async fn mark_processed(
        tx: &mut Transaction<'_, Postgres>,
        ids: &[Uuid],
    ) -> Result<()> {
        sqlx::query("UPDATE outbox_events SET processed_at = NOW() WHERE id = ANY($1)")
            .bind(ids)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Delete processed rows older than `cutoff`. Returns rows removed.
    pub async fn compact_processed_older_than(
        pool: &PgPool,
        cutoff: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM outbox_events WHERE processed_at IS NOT NULL AND processed_at < $1",
        )
        .bind(cutoff)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Number of rows still awaiting dispatch.
    pub async fn count_pending(pool: &PgPool) -> Result<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM outbox_events WHERE processed_at IS NULL")
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}
