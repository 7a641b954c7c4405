//! Materialized timeline storage: one Redis sorted set per reader.
//!
//! Members are canonical post-id strings; the score is the millisecond
//! timestamp embedded in the post id. Sorted-set semantics give the two
//! properties the pipeline leans on:
//!
//! - `ZADD` with an unchanged (member, score) pair is a no-op, so
//!   at-least-once redelivery is free.
//! - Equal scores order by member, and v7 id strings compare
//!   chronologically, so same-millisecond posts still read in id order.
//!
//! Every write trims the set to the configured cap in the same pipeline;
//! readers can rely on `|timeline| <= max_size` at all times.

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::common::entity_ids::{PostId, UserId};

#[derive(Clone)]
pub struct TimelineCache {
    conn: ConnectionManager,
    max_size: i64,
}

impl TimelineCache {
    pub async fn connect(redis_url: &str, max_size: i64) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("Invalid Redis URL")?;
        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;
        Ok(Self { conn, max_size })
    }

    pub fn max_size(&self) -> i64 {
        self.max_size
    }

    fn key(reader: UserId) -> String {
        format!("timeline:{reader}")
    }

    /// Add one entry and trim to the cap.
    pub async fn add(&self, reader: UserId, post: PostId, score: i64) -> Result<()> {
        let key = Self::key(reader);
        let mut conn = self.conn.clone();

        redis::pipe()
            .atomic()
            .zadd(&key, post.to_string(), score)
            .ignore()
            .zremrangebyrank(&key, 0, -(self.max_size as isize + 1))
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .context("Timeline cache add failed")?;

        Ok(())
    }

    /// Add a batch of entries (backfill) and trim to the cap.
    pub async fn add_many(&self, reader: UserId, entries: &[(PostId, i64)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let key = Self::key(reader);
        let mut conn = self.conn.clone();
        let items: Vec<(i64, String)> = entries
            .iter()
            .map(|(post, score)| (*score, post.to_string()))
            .collect();

        redis::pipe()
            .atomic()
            .zadd_multiple(&key, &items)
            .ignore()
            .zremrangebyrank(&key, 0, -(self.max_size as isize + 1))
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .context("Timeline cache batch add failed")?;

        Ok(())
    }

    /// Remove one entry; removing an absent member is a no-op.
    pub async fn remove(&self, reader: UserId, post: PostId) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .zrem(Self::key(reader), post.to_string())
            .await
            .context("Timeline cache remove failed")?;
        Ok(())
    }

    /// Remove a batch of entries (unfollow purge).
    pub async fn remove_many(&self, reader: UserId, posts: &[PostId]) -> Result<()> {
        if posts.is_empty() {
            return Ok(());
        }

        let members: Vec<String> = posts.iter().map(|p| p.to_string()).collect();
        let mut conn = self.conn.clone();
        let _: () = conn
            .zrem(Self::key(reader), members)
            .await
            .context("Timeline cache batch remove failed")?;
        Ok(())
    }

    /// Read up to `limit` post ids, score descending, below an exclusive
    /// upper bound when one is given.
    pub async fn range(
        &self,
        reader: UserId,
        max_score_exclusive: Option<i64>,
        limit: i64,
    ) -> Result<Vec<PostId>> {
        let max = match max_score_exclusive {
            Some(score) => format!("({score}"),
            None => "+inf".to_string(),
        };

        let mut conn = self.conn.clone();
        let members: Vec<String> = conn
            .zrevrangebyscore_limit(Self::key(reader), max, "-inf", 0, limit as isize)
            .await
            .context("Timeline cache range failed")?;

        // Entries that fail to parse would have to have been written by
        // something other than the materializer; skip them.
        Ok(members
            .iter()
            .filter_map(|m| PostId::parse(m).ok())
            .collect())
    }

    /// Drop everything below the newest `max_size` entries.
    pub async fn trim(&self, reader: UserId, max_size: i64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .zremrangebyrank(Self::key(reader), 0, -(max_size as isize + 1))
            .await
            .context("Timeline cache trim failed")?;
        Ok(())
    }

    /// Current entry count for one reader.
    pub async fn size(&self, reader: UserId) -> Result<i64> {
        let mut conn = self.conn.clone();
        let count: i64 = conn
            .zcard(Self::key(reader))
            .await
            .context("Timeline cache size failed")?;
        Ok(count)
    }

    /// Liveness probe for the health endpoint.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .context("Redis ping failed")?;
        Ok(())
    }

    /// Wipe the entire cache database. Admin reset only.
    pub async fn flush_all(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("FLUSHDB")
            .query_async::<_, ()>(&mut conn)
            .await
            .context("Timeline cache flush failed")?;
        Ok(())
    }
}
