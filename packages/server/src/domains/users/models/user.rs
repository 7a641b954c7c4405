use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};

use crate::common::entity_ids::UserId;
use crate::kernel::ShardRouter;

/// User model - placeholder identity rows.
///
/// A user exists as soon as anything references them: their first post, or
/// the first time somebody follows them. There is no profile data; identity
/// arrives validated from the edge.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Insert the user row if it does not exist. Idempotent on the primary
    /// key; safe to call from every write path that touches the user.
    /// Accepts a pool or an open transaction.
    pub async fn upsert_if_absent<'e>(id: UserId, executor: impl PgExecutor<'e>) -> Result<()> {
        sqlx::query("INSERT INTO users (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn exists(id: UserId, pool: &PgPool) -> Result<bool> {
        let found = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await?;

        Ok(found)
    }

    /// Count all users across every shard.
    pub async fn count(db: &ShardRouter) -> Result<i64> {
        let mut total = 0;
        for pool in db.all() {
            total += sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
                .fetch_one(pool)
                .await?;
        }

        Ok(total)
    }
}
