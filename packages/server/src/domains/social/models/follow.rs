use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::common::entity_ids::UserId;
use crate::kernel::ShardRouter;

/// Follow model - a directed edge in the social graph.
///
/// Rows are owned by the follower's shard. Queries keyed on the followee
/// (who follows X?) therefore fan out over every shard and merge; with one
/// shard they are single queries.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Follow {
    pub follower_id: UserId,
    pub followee_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Follow {
    /// Insert the edge inside the caller's transaction. Idempotent: a
    /// duplicate (follower, followee) pair is a no-op and returns `false`.
    pub async fn insert(&self, tx: &mut Transaction<'_, Postgres>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO follows (follower_id, followee_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (follower_id, followee_id) DO NOTHING
            "#,
        )
        .bind(self.follower_id)
        .bind(self.followee_id)
        .bind(self.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove the edge. Returns whether a row was actually deleted.
    pub async fn delete(
        follower: UserId,
        followee: UserId,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2")
                .bind(follower)
                .bind(followee)
                .execute(&mut **tx)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn exists(follower: UserId, followee: UserId, pool: &PgPool) -> Result<bool> {
        let found = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND followee_id = $2)",
        )
        .bind(follower)
        .bind(followee)
        .fetch_one(pool)
        .await?;

        Ok(found)
    }

    /// Who `user` follows, newest edge first. Cursor is the `created_at` of
    /// the previous page's last element (strict `<`). Single-shard: the
    /// rows live with the follower.
    pub async fn find_following(
        user: UserId,
        cursor: Option<DateTime<Utc>>,
        limit: i64,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let follows = match cursor {
            Some(cursor) => {
                sqlx::query_as::<_, Self>(
                    r#"
                    SELECT * FROM follows
                    WHERE follower_id = $1 AND created_at < $2
                    ORDER BY created_at DESC
                    LIMIT $3
                    "#,
                )
                .bind(user)
                .bind(cursor)
                .bind(limit)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Self>(
                    "SELECT * FROM follows WHERE follower_id = $1 ORDER BY created_at DESC LIMIT $2",
                )
                .bind(user)
                .bind(limit)
                .fetch_all(pool)
                .await?
            }
        };

        Ok(follows)
    }

    /// Who follows `user`, newest edge first. Fans out over every shard and
    /// re-sorts the merged page.
    pub async fn find_followers(
        user: UserId,
        cursor: Option<DateTime<Utc>>,
        limit: i64,
        db: &ShardRouter,
    ) -> Result<Vec<Self>> {
        let mut merged = Vec::new();
        for pool in db.all() {
            let page = match cursor {
                Some(cursor) => {
                    sqlx::query_as::<_, Self>(
                        r#"
                        SELECT * FROM follows
                        WHERE followee_id = $1 AND created_at < $2
                        ORDER BY created_at DESC
                        LIMIT $3
                        "#,
                    )
                    .bind(user)
                    .bind(cursor)
                    .bind(limit)
                    .fetch_all(pool)
                    .await?
                }
                None => {
                    sqlx::query_as::<_, Self>(
                        r#"
                        SELECT * FROM follows
                        WHERE followee_id = $1
                        ORDER BY created_at DESC
                        LIMIT $2
                        "#,
                    )
                    .bind(user)
                    .bind(limit)
                    .fetch_all(pool)
                    .await?
                }
            };
            merged.extend(page);
        }

        merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        merged.truncate(limit as usize);
        Ok(merged)
    }

    /// Every follower id of `user`. Unbounded by design: the caller only
    /// uses it below the celebrity threshold.
    pub async fn find_all_follower_ids(user: UserId, db: &ShardRouter) -> Result<Vec<UserId>> {
        let mut ids = Vec::new();
        for pool in db.all() {
            let found =
                sqlx::query_scalar::<_, UserId>("SELECT follower_id FROM follows WHERE followee_id = $1")
                    .bind(user)
                    .fetch_all(pool)
                    .await?;
            ids.extend(found);
        }

        Ok(ids)
    }

    /// Total followers of `user`, summed across shards.
    pub async fn count_followers(user: UserId, db: &ShardRouter) -> Result<i64> {
        let mut total = 0;
        for pool in db.all() {
            total += sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM follows WHERE followee_id = $1",
            )
            .bind(user)
            .fetch_one(pool)
            .await?;
        }

        Ok(total)
    }

    /// Users that `user` follows whose follower count strictly exceeds
    /// `threshold`. Their posts are merged at read time instead of being
    /// fanned out.
    pub async fn find_followed_celebrities(
        user: UserId,
        threshold: i64,
        db: &ShardRouter,
    ) -> Result<Vec<UserId>> {
        let followees = sqlx::query_scalar::<_, UserId>(
            "SELECT followee_id FROM follows WHERE follower_id = $1",
        )
        .bind(user)
        .fetch_all(db.pool_for(user))
        .await?;

        if followees.is_empty() {
            return Ok(Vec::new());
        }

        let mut counts: HashMap<UserId, i64> = HashMap::new();
        for pool in db.all() {
            let rows = sqlx::query_as::<_, (UserId, i64)>(
                r#"
                SELECT followee_id, COUNT(*)
                FROM follows
                WHERE followee_id = ANY($1)
                GROUP BY followee_id
                "#,
            )
            .bind(&followees)
            .fetch_all(pool)
            .await?;

            for (followee, count) in rows {
                *counts.entry(followee).or_insert(0) += count;
            }
        }

        Ok(followees
            .into_iter()
            .filter(|f| counts.get(f).copied().unwrap_or(0) > threshold)
            .collect())
    }

    /// Count all follow edges across every shard.
    pub async fn count(db: &ShardRouter) -> Result<i64> {
        let mut total = 0;
        for pool in db.all() {
            total += sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows")
                .fetch_one(pool)
                .await?;
        }

        Ok(total)
    }
}
