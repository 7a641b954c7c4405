use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::common::entity_ids::{PostId, UserId};
use crate::kernel::ShardRouter;

/// Post model - SQL persistence layer (table `tweets`).
///
/// Posts are immutable: created once inside the write transaction, never
/// updated, never deleted by the core. The v7 id is the canonical
/// chronological key; `created_at` is response metadata.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Post {
    pub id: PostId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Insert inside the caller's write transaction.
    pub async fn insert(&self, tx: &mut Transaction<'_, Postgres>) -> Result<()> {
        sqlx::query(
            "INSERT INTO tweets (id, user_id, content, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(self.id)
        .bind(self.user_id)
        .bind(&self.content)
        .bind(self.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn find_by_id(id: PostId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM tweets WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// An author's history, id descending, keyset-paginated: a cursor of
    /// `c` yields posts with `id < c`.
    pub async fn find_by_author(
        author: UserId,
        cursor: Option<PostId>,
        limit: i64,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let posts = match cursor {
            Some(cursor) => {
                sqlx::query_as::<_, Self>(
                    "SELECT * FROM tweets WHERE user_id = $1 AND id < $2 ORDER BY id DESC LIMIT $3",
                )
                .bind(author)
                .bind(cursor)
                .bind(limit)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Self>(
                    "SELECT * FROM tweets WHERE user_id = $1 ORDER BY id DESC LIMIT $2",
                )
                .bind(author)
                .bind(limit)
                .fetch_all(pool)
                .await?
            }
        };

        Ok(posts)
    }

    /// The author's newest `limit` posts (backfill, purge window, celebrity
    /// read path).
    pub async fn find_by_author_latest(author: UserId, limit: i64, pool: &PgPool) -> Result<Vec<Self>> {
        Self::find_by_author(author, None, limit, pool).await
    }

    /// Hydrate a set of ids into posts. Preserves no particular order; ids
    /// may span authors, so the lookup fans out over every shard.
    pub async fn find_by_ids(ids: &[PostId], db: &ShardRouter) -> Result<Vec<Self>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut posts = Vec::with_capacity(ids.len());
        for pool in db.all() {
            let found = sqlx::query_as::<_, Self>("SELECT * FROM tweets WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(pool)
                .await?;
            posts.extend(found);
        }

        Ok(posts)
    }

    /// Count all posts across every shard.
    pub async fn count(db: &ShardRouter) -> Result<i64> {
        let mut total = 0;
        for pool in db.all() {
            total += sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tweets")
                .fetch_one(pool)
                .await?;
        }

        Ok(total)
    }
}
