//! Timeline materializer: the event consumer that maintains per-reader
//! sorted timelines.
//!
//! Applies the hybrid fan-out policy:
//!
//! - `POST_CREATED` below the celebrity threshold fans the post out into
//!   every follower's cache (fan-out on write). At or above the threshold
//!   the event is a no-op — celebrity posts are merged at read time.
//! - `USER_FOLLOWED` backfills the follower's cache with the followee's
//!   recent posts, celebrities included; one bounded backfill per follow is
//!   cheap where recurring fan-out is not.
//! - `USER_UNFOLLOWED` purges the followee's recent-posts window from the
//!   follower's cache.
//!
//! Every handler is idempotent under at-least-once delivery: sorted-set add
//! with an unchanged score and remove of an absent member are both no-ops.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::{debug, error, info};

use txoutbox::EventEnvelope;

use crate::common::entity_ids::PostId;
use crate::common::RequestContext;
use crate::domains::events::{
    FollowChangedPayload, PostCreatedPayload, POST_CREATED, USER_FOLLOWED, USER_UNFOLLOWED,
};
use crate::domains::posts::models::Post;
use crate::domains::social::models::Follow;
use crate::kernel::event_log::EventHandler;
use crate::kernel::ServerKernel;

pub struct Materializer {
    kernel: Arc<ServerKernel>,
}

impl Materializer {
    pub fn new(kernel: Arc<ServerKernel>) -> Self {
        Self { kernel }
    }

    /// Apply one event. Callers decide the failure policy; the
    /// [`EventHandler`] impl below logs and continues.
    pub async fn apply(&self, envelope: &EventEnvelope) -> Result<()> {
        // Context recovered from the message headers, not from any
        // task-local state.
        let ctx = RequestContext::from_event(envelope.request_id.clone());

        match envelope.event_type.as_str() {
            POST_CREATED => {
                let payload: PostCreatedPayload = serde_json::from_value(envelope.payload.clone())?;
                self.on_post_created(payload, &ctx).await
            }
            USER_FOLLOWED => {
                let payload: FollowChangedPayload =
                    serde_json::from_value(envelope.payload.clone())?;
                self.on_user_followed(payload, &ctx).await
            }
            USER_UNFOLLOWED => {
                let payload: FollowChangedPayload =
                    serde_json::from_value(envelope.payload.clone())?;
                self.on_user_unfollowed(payload, &ctx).await
            }
            other => Err(anyhow!("unknown event type {other:?}")),
        }
    }

    async fn on_post_created(
        &self,
        payload: PostCreatedPayload,
        ctx: &RequestContext,
    ) -> Result<()> {
        let author = payload.user_id.value;
        let post_id = payload.tweet_id;
        // The id's embedded timestamp is the canonical order key, even when
        // clock skew makes it disagree with the stored created_at.
        let score = post_id.timestamp_ms();

        let follower_count = Follow::count_followers(author, &self.kernel.db).await?;
        if follower_count > self.kernel.config.celebrity_follower_threshold {
            info!(
                author = %author,
                post_id = %post_id,
                follower_count,
                request_id = %ctx.request_id,
                "Author above celebrity threshold; post will be read on demand"
            );
            return Ok(());
        }

        let followers = Follow::find_all_follower_ids(author, &self.kernel.db).await?;
        let fanned_out = followers.len();
        for follower in followers {
            self.kernel.cache.add(follower, post_id, score).await?;
        }

        debug!(
            author = %author,
            post_id = %post_id,
            fanned_out,
            request_id = %ctx.request_id,
            "Post fanned out to follower timelines"
        );

        Ok(())
    }

    async fn on_user_followed(
        &self,
        payload: FollowChangedPayload,
        ctx: &RequestContext,
    ) -> Result<()> {
        let follower = payload.follower_id.value;
        let followee = payload.followee_id.value;

        let recent = Post::find_by_author_latest(
            followee,
            self.kernel.config.timeline_max_size,
            self.kernel.db.pool_for(followee),
        )
        .await?;

        let entries: Vec<(PostId, i64)> =
            recent.iter().map(|p| (p.id, p.id.timestamp_ms())).collect();
        self.kernel.cache.add_many(follower, &entries).await?;

        debug!(
            follower = %follower,
            followee = %followee,
            backfilled = entries.len(),
            request_id = %ctx.request_id,
            "Backfilled timeline on follow"
        );

        Ok(())
    }

    async fn on_user_unfollowed(
        &self,
        payload: FollowChangedPayload,
        ctx: &RequestContext,
    ) -> Result<()> {
        let follower = payload.follower_id.value;
        let followee = payload.followee_id.value;

        // The same bounded window the backfill used; anything the
        // materializer ever wrote for this author sits inside it.
        let recent = Post::find_by_author_latest(
            followee,
            self.kernel.config.timeline_max_size,
            self.kernel.db.pool_for(followee),
        )
        .await?;

        let ids: Vec<PostId> = recent.iter().map(|p| p.id).collect();
        self.kernel.cache.remove_many(follower, &ids).await?;

        debug!(
            follower = %follower,
            followee = %followee,
            purged = ids.len(),
            request_id = %ctx.request_id,
            "Purged timeline on unfollow"
        );

        Ok(())
    }
}

#[async_trait]
impl EventHandler for Materializer {
    /// Log-and-continue failure policy: a poisoned event must not halt the
    /// partition. The cache is reconstructible from relational truth, so a
    /// lost event degrades freshness, not correctness.
    async fn handle(&self, envelope: EventEnvelope) {
        if let Err(e) = self.apply(&envelope).await {
            error!(
                event_id = %envelope.event_id,
                event_type = %envelope.event_type,
                key = %envelope.key,
                request_id = %envelope.request_id,
                error = %e,
                "Event handler failed; skipping event"
            );
        }
    }
}
