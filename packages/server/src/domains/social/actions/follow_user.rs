//! Follow / unfollow commands with their outbox events.

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::common::entity_ids::UserId;
use crate::common::RequestContext;
use crate::domains::events::{DomainEvent, FollowChangedPayload};
use crate::domains::social::models::Follow;
use crate::domains::users::models::User;
use crate::kernel::ServerKernel;

#[derive(Error, Debug)]
pub enum FollowError {
    #[error("a user cannot follow themselves")]
    SelfFollow,

    #[error("already following this user")]
    AlreadyFollowing,

    #[error("not following this user")]
    NotFollowing,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Create the follow edge and its `USER_FOLLOWED` outbox record in one
/// transaction on the follower's shard.
pub async fn follow(
    follower: UserId,
    followee: UserId,
    ctx: &RequestContext,
    kernel: &ServerKernel,
) -> Result<Follow, FollowError> {
    if follower == followee {
        return Err(FollowError::SelfFollow);
    }

    // A user can be followed before they ever post, so the followee gets a
    // placeholder row on its own shard first. Idempotent, safe to redo if
    // the transaction below fails.
    if kernel.db.shard_for(followee) != kernel.db.shard_for(follower) {
        User::upsert_if_absent(followee, kernel.db.pool_for(followee)).await?;
    }

    let edge = Follow {
        follower_id: follower,
        followee_id: followee,
        created_at: Utc::now(),
    };

    let mut tx = kernel.db.pool_for(follower).begin().await?;

    User::upsert_if_absent(follower, &mut *tx).await?;
    // Local row too, so the edge's foreign key holds on this shard.
    User::upsert_if_absent(followee, &mut *tx).await?;

    // The idempotent insert doubles as the existence check; losing the race
    // to a concurrent identical follow reports AlreadyFollowing.
    if !edge.insert(&mut tx).await? {
        tx.rollback().await?;
        return Err(FollowError::AlreadyFollowing);
    }

    DomainEvent::UserFollowed(FollowChangedPayload {
        follower_id: follower.into(),
        followee_id: followee.into(),
    })
    .append_to_outbox(&mut tx, &ctx.request_id)
    .await?;

    tx.commit().await?;

    info!(follower = %follower, followee = %followee, "Follow created");

    Ok(edge)
}

/// Delete the follow edge and append `USER_UNFOLLOWED`, atomically.
pub async fn unfollow(
    follower: UserId,
    followee: UserId,
    ctx: &RequestContext,
    kernel: &ServerKernel,
) -> Result<(), FollowError> {
    if follower == followee {
        return Err(FollowError::SelfFollow);
    }

    let mut tx = kernel.db.pool_for(follower).begin().await?;

    if !Follow::delete(follower, followee, &mut tx).await? {
        tx.rollback().await?;
        return Err(FollowError::NotFollowing);
    }

    DomainEvent::UserUnfollowed(FollowChangedPayload {
        follower_id: follower.into(),
        followee_id: followee.into(),
    })
    .append_to_outbox(&mut tx, &ctx.request_id)
    .await?;

    tx.commit().await?;

    info!(follower = %follower, followee = %followee, "Follow removed");

    Ok(())
}
