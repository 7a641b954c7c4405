//! Follow-graph listing queries.

use anyhow::Result;

use crate::common::entity_ids::UserId;
use crate::common::pagination::{decode_time_cursor, trim_results};
use crate::domains::social::models::Follow;
use crate::kernel::ServerKernel;

/// One page of users that `user` follows, newest edge first. The cursor is
/// the ISO-8601 `createdAt` of the previous page's last element.
pub async fn list_following(
    user: UserId,
    cursor: Option<&str>,
    limit: i64,
    kernel: &ServerKernel,
) -> Result<(Vec<Follow>, bool)> {
    let cursor = decode_time_cursor(cursor);
    let follows =
        Follow::find_following(user, cursor, limit + 1, kernel.db.pool_for(user)).await?;
    Ok(trim_results(follows, limit as usize))
}

/// One page of users following `user`, newest edge first.
pub async fn list_followers(
    user: UserId,
    cursor: Option<&str>,
    limit: i64,
    kernel: &ServerKernel,
) -> Result<(Vec<Follow>, bool)> {
    let cursor = decode_time_cursor(cursor);
    let follows = Follow::find_followers(user, cursor, limit + 1, &kernel.db).await?;
    Ok(trim_results(follows, limit as usize))
}
