//! Request and response bodies for the v1 API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::entity_ids::{PostId, UserId};
use crate::domains::posts::models::Post;
use crate::domains::social::models::Follow;

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
}

/// Query string shared by every paginated listing.
#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: PostId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            user_id: post.user_id,
            content: post.content,
            created_at: post.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    pub follower_id: UserId,
    pub followee_id: UserId,
    pub followed_at: DateTime<Utc>,
}

impl From<Follow> for FollowResponse {
    fn from(follow: Follow) -> Self {
        Self {
            follower_id: follow.follower_id,
            followee_id: follow.followee_id,
            followed_at: follow.created_at,
        }
    }
}

/// One row of a following/followers page: the other end of the edge plus
/// when the edge was created.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowEdgeEntry {
    pub user_id: UserId,
    pub followed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub users: i64,
    pub tweets: i64,
    pub follows: i64,
    pub outbox_pending: i64,
}
