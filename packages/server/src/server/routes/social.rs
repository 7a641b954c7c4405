//! Follow-graph endpoints: follow, unfollow, and both edge listings.

use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::Json;

use crate::common::context::RequestContext;
use crate::common::entity_ids::UserId;
use crate::common::pagination::{clamp_limit, encode_time_cursor, Page};
use crate::domains::social::actions::{follow, list_followers, list_following, unfollow};
use crate::server::app::AppState;
use crate::server::dto::{FollowEdgeEntry, FollowResponse, PageQuery};
use crate::server::error::{require_self, ApiError};

fn parse_pair(
    id: &str,
    target: &str,
    request_id: &str,
) -> Result<(UserId, UserId), ApiError> {
    let id = UserId::parse(id).map_err(|e| ApiError::bad_user_id(e, request_id))?;
    let target = UserId::parse(target).map_err(|e| ApiError::bad_user_id(e, request_id))?;
    Ok((id, target))
}

/// POST /api/v1/users/{id}/follow/{target}
pub async fn follow_handler(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((id, target)): Path<(String, String)>,
) -> Result<(StatusCode, Json<FollowResponse>), ApiError> {
    let (id, target) = parse_pair(&id, &target, &ctx.request_id)?;
    let caller = require_self(&ctx, id)?;

    let edge = follow(caller, target, &ctx, &state.kernel)
        .await
        .map_err(|e| ApiError::from_follow(e, &ctx.request_id))?;

    Ok((StatusCode::CREATED, Json(edge.into())))
}

/// DELETE /api/v1/users/{id}/follow/{target}
pub async fn unfollow_handler(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((id, target)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (id, target) = parse_pair(&id, &target, &ctx.request_id)?;
    let caller = require_self(&ctx, id)?;

    unfollow(caller, target, &ctx, &state.kernel)
        .await
        .map_err(|e| ApiError::from_follow(e, &ctx.request_id))?;

    Ok(Json(serde_json::json!({
        "followerId": caller,
        "followeeId": target,
    })))
}

/// GET /api/v1/users/{id}/following
pub async fn following_handler(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<FollowEdgeEntry>>, ApiError> {
    let user = UserId::parse(&id).map_err(|e| ApiError::bad_user_id(e, &ctx.request_id))?;
    let limit = clamp_limit(
        query.limit,
        state.kernel.config.timeline_default_page_size,
        state.kernel.config.timeline_max_page_size,
    );

    let (edges, has_more) = list_following(user, query.cursor.as_deref(), limit, &state.kernel)
        .await
        .map_err(|e| ApiError::internal(e, &ctx.request_id))?;

    let next_cursor = if has_more {
        edges.last().map(|f| encode_time_cursor(f.created_at))
    } else {
        None
    };
    let data = edges
        .into_iter()
        .map(|f| FollowEdgeEntry {
            user_id: f.followee_id,
            followed_at: f.created_at,
        })
        .collect();

    Ok(Json(Page::new(data, next_cursor, has_more)))
}

/// GET /api/v1/users/{id}/followers
pub async fn followers_handler(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<FollowEdgeEntry>>, ApiError> {
    let user = UserId::parse(&id).map_err(|e| ApiError::bad_user_id(e, &ctx.request_id))?;
    let limit = clamp_limit(
        query.limit,
        state.kernel.config.timeline_default_page_size,
        state.kernel.config.timeline_max_page_size,
    );

    let (edges, has_more) = list_followers(user, query.cursor.as_deref(), limit, &state.kernel)
        .await
        .map_err(|e| ApiError::internal(e, &ctx.request_id))?;

    let next_cursor = if has_more {
        edges.last().map(|f| encode_time_cursor(f.created_at))
    } else {
        None
    };
    let data = edges
        .into_iter()
        .map(|f| FollowEdgeEntry {
            user_id: f.follower_id,
            followed_at: f.created_at,
        })
        .collect();

    Ok(Json(Page::new(data, next_cursor, has_more)))
}
