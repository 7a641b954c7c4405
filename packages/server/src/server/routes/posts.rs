//! Post endpoints: create, and paginate an author's history.

use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::Json;

use crate::common::context::RequestContext;
use crate::common::entity_ids::UserId;
use crate::common::pagination::{clamp_limit, encode_id_cursor, Page};
use crate::domains::posts::actions::{create_post, list_user_posts};
use crate::server::app::AppState;
use crate::server::dto::{CreatePostRequest, PageQuery, PostResponse};
use crate::server::error::{require_caller, ApiError};

/// POST /api/v1/posts
pub async fn create_post_handler(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    let caller = require_caller(&ctx)?;

    let post = create_post(caller, &body.content, &ctx, &state.kernel)
        .await
        .map_err(|e| ApiError::from_create_post(e, &ctx.request_id))?;

    Ok((StatusCode::CREATED, Json(post.into())))
}

/// GET /api/v1/users/{id}/posts
pub async fn list_user_posts_handler(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<PostResponse>>, ApiError> {
    let author = UserId::parse(&id).map_err(|e| ApiError::bad_user_id(e, &ctx.request_id))?;
    let limit = clamp_limit(
        query.limit,
        state.kernel.config.timeline_default_page_size,
        state.kernel.config.timeline_max_page_size,
    );

    let (posts, has_more) = list_user_posts(author, query.cursor.as_deref(), limit, &state.kernel)
        .await
        .map_err(|e| ApiError::internal(e, &ctx.request_id))?;

    let next_cursor = if has_more {
        posts.last().map(|p| encode_id_cursor(p.id))
    } else {
        None
    };
    let data = posts.into_iter().map(PostResponse::from).collect();

    Ok(Json(Page::new(data, next_cursor, has_more)))
}
