//! Home timeline endpoint.

use axum::extract::{Extension, Path, Query};
use axum::Json;

use crate::common::context::RequestContext;
use crate::common::entity_ids::UserId;
use crate::common::pagination::{clamp_limit, Page};
use crate::domains::timeline::get_timeline;
use crate::server::app::AppState;
use crate::server::dto::{PageQuery, PostResponse};
use crate::server::error::{require_self, ApiError};

/// GET /api/v1/users/{id}/timeline
pub async fn timeline_handler(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<PostResponse>>, ApiError> {
    let user = UserId::parse(&id).map_err(|e| ApiError::bad_user_id(e, &ctx.request_id))?;
    let reader = require_self(&ctx, user)?;

    let limit = clamp_limit(
        query.limit,
        state.kernel.config.timeline_default_page_size,
        state.kernel.config.timeline_max_page_size,
    );

    let page = get_timeline(reader, query.cursor.as_deref(), limit, &state.kernel)
        .await
        .map_err(|e| ApiError::internal(e, &ctx.request_id))?;

    let data = page.posts.into_iter().map(PostResponse::from).collect();
    Ok(Json(Page::new(data, page.next_cursor, page.has_more)))
}
