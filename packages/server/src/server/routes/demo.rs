//! Demo endpoints: entity counts and full reset. Not for production
//! traffic; they exist so a fresh environment can be inspected and wiped.

use axum::extract::Extension;
use axum::Json;

use txoutbox::OutboxRecord;

use crate::common::context::RequestContext;
use crate::domains::posts::models::Post;
use crate::domains::social::models::Follow;
use crate::domains::users::models::User;
use crate::kernel::ServerKernel;
use crate::server::app::AppState;
use crate::server::dto::StatsResponse;
use crate::server::error::ApiError;

async fn collect_stats(kernel: &ServerKernel) -> anyhow::Result<StatsResponse> {
    let users = User::count(&kernel.db).await?;
    let tweets = Post::count(&kernel.db).await?;
    let follows = Follow::count(&kernel.db).await?;

    let mut outbox_pending = 0;
    for pool in kernel.db.all() {
        outbox_pending += OutboxRecord::count_pending(pool).await?;
    }

    Ok(StatsResponse {
        users,
        tweets,
        follows,
        outbox_pending,
    })
}

/// GET /api/v1/demo/stats
pub async fn stats_handler(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = collect_stats(&state.kernel)
        .await
        .map_err(|e| ApiError::internal(e, &ctx.request_id))?;

    Ok(Json(stats))
}

/// POST /api/v1/demo/reset
///
/// Wipes every store and returns the counts as they were before the wipe.
pub async fn reset_handler(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<StatsResponse>, ApiError> {
    let kernel = &state.kernel;

    let before = collect_stats(kernel)
        .await
        .map_err(|e| ApiError::internal(e, &ctx.request_id))?;

    for pool in kernel.db.all() {
        sqlx::query("TRUNCATE outbox_events, follows, tweets, users CASCADE")
            .execute(pool)
            .await
            .map_err(|e| ApiError::internal(e, &ctx.request_id))?;
    }

    kernel
        .cache
        .flush_all()
        .await
        .map_err(|e| ApiError::internal(e, &ctx.request_id))?;

    tracing::warn!(request_id = %ctx.request_id, "All stores wiped via demo reset");

    Ok(Json(before))
}
