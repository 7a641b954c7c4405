//! Liveness endpoint.

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    database: ComponentHealth,
    cache: ComponentHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ComponentHealth {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
        }
    }

    fn error(message: String) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(message),
        }
    }
}

/// GET /actuator/health
///
/// Checks database and cache connectivity with a short deadline. 200 when
/// both respond, 503 otherwise.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let database = match tokio::time::timeout(
        std::time::Duration::from_secs(5),
        sqlx::query("SELECT 1").execute(state.kernel.db.primary()),
    )
    .await
    {
        Ok(Ok(_)) => ComponentHealth::ok(),
        Ok(Err(e)) => ComponentHealth::error(format!("Query failed: {e}")),
        Err(_) => ComponentHealth::error("Query timeout (>5s)".to_string()),
    };

    let cache = match tokio::time::timeout(
        std::time::Duration::from_secs(5),
        state.kernel.cache.ping(),
    )
    .await
    {
        Ok(Ok(())) => ComponentHealth::ok(),
        Ok(Err(e)) => ComponentHealth::error(format!("Ping failed: {e}")),
        Err(_) => ComponentHealth::error("Ping timeout (>5s)".to_string()),
    };

    let healthy = database.status == "ok" && cache.status == "ok";
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
            database,
            cache,
        }),
    )
}
