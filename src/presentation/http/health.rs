use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::bootstrap::app_context::AppContext;
use crate::infrastructure::db;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResp {
    pub status: String,
    /// `connected`, `unreachable`, or `disabled` when no DATABASE_URL is set
    pub database: String,
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses((status = 200, body = HealthResp))
)]
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResp> {
    let (status, database) = match ctx.db_pool() {
        None => ("ok", "disabled"),
        Some(pool) if db::ping(&pool).await => ("ok", "connected"),
        Some(_) => ("degraded", "unreachable"),
    };
    Json(HealthResp {
        status: status.into(),
        database: database.into(),
    })
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new().route("/health", get(health)).with_state(ctx)
}
