use axum::{extract::State, Json};

use crate::error::AppError;
use crate::models::DashboardStats;
use crate::startup::AppState;

/// Summary statistics for the dashboard tiles.
#[tracing::instrument(skip(state))]
pub async fn dashboard_stats(
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, AppError> {
    let stats = state.store.dashboard_stats().await?;
    Ok(Json(stats))
}
