//! Back-office dashboard.

use axum::extract::State;
use chrono::Utc;

use crate::db::StatsRepository;
use crate::error::Result;
use crate::models::DashboardStats;
use crate::response::ApiResponse;
use crate::state::AppState;

/// `GET /api/admin/stats` - catalog, quote and appointment counters.
pub async fn dashboard(State(state): State<AppState>) -> Result<ApiResponse<DashboardStats>> {
    let stats = StatsRepository::new(state.pool())
        .dashboard(Utc::now().date_naive())
        .await?;
    Ok(ApiResponse::ok(stats))
}
