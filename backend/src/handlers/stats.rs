//! Dashboard and statistics handlers

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::dashboard::{Dashboard, Statistics};
use crate::services::{AnalyticsService, DashboardService};
use crate::AppState;

fn service(state: &AppState) -> DashboardService {
    let analytics = AnalyticsService::new(state.db.clone(), state.config.reporting.offset());
    DashboardService::new(state.db.clone(), analytics)
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Dashboard>> {
    let dashboard = service(&state).dashboard(current_user.0.user_id).await?;
    Ok(Json(dashboard))
}

pub async fn get_statistics(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Statistics>> {
    let statistics = service(&state).statistics(current_user.0.user_id).await?;
    Ok(Json(statistics))
}
