//! Dashboard handler

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::dashboard::Dashboard;
use crate::services::DashboardService;
use crate::AppState;

/// Role-specific counts for the current user
pub async fn get_dashboard(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Dashboard>> {
    let service = DashboardService::new(state.db.clone());
    let dashboard = service.for_user(&current_user.0).await?;
    Ok(Json(dashboard))
}
