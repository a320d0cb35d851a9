//! Job schedule and application handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{Application, Schedule};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::schedule::{
    ApplyInput, CreateScheduleInput, RespondApplicationInput, ScheduleFilter,
};
use crate::services::ScheduleService;
use crate::AppState;

// ============================================================================
// Schedules
// ============================================================================

/// HHM posts a schedule
pub async fn create_schedule(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateScheduleInput>,
) -> AppResult<(StatusCode, Json<Schedule>)> {
    let service = ScheduleService::new(state.db.clone());
    let schedule = service.create(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

/// Open schedules
pub async fn list_schedules(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<ScheduleFilter>,
) -> AppResult<Json<Vec<Schedule>>> {
    let service = ScheduleService::new(state.db.clone());
    let schedules = service.list_open(&filter).await?;
    Ok(Json(schedules))
}

pub async fn my_schedules(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Schedule>>> {
    let service = ScheduleService::new(state.db.clone());
    let schedules = service.mine(&current_user.0).await?;
    Ok(Json(schedules))
}

pub async fn close_schedule(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(schedule_id): Path<Uuid>,
) -> AppResult<Json<Schedule>> {
    let service = ScheduleService::new(state.db.clone());
    let schedule = service.close(&current_user.0, schedule_id).await?;
    Ok(Json(schedule))
}

// ============================================================================
// Applications
// ============================================================================

/// Worker applies to a schedule
pub async fn apply_to_schedule(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(schedule_id): Path<Uuid>,
    Json(input): Json<ApplyInput>,
) -> AppResult<(StatusCode, Json<Application>)> {
    let service = ScheduleService::new(state.db.clone());
    let application = service.apply(&current_user.0, schedule_id, input).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

/// Applications to one of the HHM's schedules
pub async fn schedule_applications(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(schedule_id): Path<Uuid>,
) -> AppResult<Json<Vec<Application>>> {
    let service = ScheduleService::new(state.db.clone());
    let applications = service.applications_for(&current_user.0, schedule_id).await?;
    Ok(Json(applications))
}

pub async fn my_applications(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Application>>> {
    let service = ScheduleService::new(state.db.clone());
    let applications = service.my_applications(&current_user.0).await?;
    Ok(Json(applications))
}

pub async fn respond_application(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(application_id): Path<Uuid>,
    Json(input): Json<RespondApplicationInput>,
) -> AppResult<Json<Application>> {
    let service = ScheduleService::new(state.db.clone());
    let application = service
        .respond_application(&current_user.0, application_id, input)
        .await?;
    Ok(Json(application))
}
