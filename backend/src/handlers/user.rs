//! Profile and directory handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use shared::{DirectoryFilter, PaginatedResponse, Pagination, User, UserRole};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::user::UpdateProfileInput;
use crate::services::UserService;
use crate::AppState;

/// Current user's profile
pub async fn get_me(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<User>> {
    let service = UserService::new(state.db);
    let user = service.get_user(current_user.0.user_id).await?;
    Ok(Json(user))
}

/// Partially update the current user's profile
pub async fn update_me(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<Json<User>> {
    let service = UserService::new(state.db);
    let user = service.update_profile(current_user.0.user_id, input).await?;
    Ok(Json(user))
}

/// Public profile of another user
pub async fn get_user(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<User>> {
    let service = UserService::new(state.db);
    let user = service.get_user(user_id).await?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct DirectoryQuery {
    pub location: Option<String>,
    pub search: Option<String>,
    pub skill: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Browse users of one role
pub async fn get_directory(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(role): Path<String>,
    Query(query): Query<DirectoryQuery>,
) -> AppResult<Json<PaginatedResponse<User>>> {
    let role = role
        .parse::<UserRole>()
        .map_err(|e| AppError::validation("role", e))?;

    let filter = DirectoryFilter {
        location: query.location,
        search: query.search,
        skill: query.skill,
    };
    let pagination = Pagination::from_query(query.page, query.per_page);

    let service = UserService::new(state.db);
    let page = service.directory(role, &filter, &pagination).await?;
    Ok(Json(page))
}
