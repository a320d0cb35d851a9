//! Factory/HHM invitation handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{AssociatedParty, Invitation};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::invitation::{CreateInvitationInput, InvitationFilter, RespondInput};
use crate::services::InvitationService;
use crate::AppState;

/// Send an invitation
pub async fn create_invitation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateInvitationInput>,
) -> AppResult<(StatusCode, Json<Invitation>)> {
    let service = InvitationService::new(state.db.clone(), &state.config);
    let invitation = service.create(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(invitation)))
}

/// List sent and/or received invitations
pub async fn list_invitations(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<InvitationFilter>,
) -> AppResult<Json<Vec<Invitation>>> {
    let service = InvitationService::new(state.db.clone(), &state.config);
    let invitations = service.list(&current_user.0, &filter).await?;
    Ok(Json(invitations))
}

pub async fn get_invitation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(invitation_id): Path<Uuid>,
) -> AppResult<Json<Invitation>> {
    let service = InvitationService::new(state.db.clone(), &state.config);
    let invitation = service.get(&current_user.0, invitation_id).await?;
    Ok(Json(invitation))
}

/// Accept or decline
pub async fn respond_invitation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(invitation_id): Path<Uuid>,
    Json(input): Json<RespondInput>,
) -> AppResult<Json<Invitation>> {
    let service = InvitationService::new(state.db.clone(), &state.config);
    let invitation = service.respond(&current_user.0, invitation_id, input).await?;
    Ok(Json(invitation))
}

pub async fn resend_invitation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(invitation_id): Path<Uuid>,
) -> AppResult<Json<Invitation>> {
    let service = InvitationService::new(state.db.clone(), &state.config);
    let invitation = service.resend(&current_user.0, invitation_id).await?;
    Ok(Json(invitation))
}

/// Withdraw a pending invitation
pub async fn withdraw_invitation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(invitation_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = InvitationService::new(state.db.clone(), &state.config);
    service.withdraw(&current_user.0, invitation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Parties linked to the current user through accepted invitations
pub async fn list_associations(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<AssociatedParty>>> {
    let service = InvitationService::new(state.db.clone(), &state.config);
    let parties = service.associations(current_user.0.user_id).await?;
    Ok(Json(parties))
}
