//! Invitation service for factory/HHM partnership requests
//!
//! Supports:
//! - Factory-to-HHM invitations and HHM-to-factory requests
//! - One accept/decline response by the receiving side
//! - Rate-limited resends of pending invitations
//! - Association lists built from accepted invitations

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{
    answer, ensure_no_active, AssociatedParty, Decision, Invitation, InvitationInitiator,
    InvitationStatus, NotificationKind, RoleProfile, UserRole, WorkflowStatus,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use super::notification::{EntityRef, NewNotification, NotificationService};
use super::user::UserService;
use super::parse_stored;

/// Invitation service
#[derive(Clone)]
pub struct InvitationService {
    db: PgPool,
    users: UserService,
    notifications: NotificationService,
    resend_cooldown_secs: i64,
}

/// Input for sending an invitation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitationInput {
    /// The factory (when an HHM sends) or HHM (when a factory sends)
    #[serde(alias = "hhmId", alias = "factoryId")]
    pub target_id: Uuid,
    pub personal_message: Option<String>,
}

/// Input for answering an invitation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondInput {
    #[serde(alias = "status")]
    pub decision: Decision,
    pub response_message: Option<String>,
}

/// Which invitations to list
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
    #[default]
    All,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvitationFilter {
    pub status: Option<InvitationStatus>,
    #[serde(default)]
    pub direction: Direction,
}

#[derive(Debug, FromRow)]
struct InvitationRow {
    id: Uuid,
    factory_id: Uuid,
    hhm_id: Uuid,
    initiated_by: String,
    status: String,
    personal_message: Option<String>,
    responded_at: Option<DateTime<Utc>>,
    response_message: Option<String>,
    created_at: DateTime<Utc>,
    last_sent_at: DateTime<Utc>,
}

impl TryFrom<InvitationRow> for Invitation {
    type Error = AppError;

    fn try_from(row: InvitationRow) -> Result<Self, Self::Error> {
        Ok(Invitation {
            id: row.id,
            factory_id: row.factory_id,
            hhm_id: row.hhm_id,
            initiated_by: parse_stored::<InvitationInitiator>(&row.initiated_by)?,
            status: parse_stored::<InvitationStatus>(&row.status)?,
            personal_message: row.personal_message,
            responded_at: row.responded_at,
            response_message: row.response_message,
            created_at: row.created_at,
            last_sent_at: row.last_sent_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct AssociationRow {
    user_id: Uuid,
    name: String,
    username: String,
    role: String,
    profile: serde_json::Value,
    associated_at: DateTime<Utc>,
}

const INVITATION_COLUMNS: &str = "id, factory_id, hhm_id, initiated_by, status, personal_message, \
                                  responded_at, response_message, created_at, last_sent_at";

/// Work out the (factory, hhm) pair and initiator for a sender and target
pub fn invitation_pair(
    sender: &AuthUser,
    target_id: Uuid,
) -> AppResult<(Uuid, Uuid, InvitationInitiator)> {
    match sender.role {
        UserRole::Factory => Ok((sender.user_id, target_id, InvitationInitiator::Factory)),
        UserRole::Hhm => Ok((target_id, sender.user_id, InvitationInitiator::Hhm)),
        _ => Err(AppError::InsufficientPermissions),
    }
}

/// Seconds until a resend becomes possible
pub fn resend_wait_secs(last_sent_at: DateTime<Utc>, now: DateTime<Utc>, cooldown_secs: i64) -> i64 {
    (cooldown_secs - (now - last_sent_at).num_seconds()).max(0)
}

impl InvitationService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            users: UserService::new(db.clone()),
            notifications: NotificationService::new(db.clone()),
            db,
            resend_cooldown_secs: config.invitations.resend_cooldown_secs,
        }
    }

    /// Send an invitation to the counterpart role
    pub async fn create(&self, sender: &AuthUser, input: CreateInvitationInput) -> AppResult<Invitation> {
        let (factory_id, hhm_id, initiated_by) = invitation_pair(sender, input.target_id)?;

        if input.target_id == sender.user_id {
            return Err(AppError::validation("targetId", "Cannot invite yourself"));
        }

        let counterpart = sender
            .role
            .invitation_counterpart()
            .ok_or(AppError::InsufficientPermissions)?;
        let target = self
            .users
            .get_user_with_role(input.target_id, counterpart, "targetId")
            .await?;

        // Reject while a pending or accepted invitation exists for this pair
        let existing = sqlx::query_scalar::<_, String>(
            "SELECT status FROM invitations WHERE factory_id = $1 AND hhm_id = $2",
        )
        .bind(factory_id)
        .bind(hhm_id)
        .fetch_all(&self.db)
        .await?
        .iter()
        .map(|s| parse_stored::<InvitationStatus>(s))
        .collect::<AppResult<Vec<_>>>()?;
        ensure_no_active(existing)?;

        let personal_message = input
            .personal_message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        let row = sqlx::query_as::<_, InvitationRow>(&format!(
            r#"
            INSERT INTO invitations (id, factory_id, hhm_id, initiated_by, status, personal_message)
            VALUES ($1, $2, $3, $4, 'pending', $5)
            RETURNING {}
            "#,
            INVITATION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(factory_id)
        .bind(hhm_id)
        .bind(initiated_by.as_str())
        .bind(&personal_message)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            AppError::from_unique_violation(
                e,
                "invitation",
                "An active invitation already exists between these parties",
            )
        })?;

        let invitation = Invitation::try_from(row)?;
        tracing::info!(
            invitation_id = %invitation.id,
            factory_id = %factory_id,
            hhm_id = %hhm_id,
            "Invitation created"
        );

        let sender_name = self.users.display_name(sender.user_id).await;
        self.notifications
            .notify(NewNotification {
                user_id: target.id,
                kind: NotificationKind::InvitationReceived,
                title: "New partnership invitation".to_string(),
                message: format!("{} invited you to partner with them", sender_name),
                entity: Some(EntityRef::new("invitation", invitation.id)),
            })
            .await;

        Ok(invitation)
    }

    /// List the user's invitations
    pub async fn list(&self, user: &AuthUser, filter: &InvitationFilter) -> AppResult<Vec<Invitation>> {
        let rows = sqlx::query_as::<_, InvitationRow>(&format!(
            r#"
            SELECT {}
            FROM invitations
            WHERE (factory_id = $1 OR hhm_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
            INVITATION_COLUMNS
        ))
        .bind(user.user_id)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        let invitations = rows
            .into_iter()
            .map(Invitation::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(invitations
            .into_iter()
            .filter(|inv| match filter.direction {
                Direction::Sent => inv.sender_id() == user.user_id,
                Direction::Received => inv.receiver_id() == user.user_id,
                Direction::All => true,
            })
            .collect())
    }

    async fn find(&self, invitation_id: Uuid) -> AppResult<Invitation> {
        let row = sqlx::query_as::<_, InvitationRow>(&format!(
            "SELECT {} FROM invitations WHERE id = $1",
            INVITATION_COLUMNS
        ))
        .bind(invitation_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Invitation".to_string()))?;

        Invitation::try_from(row)
    }

    /// Get an invitation the user is a party to
    pub async fn get(&self, user: &AuthUser, invitation_id: Uuid) -> AppResult<Invitation> {
        let invitation = self.find(invitation_id).await?;
        if !invitation.is_party(user.user_id) {
            return Err(AppError::Forbidden("Not a party to this invitation".to_string()));
        }
        Ok(invitation)
    }

    /// Accept or decline an invitation as its receiver
    pub async fn respond(
        &self,
        user: &AuthUser,
        invitation_id: Uuid,
        input: RespondInput,
    ) -> AppResult<Invitation> {
        let invitation = self.get(user, invitation_id).await?;
        if invitation.receiver_id() != user.user_id {
            return Err(AppError::Forbidden(
                "Only the invited party can respond".to_string(),
            ));
        }

        let response = answer(
            invitation.status,
            input.decision,
            input.response_message,
            Utc::now(),
        )?;

        let mut tx = self.db.begin().await?;

        // Guarded on the pending status so concurrent responses cannot both win
        let row = sqlx::query_as::<_, InvitationRow>(&format!(
            r#"
            UPDATE invitations
            SET status = $2, responded_at = $3, response_message = $4
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            INVITATION_COLUMNS
        ))
        .bind(invitation_id)
        .bind(response.status.as_str())
        .bind(response.responded_at)
        .bind(&response.response_message)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::InvalidStateTransition("invitation already responded".to_string()))?;

        let updated = Invitation::try_from(row)?;
        if let Some((factory_id, hhm_id)) = updated.association() {
            sqlx::query(
                r#"
                INSERT INTO associations (factory_id, hhm_id, invitation_id)
                VALUES ($1, $2, $3)
                ON CONFLICT (factory_id, hhm_id) DO NOTHING
                "#,
            )
            .bind(factory_id)
            .bind(hhm_id)
            .bind(updated.id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            invitation_id = %updated.id,
            status = %updated.status,
            "Invitation responded"
        );

        let responder = self.users.display_name(user.user_id).await;
        self.notifications
            .notify(NewNotification {
                user_id: updated.sender_id(),
                kind: NotificationKind::InvitationResponded,
                title: format!("Invitation {}", updated.status),
                message: format!("{} {} your invitation", responder, updated.status),
                entity: Some(EntityRef::new("invitation", updated.id)),
            })
            .await;

        Ok(updated)
    }

    /// Re-notify the receiver of a pending invitation
    pub async fn resend(&self, user: &AuthUser, invitation_id: Uuid) -> AppResult<Invitation> {
        let invitation = self.get(user, invitation_id).await?;
        if invitation.sender_id() != user.user_id {
            return Err(AppError::Forbidden("Only the sender can resend".to_string()));
        }
        if !invitation.status.is_pending() {
            return Err(AppError::InvalidStateTransition(format!(
                "invitation already {}",
                invitation.status
            )));
        }

        let now = Utc::now();
        if !invitation.can_resend(now, self.resend_cooldown_secs) {
            return Err(AppError::RateLimited {
                message: "Invitation was resent recently, try again later".to_string(),
                retry_after_secs: resend_wait_secs(invitation.last_sent_at, now, self.resend_cooldown_secs),
            });
        }

        // Compare-and-swap on last_sent_at so two quick resends send once
        let row = sqlx::query_as::<_, InvitationRow>(&format!(
            r#"
            UPDATE invitations
            SET last_sent_at = $3
            WHERE id = $1 AND status = 'pending' AND last_sent_at = $2
            RETURNING {}
            "#,
            INVITATION_COLUMNS
        ))
        .bind(invitation_id)
        .bind(invitation.last_sent_at)
        .bind(now)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::RateLimited {
            message: "Invitation was resent recently, try again later".to_string(),
            retry_after_secs: self.resend_cooldown_secs,
        })?;

        let updated = Invitation::try_from(row)?;

        let sender_name = self.users.display_name(user.user_id).await;
        self.notifications
            .notify(NewNotification {
                user_id: updated.receiver_id(),
                kind: NotificationKind::InvitationReceived,
                title: "Invitation reminder".to_string(),
                message: format!("{} is waiting for your response", sender_name),
                entity: Some(EntityRef::new("invitation", updated.id)),
            })
            .await;

        Ok(updated)
    }

    /// Withdraw a pending invitation as its sender
    pub async fn withdraw(&self, user: &AuthUser, invitation_id: Uuid) -> AppResult<()> {
        let invitation = self.get(user, invitation_id).await?;
        if invitation.sender_id() != user.user_id {
            return Err(AppError::Forbidden("Only the sender can withdraw".to_string()));
        }

        let result = sqlx::query("DELETE FROM invitations WHERE id = $1 AND status = 'pending'")
            .bind(invitation_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InvalidStateTransition(
                "only pending invitations can be withdrawn".to_string(),
            ));
        }

        tracing::info!(invitation_id = %invitation_id, "Invitation withdrawn");
        Ok(())
    }

    /// Parties associated with the user through accepted invitations
    pub async fn associations(&self, user_id: Uuid) -> AppResult<Vec<AssociatedParty>> {
        let rows = sqlx::query_as::<_, AssociationRow>(
            r#"
            SELECT u.id AS user_id, u.name, u.username, u.role, u.profile,
                   a.created_at AS associated_at
            FROM associations a
            JOIN users u
              ON u.id = CASE WHEN a.factory_id = $1 THEN a.hhm_id ELSE a.factory_id END
            WHERE a.factory_id = $1 OR a.hhm_id = $1
            ORDER BY a.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| {
                let role = parse_stored::<UserRole>(&row.role)?;
                let profile = RoleProfile::from_value(role, row.profile)
                    .map_err(|e| AppError::Internal(format!("Corrupt user profile: {}", e)))?;
                Ok(AssociatedParty {
                    user_id: row.user_id,
                    name: row.name,
                    username: row.username,
                    role,
                    location: profile.location().map(str::to_string),
                    associated_at: row.associated_at,
                })
            })
            .collect()
    }
}
