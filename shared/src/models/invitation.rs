//! Factory/HHM partnership invitations

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflow::WorkflowStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    #[serde(alias = "rejected")]
    Declined,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Declined => "declined",
        }
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvitationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvitationStatus::Pending),
            "accepted" => Ok(InvitationStatus::Accepted),
            "declined" | "rejected" => Ok(InvitationStatus::Declined),
            other => Err(format!("Unknown invitation status: {}", other)),
        }
    }
}

impl WorkflowStatus for InvitationStatus {
    const KIND: &'static str = "invitation";

    fn pending() -> Self {
        InvitationStatus::Pending
    }

    fn accepted() -> Self {
        InvitationStatus::Accepted
    }

    fn rejected() -> Self {
        InvitationStatus::Declined
    }
}

/// Which side sent the invitation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InvitationInitiator {
    Factory,
    Hhm,
}

impl InvitationInitiator {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationInitiator::Factory => "factory",
            InvitationInitiator::Hhm => "hhm",
        }
    }
}

impl FromStr for InvitationInitiator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "factory" => Ok(InvitationInitiator::Factory),
            "hhm" => Ok(InvitationInitiator::Hhm),
            other => Err(format!("Unknown invitation initiator: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub factory_id: Uuid,
    pub hhm_id: Uuid,
    pub initiated_by: InvitationInitiator,
    pub status: InvitationStatus,
    pub personal_message: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub response_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_sent_at: DateTime<Utc>,
}

impl Invitation {
    pub fn sender_id(&self) -> Uuid {
        match self.initiated_by {
            InvitationInitiator::Factory => self.factory_id,
            InvitationInitiator::Hhm => self.hhm_id,
        }
    }

    pub fn receiver_id(&self) -> Uuid {
        match self.initiated_by {
            InvitationInitiator::Factory => self.hhm_id,
            InvitationInitiator::Hhm => self.factory_id,
        }
    }

    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.factory_id == user_id || self.hhm_id == user_id
    }

    /// The other party, if `user_id` is on this invitation
    pub fn counterpart(&self, user_id: Uuid) -> Option<Uuid> {
        if user_id == self.factory_id {
            Some(self.hhm_id)
        } else if user_id == self.hhm_id {
            Some(self.factory_id)
        } else {
            None
        }
    }

    /// `(factory_id, hhm_id)` once the invitation has been accepted
    pub fn association(&self) -> Option<(Uuid, Uuid)> {
        (self.status == InvitationStatus::Accepted).then_some((self.factory_id, self.hhm_id))
    }

    /// Whether a resend is allowed at `now` given the cooldown in seconds
    pub fn can_resend(&self, now: DateTime<Utc>, cooldown_secs: i64) -> bool {
        self.status.is_pending() && now - self.last_sent_at >= chrono::Duration::seconds(cooldown_secs)
    }
}

/// Everyone `user_id` is associated with through accepted invitations, each once
pub fn associated_parties<'a>(
    invitations: impl IntoIterator<Item = &'a Invitation>,
    user_id: Uuid,
) -> Vec<Uuid> {
    let mut parties: Vec<Uuid> = Vec::new();
    for invitation in invitations {
        if invitation.association().is_none() {
            continue;
        }
        if let Some(other) = invitation.counterpart(user_id) {
            if !parties.contains(&other) {
                parties.push(other);
            }
        }
    }
    parties
}
