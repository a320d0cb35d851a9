//! In-app notifications

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    InvitationReceived,
    InvitationResponded,
    ContractReceived,
    ContractResponded,
    ContractAutoCancelled,
    OrderReceived,
    OrderResponded,
    ApplicationReceived,
    ApplicationResponded,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::InvitationReceived => "invitation_received",
            NotificationKind::InvitationResponded => "invitation_responded",
            NotificationKind::ContractReceived => "contract_received",
            NotificationKind::ContractResponded => "contract_responded",
            NotificationKind::ContractAutoCancelled => "contract_auto_cancelled",
            NotificationKind::OrderReceived => "order_received",
            NotificationKind::OrderResponded => "order_responded",
            NotificationKind::ApplicationReceived => "application_received",
            NotificationKind::ApplicationResponded => "application_responded",
            NotificationKind::System => "system",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invitation_received" => Ok(NotificationKind::InvitationReceived),
            "invitation_responded" => Ok(NotificationKind::InvitationResponded),
            "contract_received" => Ok(NotificationKind::ContractReceived),
            "contract_responded" => Ok(NotificationKind::ContractResponded),
            "contract_auto_cancelled" => Ok(NotificationKind::ContractAutoCancelled),
            "order_received" => Ok(NotificationKind::OrderReceived),
            "order_responded" => Ok(NotificationKind::OrderResponded),
            "application_received" => Ok(NotificationKind::ApplicationReceived),
            "application_responded" => Ok(NotificationKind::ApplicationResponded),
            "system" => Ok(NotificationKind::System),
            other => Err(format!("Unknown notification kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
