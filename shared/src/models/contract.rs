//! Farmer/HHM work contracts

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflow::WorkflowStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    FarmerPending,
    HhmAccepted,
    HhmRejected,
    AutoCancelled,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::FarmerPending => "farmer_pending",
            ContractStatus::HhmAccepted => "hhm_accepted",
            ContractStatus::HhmRejected => "hhm_rejected",
            ContractStatus::AutoCancelled => "auto_cancelled",
        }
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "farmer_pending" => Ok(ContractStatus::FarmerPending),
            "hhm_accepted" => Ok(ContractStatus::HhmAccepted),
            "hhm_rejected" => Ok(ContractStatus::HhmRejected),
            "auto_cancelled" => Ok(ContractStatus::AutoCancelled),
            other => Err(format!("Unknown contract status: {}", other)),
        }
    }
}

impl WorkflowStatus for ContractStatus {
    const KIND: &'static str = "contract";

    fn pending() -> Self {
        ContractStatus::FarmerPending
    }

    fn accepted() -> Self {
        ContractStatus::HhmAccepted
    }

    fn rejected() -> Self {
        ContractStatus::HhmRejected
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContractDetails {
    pub work_type: String,
    pub farm_location: String,
    pub payment_terms: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub requirements: Option<String>,
}

impl ContractDetails {
    /// Inclusive length of the work period in days
    pub fn span_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub hhm_id: Uuid,
    pub status: ContractStatus,
    pub contract_details: ContractDetails,
    pub duration_days: i32,
    pub grace_period_days: i32,
    pub response_message: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    /// Moment after which an unanswered contract is auto-cancelled
    pub fn response_deadline(&self) -> DateTime<Utc> {
        response_deadline(self.created_at, self.grace_period_days)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        is_overdue(self.status, self.created_at, self.grace_period_days, now)
    }
}

pub fn response_deadline(created_at: DateTime<Utc>, grace_period_days: i32) -> DateTime<Utc> {
    created_at + Duration::days(i64::from(grace_period_days.max(0)))
}

/// Only pending contracts past their grace period are overdue
pub fn is_overdue(
    status: ContractStatus,
    created_at: DateTime<Utc>,
    grace_period_days: i32,
    now: DateTime<Utc>,
) -> bool {
    status.is_pending() && now > response_deadline(created_at, grace_period_days)
}
