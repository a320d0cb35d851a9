//! HHM job schedules and worker applications

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflow::WorkflowStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    Open,
    Closed,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Open => "open",
            ScheduleStatus::Closed => "closed",
        }
    }
}

impl FromStr for ScheduleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(ScheduleStatus::Open),
            "closed" => Ok(ScheduleStatus::Closed),
            other => Err(format!("Unknown schedule status: {}", other)),
        }
    }
}

/// Work posted by an HHM that workers can apply to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub hhm_id: Uuid,
    pub title: String,
    pub work_type: String,
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub workers_needed: i32,
    pub wage_per_day: Decimal,
    pub status: ScheduleStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApplicationStatus::Pending),
            "accepted" => Ok(ApplicationStatus::Accepted),
            "rejected" => Ok(ApplicationStatus::Rejected),
            other => Err(format!("Unknown application status: {}", other)),
        }
    }
}

impl WorkflowStatus for ApplicationStatus {
    const KIND: &'static str = "application";

    fn pending() -> Self {
        ApplicationStatus::Pending
    }

    fn accepted() -> Self {
        ApplicationStatus::Accepted
    }

    fn rejected() -> Self {
        ApplicationStatus::Rejected
    }
}

/// A worker's application to a schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub worker_id: Uuid,
    pub application_message: Option<String>,
    #[serde(default)]
    pub worker_skills: Vec<String>,
    pub expected_wage: Option<Decimal>,
    pub availability: Option<String>,
    pub status: ApplicationStatus,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{respond, Decision};

    #[test]
    fn application_answers_once() {
        let next = respond(ApplicationStatus::Pending, Decision::Reject).unwrap();
        assert_eq!(next, ApplicationStatus::Rejected);
        assert!(respond(next, Decision::Accept).is_err());
    }

    #[test]
    fn schedule_serializes_camel_case() {
        let schedule = Schedule {
            id: Uuid::nil(),
            hhm_id: Uuid::nil(),
            title: "Cutting crew".to_string(),
            work_type: "harvesting".to_string(),
            location: "Sangli".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 11, 15).unwrap(),
            workers_needed: 12,
            wage_per_day: Decimal::from(600),
            status: ScheduleStatus::Open,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&schedule).unwrap();
        assert_eq!(value["workersNeeded"], 12);
        assert_eq!(value["status"], "open");
        assert!(value.get("_id").is_some());
    }

    #[test]
    fn status_parses_storage_form() {
        assert_eq!("closed".parse::<ScheduleStatus>().unwrap(), ScheduleStatus::Closed);
        assert!("archived".parse::<ScheduleStatus>().is_err());
    }
}
