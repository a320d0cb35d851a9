//! Status-gated request/response workflow
//!
//! Invitations, contracts, orders and job applications all follow the same
//! shape: a record is created in a pending state, the receiving party answers
//! it exactly once, and the answer is terminal. Only one active (pending or
//! accepted) record may exist per initiator/target pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A receiver's answer to a pending request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    #[serde(alias = "accepted")]
    Accept,
    #[serde(alias = "rejected", alias = "decline", alias = "declined")]
    Reject,
}

/// Workflow rule violations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("{kind} already responded (status: {status})")]
    AlreadyResponded { kind: &'static str, status: String },

    #[error("an active {kind} already exists between these parties")]
    ActiveExists { kind: &'static str },
}

/// A status enum with a single pending value and terminal answers
pub trait WorkflowStatus: Copy + PartialEq + std::fmt::Display {
    /// Name used in error messages
    const KIND: &'static str;

    /// Initial status of a freshly created record
    fn pending() -> Self;

    fn accepted() -> Self;

    fn rejected() -> Self;

    fn is_pending(&self) -> bool {
        *self == Self::pending()
    }

    /// Pending or accepted records block a new request for the same pair
    fn is_active(&self) -> bool {
        self.is_pending() || *self == Self::accepted()
    }
}

/// Compute the status that answering a record with `decision` produces
pub fn respond<S: WorkflowStatus>(current: S, decision: Decision) -> Result<S, WorkflowError> {
    if !current.is_pending() {
        return Err(WorkflowError::AlreadyResponded {
            kind: S::KIND,
            status: current.to_string(),
        });
    }
    Ok(match decision {
        Decision::Accept => S::accepted(),
        Decision::Reject => S::rejected(),
    })
}

/// Fail when any existing record for the same pair is still active
pub fn ensure_no_active<S: WorkflowStatus>(
    existing: impl IntoIterator<Item = S>,
) -> Result<(), WorkflowError> {
    if existing.into_iter().any(|s| s.is_active()) {
        return Err(WorkflowError::ActiveExists { kind: S::KIND });
    }
    Ok(())
}

/// Fields written when a pending record is answered
#[derive(Debug, Clone, PartialEq)]
pub struct Response<S> {
    pub status: S,
    pub responded_at: DateTime<Utc>,
    pub response_message: Option<String>,
}

/// Answer a pending record, stamping the response time
pub fn answer<S: WorkflowStatus>(
    current: S,
    decision: Decision,
    message: Option<String>,
    now: DateTime<Utc>,
) -> Result<Response<S>, WorkflowError> {
    let status = respond(current, decision)?;
    let response_message = message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());
    Ok(Response {
        status,
        responded_at: now,
        response_message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContractStatus, InvitationStatus};

    #[test]
    fn pending_accepts() {
        let next = respond(InvitationStatus::Pending, Decision::Accept).unwrap();
        assert_eq!(next, InvitationStatus::Accepted);
    }

    #[test]
    fn pending_rejects() {
        let next = respond(InvitationStatus::Pending, Decision::Reject).unwrap();
        assert_eq!(next, InvitationStatus::Declined);
    }

    #[test]
    fn terminal_status_cannot_be_answered() {
        for status in [InvitationStatus::Accepted, InvitationStatus::Declined] {
            let err = respond(status, Decision::Accept).unwrap_err();
            assert!(matches!(err, WorkflowError::AlreadyResponded { .. }));
        }
    }

    #[test]
    fn auto_cancelled_contract_cannot_be_answered() {
        assert!(respond(ContractStatus::AutoCancelled, Decision::Accept).is_err());
    }

    #[test]
    fn active_blocks_duplicates() {
        assert!(ensure_no_active([InvitationStatus::Declined]).is_ok());
        assert!(ensure_no_active(Vec::<InvitationStatus>::new()).is_ok());
        assert_eq!(
            ensure_no_active([InvitationStatus::Declined, InvitationStatus::Accepted]),
            Err(WorkflowError::ActiveExists { kind: "invitation" })
        );
    }

    #[test]
    fn cancelled_contract_does_not_block() {
        assert!(ensure_no_active([ContractStatus::AutoCancelled, ContractStatus::HhmRejected]).is_ok());
        assert!(ensure_no_active([ContractStatus::FarmerPending]).is_err());
    }

    #[test]
    fn answer_trims_blank_message() {
        let now = Utc::now();
        let response = answer(
            InvitationStatus::Pending,
            Decision::Accept,
            Some("   ".to_string()),
            now,
        )
        .unwrap();
        assert_eq!(response.status, InvitationStatus::Accepted);
        assert_eq!(response.responded_at, now);
        assert_eq!(response.response_message, None);
    }

    #[test]
    fn decision_accepts_status_words() {
        let d: Decision = serde_json::from_str("\"declined\"").unwrap();
        assert_eq!(d, Decision::Reject);
        let d: Decision = serde_json::from_str("\"accepted\"").unwrap();
        assert_eq!(d, Decision::Accept);
    }
}
