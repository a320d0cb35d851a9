//! Property-based tests for the request/response workflow
//!
//! Properties covered:
//! - A pending record can be answered exactly once; the answer is terminal
//! - Any active (pending or accepted) record blocks a new one for the same pair
//! - Rejected and auto-cancelled records never block a new request
//! - Invitation sender/receiver follow the initiator
//! - Resend is only allowed for pending invitations after the cooldown
//! - Only accepted invitations associate a factory with an HHM

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use shared::{
    answer, associated_parties, ensure_no_active, respond, ApplicationStatus, ContractStatus, Decision, Invitation,
    InvitationInitiator, InvitationStatus, OrderStatus, WorkflowError, WorkflowStatus,
};
use uuid::Uuid;

// ============================================================================
// Strategies
// ============================================================================

fn decision_strategy() -> impl Strategy<Value = Decision> {
    prop_oneof![Just(Decision::Accept), Just(Decision::Reject)]
}

fn invitation_status_strategy() -> impl Strategy<Value = InvitationStatus> {
    prop_oneof![
        Just(InvitationStatus::Pending),
        Just(InvitationStatus::Accepted),
        Just(InvitationStatus::Declined),
    ]
}

fn contract_status_strategy() -> impl Strategy<Value = ContractStatus> {
    prop_oneof![
        Just(ContractStatus::FarmerPending),
        Just(ContractStatus::HhmAccepted),
        Just(ContractStatus::HhmRejected),
        Just(ContractStatus::AutoCancelled),
    ]
}

fn order_status_strategy() -> impl Strategy<Value = OrderStatus> {
    prop_oneof![
        Just(OrderStatus::Pending),
        Just(OrderStatus::Accepted),
        Just(OrderStatus::Rejected),
    ]
}

fn initiator_strategy() -> impl Strategy<Value = InvitationInitiator> {
    prop_oneof![Just(InvitationInitiator::Factory), Just(InvitationInitiator::Hhm)]
}

fn message_strategy() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[ a-zA-Z0-9.,!]{0,40}")
}

fn invitation(initiated_by: InvitationInitiator, status: InvitationStatus, last_sent_secs: i64) -> Invitation {
    let created_at = Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap();
    Invitation {
        id: Uuid::new_v4(),
        factory_id: Uuid::new_v4(),
        hhm_id: Uuid::new_v4(),
        initiated_by,
        status,
        personal_message: None,
        responded_at: None,
        response_message: None,
        created_at,
        last_sent_at: created_at + Duration::seconds(last_sent_secs),
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// Answering moves a pending record to exactly the decided status
    #[test]
    fn prop_pending_answer_matches_decision(decision in decision_strategy()) {
        let next = respond(InvitationStatus::Pending, decision).unwrap();
        match decision {
            Decision::Accept => prop_assert_eq!(next, InvitationStatus::Accepted),
            Decision::Reject => prop_assert_eq!(next, InvitationStatus::Declined),
        }
        prop_assert!(!next.is_pending());
    }

    /// A second answer is always rejected, whatever the first one was
    #[test]
    fn prop_second_answer_rejected(first in decision_strategy(), second in decision_strategy()) {
        let after_first = respond(ContractStatus::FarmerPending, first).unwrap();
        let err = respond(after_first, second).unwrap_err();
        let is_already_responded = matches!(err, WorkflowError::AlreadyResponded { kind: "contract", .. });
        prop_assert!(is_already_responded);
    }

    /// Only the pending status can be answered, for every workflow kind
    #[test]
    fn prop_only_pending_answerable(
        invitation in invitation_status_strategy(),
        contract in contract_status_strategy(),
        order in order_status_strategy(),
        decision in decision_strategy(),
    ) {
        prop_assert_eq!(respond(invitation, decision).is_ok(), invitation.is_pending());
        prop_assert_eq!(respond(contract, decision).is_ok(), contract.is_pending());
        prop_assert_eq!(respond(order, decision).is_ok(), order.is_pending());
    }

    /// A new request is blocked iff some existing record is pending or accepted
    #[test]
    fn prop_active_blocks_new_request(existing in prop::collection::vec(invitation_status_strategy(), 0..8)) {
        let blocked = ensure_no_active(existing.clone()).is_err();
        let any_active = existing
            .iter()
            .any(|s| matches!(s, InvitationStatus::Pending | InvitationStatus::Accepted));
        prop_assert_eq!(blocked, any_active);
    }

    /// Closed contracts never block a new offer to the same HHM
    #[test]
    fn prop_closed_contracts_do_not_block(
        closed in prop::collection::vec(
            prop_oneof![Just(ContractStatus::HhmRejected), Just(ContractStatus::AutoCancelled)],
            0..6,
        ),
    ) {
        prop_assert!(ensure_no_active(closed).is_ok());
    }

    /// The response stamp carries the given time and a trimmed, non-blank message
    #[test]
    fn prop_answer_stamps_response(decision in decision_strategy(), message in message_strategy(), offset in 0i64..100_000) {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap() + Duration::seconds(offset);
        let response = answer(ApplicationStatus::Pending, decision, message.clone(), now).unwrap();
        prop_assert_eq!(response.responded_at, now);
        let expected = message.map(|m| m.trim().to_string()).filter(|m| !m.is_empty());
        prop_assert_eq!(response.response_message, expected);
    }

    /// Sender and receiver are the two distinct parties, chosen by the initiator
    #[test]
    fn prop_invitation_parties(initiated_by in initiator_strategy()) {
        let inv = invitation(initiated_by, InvitationStatus::Pending, 0);
        prop_assert_ne!(inv.sender_id(), inv.receiver_id());
        prop_assert!(inv.is_party(inv.sender_id()));
        prop_assert!(inv.is_party(inv.receiver_id()));
        prop_assert!(!inv.is_party(Uuid::new_v4()));
        match initiated_by {
            InvitationInitiator::Factory => prop_assert_eq!(inv.sender_id(), inv.factory_id),
            InvitationInitiator::Hhm => prop_assert_eq!(inv.sender_id(), inv.hhm_id),
        }
    }

    /// Resend is allowed iff pending and the cooldown has fully elapsed
    #[test]
    fn prop_resend_cooldown(
        status in invitation_status_strategy(),
        cooldown in 1i64..7_200,
        elapsed in 0i64..10_000,
    ) {
        let inv = invitation(InvitationInitiator::Factory, status, 0);
        let now = inv.last_sent_at + Duration::seconds(elapsed);
        prop_assert_eq!(inv.can_resend(now, cooldown), status.is_pending() && elapsed >= cooldown);
    }

    /// A factory is associated with exactly the HHMs whose invitations were accepted
    #[test]
    fn prop_associations_follow_acceptance(
        entries in prop::collection::vec((initiator_strategy(), invitation_status_strategy()), 0..8),
    ) {
        let factory_id = Uuid::new_v4();
        let invitations: Vec<Invitation> = entries
            .into_iter()
            .map(|(initiated_by, status)| Invitation {
                factory_id,
                ..invitation(initiated_by, status, 0)
            })
            .collect();

        let associated = associated_parties(&invitations, factory_id);
        let expected: Vec<Uuid> = invitations
            .iter()
            .filter(|i| i.status == InvitationStatus::Accepted)
            .map(|i| i.hhm_id)
            .collect();
        prop_assert_eq!(associated, expected);

        for inv in &invitations {
            let hhm_side = associated_parties(&invitations, inv.hhm_id);
            let accepted = inv.status == InvitationStatus::Accepted;
            prop_assert_eq!(hhm_side, if accepted { vec![factory_id] } else { Vec::new() });
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Factory F1 invites HHM H1, H1 accepts: each side sees the other once
    #[test]
    fn test_factory_invites_hhm_and_hhm_accepts() {
        let mut inv = invitation(InvitationInitiator::Factory, InvitationStatus::Pending, 0);
        let f1 = inv.factory_id;
        let h1 = inv.hhm_id;
        assert_eq!(inv.receiver_id(), h1);

        let now = inv.created_at + Duration::hours(2);
        let response = answer(inv.status, Decision::Accept, Some("Happy to work together".into()), now).unwrap();
        inv.status = response.status;
        inv.responded_at = Some(response.responded_at);
        inv.response_message = response.response_message;

        assert_eq!(inv.status, InvitationStatus::Accepted);
        assert_eq!(inv.responded_at, Some(now));

        let invitations = [inv.clone()];
        assert_eq!(inv.association(), Some((f1, h1)));
        assert_eq!(associated_parties(&invitations, f1), vec![h1]);
        assert_eq!(associated_parties(&invitations, h1), vec![f1]);

        // The accepted invitation now blocks another one between F1 and H1
        assert_eq!(
            ensure_no_active(invitations.iter().map(|i| i.status)),
            Err(WorkflowError::ActiveExists { kind: "invitation" })
        );
        // ...and cannot be answered again
        assert!(respond(inv.status, Decision::Reject).is_err());
    }

    #[test]
    fn test_declined_invitation_allows_new_one() {
        let declined = respond(InvitationStatus::Pending, Decision::Reject).unwrap();
        assert!(ensure_no_active([declined]).is_ok());
    }

    #[test]
    fn test_resend_exactly_at_cooldown() {
        let inv = invitation(InvitationInitiator::Hhm, InvitationStatus::Pending, 0);
        assert!(!inv.can_resend(inv.last_sent_at + Duration::seconds(3599), 3600));
        assert!(inv.can_resend(inv.last_sent_at + Duration::seconds(3600), 3600));
    }

    #[test]
    fn test_error_messages_name_the_kind() {
        let err = respond(OrderStatus::Accepted, Decision::Accept).unwrap_err();
        assert_eq!(err.to_string(), "order already responded (status: accepted)");
        let err = ensure_no_active([ApplicationStatus::Pending]).unwrap_err();
        assert!(err.to_string().contains("application"));
    }
}
