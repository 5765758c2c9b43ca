//! Property tests over every status, role and target.

#![allow(clippy::unwrap_used)] // Test code

use helpdesk_core::attachment::AttachmentPolicy;
use helpdesk_core::effect::Effect;
use helpdesk_core::lifecycle::{ProductionLifecycleEnvironment, TicketAction, TicketLifecycleReducer};
use helpdesk_core::reducer::Reducer;
use helpdesk_core::{Actor, ExternalId, Role, Ticket, TicketError, TicketId, TicketStatus, UserId};
use helpdesk_testing::properties::{any_role, any_status};
use helpdesk_testing::{draft, test_clock, test_time};
use proptest::prelude::*;
use std::sync::Arc;

fn env() -> ProductionLifecycleEnvironment {
    ProductionLifecycleEnvironment::new(Arc::new(test_clock()), AttachmentPolicy::default())
}

fn ticket(status: TicketStatus, assignee: Option<UserId>) -> Ticket {
    let mut ticket = Ticket::open(TicketId(1), "#2025-001".into(), UserId(1), draft("Door"), test_time());
    ticket.status = status;
    ticket.assignee_id = assignee;
    ticket
}

fn actor(id: i64, role: Role) -> Actor {
    Actor {
        id: UserId(id),
        role,
        external_id: ExternalId(id),
        display_name: format!("actor {id}"),
        username: None,
    }
}

proptest! {
    #[test]
    fn off_table_moves_are_always_invalid(
        from in any_status(),
        to in any_status(),
        role in any_role(),
        actor_id in 1_i64..4,
    ) {
        let mut state = ticket(from, None);
        let result = TicketLifecycleReducer::new().reduce(
            &mut state,
            TicketAction::ChangeStatus { actor: actor(actor_id, role), target: to },
            &env(),
        );

        if from.can_transition_to(to) {
            if let Err(error) = &result {
                prop_assert!(matches!(error, TicketError::Forbidden(_)));
            }
        } else {
            prop_assert_eq!(result.unwrap_err(), TicketError::InvalidTransition { from, to });
        }
    }

    #[test]
    fn accepted_moves_write_exactly_one_system_entry(
        from in any_status(),
        to in any_status(),
        role in any_role(),
        actor_id in 1_i64..4,
    ) {
        let mut state = ticket(from, None);
        let before = state.clone();
        let result = TicketLifecycleReducer::new().reduce(
            &mut state,
            TicketAction::ChangeStatus { actor: actor(actor_id, role), target: to },
            &env(),
        );

        match result {
            Ok(effects) => {
                prop_assert_eq!(state.status, to);
                let appended = effects
                    .iter()
                    .filter(|e| matches!(e, Effect::AppendMessage(_)))
                    .count();
                prop_assert_eq!(appended, 1);
            }
            Err(_) => prop_assert_eq!(state, before),
        }
    }

    #[test]
    fn authors_only_close_from_review_or_reopen(
        from in any_status(),
        to in any_status(),
    ) {
        let mut state = ticket(from, None);
        let accepted = TicketLifecycleReducer::new()
            .reduce(
                &mut state,
                TicketAction::ChangeStatus { actor: actor(1, Role::Author), target: to },
                &env(),
            )
            .is_ok();

        let author_edge = matches!(
            (from, to),
            (TicketStatus::BizReview, TicketStatus::Closed)
                | (TicketStatus::Closed, TicketStatus::Reopened)
        );
        prop_assert_eq!(accepted, author_edge);
    }

    #[test]
    fn assigned_tickets_refuse_every_role(
        status in any_status(),
        role in any_role(),
    ) {
        let mut state = ticket(status, Some(UserId(7)));
        let result = TicketLifecycleReducer::new().reduce(
            &mut state,
            TicketAction::Assign { actor: actor(2, role) },
            &env(),
        );
        prop_assert_eq!(result.unwrap_err(), TicketError::AlreadyAssigned);
        prop_assert_eq!(state.assignee_id, Some(UserId(7)));
    }
}
