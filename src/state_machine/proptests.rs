//! Property-based tests for the validation boundaries

use super::state::{FlowState, Session};
use super::transition::{transition, TransitionContext, Verdict};
use super::Event;
use crate::chat::MessageBody;
use crate::config::CATEGORIES;
use proptest::prelude::*;

const TITLE_MAX: usize = 70;
const DESCRIPTION_MIN: usize = 20;

fn ctx() -> TransitionContext<'static> {
    TransitionContext {
        title_max: TITLE_MAX,
        description_min: DESCRIPTION_MIN,
        categories: CATEGORIES,
        kb_url: "https://example.com/kb",
        known_address: None,
    }
}

fn session_in(state: FlowState) -> Session {
    let mut session = Session::new("prop");
    session.state = state;
    session
}

fn inbound(text: &str) -> Event {
    Event::Inbound {
        body: MessageBody::Text(text.to_string()),
        display_name: "prop".to_string(),
    }
}

proptest! {
    /// A title is accepted exactly when it is non-empty after trimming and
    /// at most TITLE_MAX characters long.
    #[test]
    fn title_acceptance_boundary(text in "\\PC{0,100}") {
        // "0" is the cancel token, not a title.
        prop_assume!(text.trim() != "0");

        let result = transition(&session_in(FlowState::AwaitingTitle), &ctx(), inbound(&text));
        let accepted = match result.verdict {
            Verdict::Continue(session) => session.state == FlowState::AwaitingDescription,
            Verdict::End => false,
        };

        let expected = !text.trim().is_empty() && text.chars().count() <= TITLE_MAX;
        prop_assert_eq!(accepted, expected);
    }

    /// A description is accepted exactly when its trimmed length reaches
    /// DESCRIPTION_MIN characters.
    #[test]
    fn description_acceptance_boundary(text in "\\PC{0,100}") {
        prop_assume!(text.trim() != "0");

        let result = transition(
            &session_in(FlowState::AwaitingDescription),
            &ctx(),
            inbound(&text),
        );
        let accepted = match result.verdict {
            Verdict::Continue(session) => session.state != FlowState::AwaitingDescription,
            Verdict::End => false,
        };

        let expected = text.trim().chars().count() >= DESCRIPTION_MIN;
        prop_assert_eq!(accepted, expected);
    }

    /// Selection inputs outside 1..=len never change state or pick a ticket.
    #[test]
    fn selection_out_of_range_never_advances(choice in 0usize..100, len in 0usize..5) {
        prop_assume!(choice != 0); // cancel token
        prop_assume!(choice < 1 || choice > len);

        let mut session = session_in(FlowState::AwaitingTicketSelection);
        session.found_tickets = (0..len)
            .map(|i| crate::ticketing::TicketSummary {
                id: i as u64 + 1,
                title: format!("t{i}"),
            })
            .collect();

        let result = transition(&session, &ctx(), inbound(&choice.to_string()));
        match result.verdict {
            Verdict::Continue(next) => {
                prop_assert_eq!(next.state, FlowState::AwaitingTicketSelection);
                prop_assert!(next.selected_ticket.is_none());
            }
            Verdict::End => prop_assert!(false, "selection must not end the session"),
        }
    }
}
