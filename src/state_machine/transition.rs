//! Pure state transition function
//!
//! Maps (session, event) to a verdict plus effects. No I/O happens here;
//! given the same inputs it always produces the same outputs.

use super::state::{FlowState, LookupAction, Session};
use super::{Effect, Event};
use crate::chat::{AttachmentBlob, MessageBody};
use crate::config::Category;
use crate::messages;
use crate::webhook::strip_html;
use regex::Regex;
use std::sync::OnceLock;

/// Control token that aborts any flow from any state.
pub const CANCEL_TOKEN: &str = "0";

/// Immutable per-transition context supplied by the runtime.
#[derive(Debug, Clone)]
pub struct TransitionContext<'a> {
    pub title_max: usize,
    pub description_min: usize,
    pub categories: &'a [Category],
    pub kb_url: &'a str,
    /// Address already on file for this user, if any.
    pub known_address: Option<String>,
}

/// What happens to the session record.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Keep the session, replacing it with this value.
    Continue(Session),
    /// Delete the session. The runtime releases the backend token (exactly
    /// once) and cancels the inactivity timer.
    End,
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub verdict: Verdict,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    fn stay(session: &Session) -> Self {
        Self {
            verdict: Verdict::Continue(session.clone()),
            effects: vec![],
        }
    }

    fn advance(session: Session) -> Self {
        Self {
            verdict: Verdict::Continue(session),
            effects: vec![],
        }
    }

    fn end() -> Self {
        Self {
            verdict: Verdict::End,
            effects: vec![],
        }
    }

    fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    fn reply(self, text: String) -> Self {
        self.with_effect(Effect::Reply(text))
    }
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9-]+(\.[a-z0-9-]+)*\.[a-z]{2,}$").expect("valid regex")
    })
}

/// Shape check for contact addresses (local "@" domain "." tld).
pub fn is_valid_address(address: &str) -> bool {
    email_re().is_match(address)
}

fn is_supported_attachment(mime: &str) -> bool {
    mime.starts_with("image/") || mime.starts_with("application/")
}

/// Pure transition function.
///
/// The cancel token is checked before any state-specific dispatch and
/// short-circuits it.
pub fn transition(session: &Session, ctx: &TransitionContext, event: Event) -> TransitionResult {
    match event {
        Event::Inbound { body, display_name } => {
            let normalized = body.normalized_text();
            // Text-only: an attachment whose caption happens to be the token
            // is still an attachment.
            if matches!(body, MessageBody::Text(_)) && normalized.as_deref() == Some(CANCEL_TOKEN) {
                return TransitionResult::end().reply(messages::cancelled());
            }

            let mut next = session.clone();
            next.draft.display_name = display_name;
            handle_inbound(next, ctx, &body, normalized.as_deref())
        }

        Event::InactivityTimeout => TransitionResult::end().reply(messages::session_expired()),

        Event::TicketsListed {
            token,
            tickets,
            action,
        } => {
            let verb = messages::action_verb(matches!(action, LookupAction::Close));
            let listing = messages::ticket_list(&tickets, verb);
            let mut next = session.clone();
            next.backend_token = Some(token);
            next.found_tickets = tickets;
            next.state = match action {
                LookupAction::View => FlowState::AwaitingTicketSelection,
                LookupAction::Close => FlowState::AwaitingTicketToCancel,
            };
            TransitionResult::advance(next).reply(listing)
        }

        Event::RequesterUnknown { address } => {
            TransitionResult::end().reply(messages::requester_unknown(&address))
        }

        Event::NoOpenTickets => TransitionResult::end().reply(messages::no_open_tickets()),

        Event::ThreadFetched { detail, followups } => {
            let Some(ticket) = session.selected_ticket.clone() else {
                // Detail arrived for a flow that lost its selection.
                return TransitionResult::end().reply(messages::backend_failure());
            };

            let description = strip_html(&detail.content);
            let mut history: Vec<(String, String)> = followups
                .iter()
                .map(|f| (f.created_at.clone(), strip_html(&f.content)))
                .filter(|(_, text)| !text.is_empty())
                .collect();
            history.sort_by(|a, b| a.0.cmp(&b.0));

            let mut next = session.clone();
            next.state = FlowState::AwaitingFollowupDecision;
            TransitionResult::advance(next)
                .reply(messages::ticket_detail(
                    &ticket,
                    &detail,
                    &description,
                    &history,
                ))
                .reply(messages::followup_decision())
        }

        Event::TicketCreated { id } => TransitionResult::end().reply(messages::ticket_created(id)),

        Event::TicketClosed { id } => TransitionResult::end().reply(messages::ticket_closed(id)),

        Event::FollowupPosted { id } => {
            TransitionResult::end().reply(messages::followup_posted(id))
        }

        Event::GatewayFailed => TransitionResult::end().reply(messages::backend_failure()),
    }
}

/// State-specific dispatch for a chat turn. `next` starts as a copy of the
/// current session with the display name refreshed.
fn handle_inbound(
    mut next: Session,
    ctx: &TransitionContext,
    body: &MessageBody,
    normalized: Option<&str>,
) -> TransitionResult {
    match next.state {
        FlowState::Menu => match normalized {
            Some("1") => {
                next.state = FlowState::AwaitingCategory;
                TransitionResult::advance(next).reply(messages::category_list(ctx.categories))
            }
            Some("2") => TransitionResult::end().reply(messages::kb_link(ctx.kb_url)),
            Some("3") | Some("4") => {
                let action = if normalized == Some("3") {
                    LookupAction::View
                } else {
                    LookupAction::Close
                };
                match &ctx.known_address {
                    Some(address) => TransitionResult::stay(&next)
                        .reply(messages::searching_tickets(address))
                        .with_effect(Effect::ListTickets {
                            address: address.clone(),
                            action,
                        }),
                    None => {
                        next.state = FlowState::AwaitingEmailForFlow { action };
                        let verb = messages::action_verb(matches!(action, LookupAction::Close));
                        TransitionResult::advance(next)
                            .reply(messages::email_prompt_for_flow(verb))
                    }
                }
            }
            _ => TransitionResult::stay(&next).reply(messages::invalid_menu_option()),
        },

        FlowState::AwaitingCategory => {
            let choice = normalized.and_then(|t| t.parse::<usize>().ok());
            match choice.and_then(|c| (1..=ctx.categories.len()).contains(&c).then(|| c - 1)) {
                Some(index) => {
                    next.draft.category = Some(ctx.categories[index]);
                    next.state = FlowState::AwaitingTitle;
                    TransitionResult::advance(next).reply(messages::title_prompt(ctx.title_max))
                }
                None => TransitionResult::stay(&next)
                    .reply(messages::invalid_category(ctx.categories.len())),
            }
        }

        FlowState::AwaitingTitle => {
            let text = body.raw_text().unwrap_or("");
            if text.trim().is_empty() {
                return TransitionResult::stay(&next).reply(messages::title_empty());
            }
            let length = text.chars().count();
            if length > ctx.title_max {
                return TransitionResult::stay(&next)
                    .reply(messages::title_too_long(ctx.title_max, length));
            }
            next.draft.title = Some(text.to_string());
            next.state = FlowState::AwaitingDescription;
            TransitionResult::advance(next).reply(messages::description_prompt(ctx.description_min))
        }

        FlowState::AwaitingDescription => {
            let text = body.raw_text().unwrap_or("");
            let trimmed_length = text.trim().chars().count();
            if trimmed_length < ctx.description_min {
                return TransitionResult::stay(&next)
                    .reply(messages::description_too_short(
                        ctx.description_min,
                        trimmed_length,
                    ));
            }
            next.draft.description = Some(text.to_string());
            match &ctx.known_address {
                Some(address) => {
                    next.state = FlowState::AwaitingEmailConfirmation;
                    let prompt = messages::email_confirm(address);
                    TransitionResult::advance(next).reply(prompt)
                }
                None => {
                    next.state = FlowState::AwaitingEmail;
                    TransitionResult::advance(next).reply(messages::email_prompt())
                }
            }
        }

        FlowState::AwaitingEmailConfirmation => match normalized {
            Some("1") => match ctx.known_address.clone() {
                Some(address) => {
                    next.draft.contact_address = Some(address);
                    next.draft.attachments.clear();
                    next.state = FlowState::AwaitingAttachmentOption;
                    TransitionResult::advance(next).reply(messages::attachment_prompt())
                }
                None => {
                    // The stored address vanished between turns; ask for it.
                    next.state = FlowState::AwaitingEmail;
                    TransitionResult::advance(next).reply(messages::email_prompt())
                }
            },
            Some("2") => {
                next.state = FlowState::AwaitingEmail;
                TransitionResult::advance(next).reply(messages::email_prompt())
            }
            _ => TransitionResult::stay(&next).reply(messages::yes_or_no()),
        },

        FlowState::AwaitingEmail => match normalized {
            Some(address) if is_valid_address(address) => {
                let address = address.to_string();
                next.draft.contact_address = Some(address.clone());
                next.draft.attachments.clear();
                next.state = FlowState::AwaitingAttachmentOption;
                TransitionResult::advance(next)
                    .with_effect(Effect::SaveAddress { address })
                    .reply(messages::attachment_prompt())
            }
            _ => TransitionResult::stay(&next).reply(messages::email_invalid()),
        },

        FlowState::AwaitingEmailForFlow { action } => match normalized {
            Some(address) if is_valid_address(address) => {
                let address = address.to_string();
                TransitionResult::stay(&next)
                    .with_effect(Effect::SaveAddress {
                        address: address.clone(),
                    })
                    .reply(messages::searching_tickets(&address))
                    .with_effect(Effect::ListTickets { address, action })
            }
            _ => TransitionResult::stay(&next).reply(messages::email_invalid()),
        },

        FlowState::AwaitingAttachmentOption => handle_attachment_turn(
            next,
            body,
            normalized,
            messages::attachment_received(),
            |mut session| {
                let category = session
                    .draft
                    .category
                    .map(|c| c.label)
                    .unwrap_or("-")
                    .to_string();
                let title = session.draft.title.clone().unwrap_or_default();
                let description = session.draft.description.clone().unwrap_or_default();
                session.state = FlowState::AwaitingCreationConfirmation;
                TransitionResult::advance(session)
                    .reply(messages::ticket_summary(&category, &title, &description))
            },
        ),

        FlowState::AwaitingCreationConfirmation => match normalized {
            Some("1") => {
                let draft = next.draft.clone();
                TransitionResult::stay(&next)
                    .reply(messages::creating_ticket())
                    .with_effect(Effect::CreateTicket { draft })
            }
            Some("2") => TransitionResult::end().reply(messages::creation_discarded()),
            _ => TransitionResult::stay(&next).reply(messages::yes_or_no()),
        },

        FlowState::AwaitingTicketSelection => match select_ticket(&next, normalized) {
            Some(ticket) => {
                next.selected_ticket = Some(ticket.clone());
                TransitionResult::advance(next)
                    .reply(messages::fetching_detail(ticket.id))
                    .with_effect(Effect::FetchTicketThread { ticket })
            }
            None => {
                let count = next.found_tickets.len();
                TransitionResult::stay(&next).reply(messages::invalid_selection(count))
            }
        },

        FlowState::AwaitingTicketToCancel => match select_ticket(&next, normalized) {
            Some(ticket) => {
                next.selected_ticket = Some(ticket.clone());
                TransitionResult::advance(next)
                    .reply(messages::closing_ticket(ticket.id))
                    .with_effect(Effect::CloseTicket { ticket })
            }
            None => {
                let count = next.found_tickets.len();
                TransitionResult::stay(&next).reply(messages::invalid_selection(count))
            }
        },

        FlowState::AwaitingFollowupDecision => match normalized {
            Some("1") => {
                next.state = FlowState::AwaitingFollowupText;
                TransitionResult::advance(next).reply(messages::followup_text_prompt())
            }
            Some("2") => TransitionResult::end().reply(messages::consultation_done()),
            _ => TransitionResult::stay(&next).reply(messages::yes_or_no()),
        },

        FlowState::AwaitingFollowupText => {
            let text = body.raw_text().unwrap_or("").trim();
            if text.is_empty() {
                return TransitionResult::stay(&next).reply(messages::followup_text_prompt());
            }
            next.followup_text = Some(text.to_string());
            next.draft.attachments.clear();
            next.state = FlowState::AwaitingFollowupAttachmentOption;
            TransitionResult::advance(next).reply(messages::followup_attachment_prompt())
        }

        FlowState::AwaitingFollowupAttachmentOption => handle_attachment_turn(
            next,
            body,
            normalized,
            messages::followup_attachment_received(),
            |session| {
                let Some(ticket) = session.selected_ticket.clone() else {
                    return TransitionResult::end().reply(messages::backend_failure());
                };
                let text = session.followup_text.clone().unwrap_or_default();
                let attachments = session.draft.attachments.clone();
                TransitionResult::stay(&session)
                    .reply(messages::sending_followup(ticket.id))
                    .with_effect(Effect::PostFollowup {
                        ticket,
                        text,
                        attachments,
                    })
            },
        ),
    }
}

/// Shared attachment-accumulation step: a recognized binary attachment is
/// always accepted (any text alongside is ignored) and the state re-entered;
/// "1" re-prompts for the file; "2" advances; anything else is invalid.
fn handle_attachment_turn(
    mut session: Session,
    body: &MessageBody,
    normalized: Option<&str>,
    received_message: String,
    advance: impl FnOnce(Session) -> TransitionResult,
) -> TransitionResult {
    if let MessageBody::Attachment { bytes, mime, .. } = body {
        if is_supported_attachment(mime) {
            session.draft.attachments.push(AttachmentBlob {
                bytes: bytes.clone(),
                mime: mime.clone(),
            });
            return TransitionResult::advance(session).reply(received_message);
        }
    }

    match normalized {
        Some("1") => TransitionResult::stay(&session).reply(messages::attachment_go_ahead()),
        Some("2") => advance(session),
        _ => TransitionResult::stay(&session).reply(messages::attachment_invalid()),
    }
}

/// Parse a 1-based list selection against the session's found tickets.
fn select_ticket(
    session: &Session,
    normalized: Option<&str>,
) -> Option<crate::ticketing::TicketSummary> {
    let choice = normalized?.parse::<usize>().ok()?;
    if choice < 1 || choice > session.found_tickets.len() {
        return None;
    }
    Some(session.found_tickets[choice - 1].clone())
}
