//! Conversation session types

use crate::chat::AttachmentBlob;
use crate::config::Category;
use crate::ticketing::{BackendToken, TicketSummary};

/// Which flow asked for the open-ticket listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupAction {
    /// Option 3: view details and optionally reply.
    View,
    /// Option 4: pick a ticket to close.
    Close,
}

/// Current step of a conversation.
///
/// Terminal is not a variant: reaching it deletes the session record, so an
/// existing session is always in one of these states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Menu,
    AwaitingCategory,
    AwaitingTitle,
    AwaitingDescription,
    AwaitingEmailConfirmation,
    AwaitingEmail,
    AwaitingAttachmentOption,
    AwaitingCreationConfirmation,
    AwaitingEmailForFlow { action: LookupAction },
    AwaitingTicketSelection,
    AwaitingTicketToCancel,
    AwaitingFollowupDecision,
    AwaitingFollowupText,
    AwaitingFollowupAttachmentOption,
}

/// Draft accumulated during the creation flow. The followup flow reuses the
/// attachment list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketDraft {
    pub category: Option<Category>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub contact_address: Option<String>,
    pub attachments: Vec<AttachmentBlob>,
    pub display_name: String,
}

/// One user's live conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub state: FlowState,
    pub draft: TicketDraft,
    /// Backend session credential held across the turns of one flow.
    /// Released through exactly one close on every exit path.
    pub backend_token: Option<BackendToken>,
    /// Snapshot of the last open-ticket search, shown 1-based.
    pub found_tickets: Vec<TicketSummary>,
    pub selected_ticket: Option<TicketSummary>,
    pub followup_text: Option<String>,
}

impl Session {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            state: FlowState::Menu,
            draft: TicketDraft {
                display_name: display_name.into(),
                ..TicketDraft::default()
            },
            backend_token: None,
            found_tickets: Vec::new(),
            selected_ticket: None,
            followup_text: None,
        }
    }
}
