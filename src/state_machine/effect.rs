//! Effects produced by state transitions

use super::state::{LookupAction, TicketDraft};
use crate::chat::AttachmentBlob;
use crate::ticketing::TicketSummary;

/// Effects to be executed by the runtime after a transition.
///
/// Gateway effects run as background tasks; their completions come back as
/// events (`TicketsListed`, `TicketCreated`, `GatewayFailed`, ...).
#[derive(Debug, Clone)]
pub enum Effect {
    /// Send a text message to the session's user.
    Reply(String),

    /// Persist a verified contact address for the session's user.
    SaveAddress { address: String },

    /// Open a backend session and list the user's open tickets.
    ListTickets {
        address: String,
        action: LookupAction,
    },

    /// Fetch detail and followups for a ticket, using the held token.
    FetchTicketThread { ticket: TicketSummary },

    /// Create a ticket from the accumulated draft (opens and closes its own
    /// backend session).
    CreateTicket { draft: TicketDraft },

    /// Close a ticket using the held token and mark the suppression window.
    CloseTicket { ticket: TicketSummary },

    /// Post a followup (and upload its documents) using the held token.
    PostFollowup {
        ticket: TicketSummary,
        text: String,
        attachments: Vec<AttachmentBlob>,
    },
}
