//! Events that drive a conversation

use super::state::LookupAction;
use crate::chat::MessageBody;
use crate::ticketing::{BackendToken, Followup, TicketDetail, TicketId, TicketSummary};

/// Events that trigger state transitions.
///
/// `Inbound` and `InactivityTimeout` come from the outside world; the rest
/// are completions of gateway effects, fed back by the runtime.
#[derive(Debug, Clone)]
pub enum Event {
    /// A chat turn from the user.
    Inbound {
        body: MessageBody,
        display_name: String,
    },

    /// The inactivity timer fired with no interruption.
    InactivityTimeout,

    /// Open-ticket listing finished; the token stays with the session for
    /// the rest of the flow.
    TicketsListed {
        token: BackendToken,
        tickets: Vec<TicketSummary>,
        action: LookupAction,
    },

    /// No backend user matched the contact address.
    RequesterUnknown { address: String },

    /// The backend user exists but has no open tickets.
    NoOpenTickets,

    /// Detail and followup history for the selected ticket.
    ThreadFetched {
        detail: TicketDetail,
        followups: Vec<Followup>,
    },

    /// Ticket creation succeeded.
    TicketCreated { id: TicketId },

    /// Ticket close succeeded.
    TicketClosed { id: TicketId },

    /// Followup submission succeeded.
    FollowupPosted { id: TicketId },

    /// A gateway operation failed; the flow aborts.
    GatewayFailed,
}
