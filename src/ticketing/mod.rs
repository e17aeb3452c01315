//! Ticketing backend gateway
//!
//! Stateless request/response wrapper over the backend's REST API. A flow
//! opens a session, performs one or more operations with the returned token,
//! and closes the session when it ends.

mod client;
mod content;
mod error;
mod types;

pub use client::RestTicketing;
pub use content::{compose_followup_content, compose_ticket_content, file_extension_for_mime};
pub use error::{GatewayError, GatewayErrorKind, GatewayResult};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Operations the conversation engine needs from the ticketing backend.
///
/// Every call may fail with a network or API error; the engine's only
/// required handling is to abort the current flow, release the token, and
/// notify the user.
#[async_trait]
pub trait TicketingGateway: Send + Sync {
    /// Open a backend session and return its token.
    async fn open_session(&self) -> GatewayResult<BackendToken>;

    /// Close a backend session. Idempotent; failures are swallowed.
    async fn close_session(&self, token: &BackendToken);

    /// Find the backend user whose record matches a contact address.
    async fn search_user_by_address(
        &self,
        token: &BackendToken,
        address: &str,
    ) -> GatewayResult<Option<BackendUser>>;

    /// List the open tickets requested by a backend user.
    async fn search_tickets_by_requester(
        &self,
        token: &BackendToken,
        user_id: BackendUserId,
    ) -> GatewayResult<Vec<TicketSummary>>;

    /// Fetch status, content, and timestamps for one ticket.
    async fn get_ticket_detail(
        &self,
        token: &BackendToken,
        id: TicketId,
    ) -> GatewayResult<TicketDetail>;

    /// List the followups recorded on one ticket.
    async fn list_followups(
        &self,
        token: &BackendToken,
        id: TicketId,
    ) -> GatewayResult<Vec<Followup>>;

    /// Create a ticket and return its id.
    async fn create_ticket(&self, token: &BackendToken, ticket: &NewTicket)
        -> GatewayResult<TicketId>;

    /// Mark a ticket closed.
    async fn close_ticket(&self, token: &BackendToken, id: TicketId) -> GatewayResult<()>;

    /// Add a followup to a ticket.
    async fn add_followup(
        &self,
        token: &BackendToken,
        id: TicketId,
        content: &str,
    ) -> GatewayResult<()>;

    /// Upload a document and attach it to a ticket.
    async fn upload_document(
        &self,
        token: &BackendToken,
        id: TicketId,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> GatewayResult<()>;
}

#[async_trait]
impl<T: TicketingGateway + ?Sized> TicketingGateway for Arc<T> {
    async fn open_session(&self) -> GatewayResult<BackendToken> {
        (**self).open_session().await
    }

    async fn close_session(&self, token: &BackendToken) {
        (**self).close_session(token).await;
    }

    async fn search_user_by_address(
        &self,
        token: &BackendToken,
        address: &str,
    ) -> GatewayResult<Option<BackendUser>> {
        (**self).search_user_by_address(token, address).await
    }

    async fn search_tickets_by_requester(
        &self,
        token: &BackendToken,
        user_id: BackendUserId,
    ) -> GatewayResult<Vec<TicketSummary>> {
        (**self).search_tickets_by_requester(token, user_id).await
    }

    async fn get_ticket_detail(
        &self,
        token: &BackendToken,
        id: TicketId,
    ) -> GatewayResult<TicketDetail> {
        (**self).get_ticket_detail(token, id).await
    }

    async fn list_followups(
        &self,
        token: &BackendToken,
        id: TicketId,
    ) -> GatewayResult<Vec<Followup>> {
        (**self).list_followups(token, id).await
    }

    async fn create_ticket(
        &self,
        token: &BackendToken,
        ticket: &NewTicket,
    ) -> GatewayResult<TicketId> {
        (**self).create_ticket(token, ticket).await
    }

    async fn close_ticket(&self, token: &BackendToken, id: TicketId) -> GatewayResult<()> {
        (**self).close_ticket(token, id).await
    }

    async fn add_followup(
        &self,
        token: &BackendToken,
        id: TicketId,
        content: &str,
    ) -> GatewayResult<()> {
        (**self).add_followup(token, id, content).await
    }

    async fn upload_document(
        &self,
        token: &BackendToken,
        id: TicketId,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> GatewayResult<()> {
        (**self)
            .upload_document(token, id, file_name, mime, bytes)
            .await
    }
}
