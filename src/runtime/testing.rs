//! Mock implementations for testing
//!
//! These mocks enable engine and coalescer tests without real I/O.

use crate::chat::{ChatError, ChatSender, UserId};
use crate::ticketing::{
    BackendToken, BackendUser, BackendUserId, Followup, GatewayError, GatewayResult, NewTicket,
    TicketDetail, TicketId, TicketSummary, TicketingGateway,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

// ============================================================================
// Mock chat transport
// ============================================================================

/// Chat sender that records every outbound message.
#[allow(dead_code)]
#[derive(Default)]
pub struct MockChat {
    sent: Mutex<Vec<(UserId, String)>>,
}

#[allow(dead_code)]
impl MockChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent to one user, in order.
    pub fn sent_to(&self, user: &UserId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == user)
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// All recorded (recipient, text) pairs.
    pub fn all_sent(&self) -> Vec<(UserId, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// The last message sent to a user.
    pub fn last_to(&self, user: &UserId) -> Option<String> {
        self.sent_to(user).pop()
    }
}

#[async_trait]
impl ChatSender for MockChat {
    async fn send(&self, to: &UserId, text: &str) -> Result<(), ChatError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.clone(), text.to_string()));
        Ok(())
    }
}

// ============================================================================
// Mock ticketing gateway
// ============================================================================

/// Gateway with scripted data and full call recording.
#[allow(dead_code)]
#[derive(Default)]
pub struct MockGateway {
    token_counter: AtomicU64,
    ticket_counter: AtomicU64,
    /// Operations that should fail with a network error.
    failing: Mutex<HashSet<&'static str>>,
    /// contact address → backend user
    pub users: Mutex<HashMap<String, BackendUser>>,
    /// open tickets returned for any requester
    pub open_tickets: Mutex<Vec<TicketSummary>>,
    /// ticket id → detail
    pub details: Mutex<HashMap<TicketId, TicketDetail>>,

    pub opened: Mutex<Vec<BackendToken>>,
    pub closed_sessions: Mutex<Vec<BackendToken>>,
    pub created: Mutex<Vec<NewTicket>>,
    pub closed_tickets: Mutex<Vec<TicketId>>,
    pub followups_added: Mutex<Vec<(TicketId, String)>>,
    pub uploads: Mutex<Vec<(TicketId, String, String)>>,
}

#[allow(dead_code)]
impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend user for an address.
    pub fn with_user(self, address: &str, id: BackendUserId, name: &str) -> Self {
        self.users.lock().unwrap().insert(
            address.to_string(),
            BackendUser {
                id,
                display_name: name.to_string(),
            },
        );
        self
    }

    /// Register an open ticket.
    pub fn with_open_ticket(self, id: TicketId, title: &str) -> Self {
        self.open_tickets.lock().unwrap().push(TicketSummary {
            id,
            title: title.to_string(),
        });
        self.details.lock().unwrap().insert(
            id,
            TicketDetail {
                status: 2,
                content: format!("<p>{title}</p>"),
                created_at: "2026-01-10 09:00:00".to_string(),
                updated_at: "2026-01-11 10:00:00".to_string(),
            },
        );
        self
    }

    /// Make one operation fail with a network error.
    pub fn fail_on(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    fn check_failure(&self, operation: &'static str) -> GatewayResult<()> {
        if self.failing.lock().unwrap().contains(operation) {
            Err(GatewayError::network(format!("mock failure in {operation}")))
        } else {
            Ok(())
        }
    }

    /// Number of `close_session` calls recorded.
    pub fn close_count(&self) -> usize {
        self.closed_sessions.lock().unwrap().len()
    }

    /// Every opened token was closed exactly once.
    pub fn all_tokens_released(&self) -> bool {
        let opened = self.opened.lock().unwrap().clone();
        let closed = self.closed_sessions.lock().unwrap().clone();
        opened.len() == closed.len()
            && opened.iter().all(|token| closed.contains(token))
    }
}

#[async_trait]
impl TicketingGateway for MockGateway {
    async fn open_session(&self) -> GatewayResult<BackendToken> {
        self.check_failure("open_session")?;
        let n = self.token_counter.fetch_add(1, Ordering::SeqCst);
        let token = BackendToken(format!("tok-{n}"));
        self.opened.lock().unwrap().push(token.clone());
        Ok(token)
    }

    async fn close_session(&self, token: &BackendToken) {
        self.closed_sessions.lock().unwrap().push(token.clone());
    }

    async fn search_user_by_address(
        &self,
        _token: &BackendToken,
        address: &str,
    ) -> GatewayResult<Option<BackendUser>> {
        self.check_failure("search_user_by_address")?;
        Ok(self.users.lock().unwrap().get(address).cloned())
    }

    async fn search_tickets_by_requester(
        &self,
        _token: &BackendToken,
        _user_id: BackendUserId,
    ) -> GatewayResult<Vec<TicketSummary>> {
        self.check_failure("search_tickets_by_requester")?;
        Ok(self.open_tickets.lock().unwrap().clone())
    }

    async fn get_ticket_detail(
        &self,
        _token: &BackendToken,
        id: TicketId,
    ) -> GatewayResult<TicketDetail> {
        self.check_failure("get_ticket_detail")?;
        self.details
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| GatewayError::api(format!("no such ticket {id}")))
    }

    async fn list_followups(
        &self,
        _token: &BackendToken,
        _id: TicketId,
    ) -> GatewayResult<Vec<Followup>> {
        self.check_failure("list_followups")?;
        Ok(vec![])
    }

    async fn create_ticket(
        &self,
        _token: &BackendToken,
        ticket: &NewTicket,
    ) -> GatewayResult<TicketId> {
        self.check_failure("create_ticket")?;
        self.created.lock().unwrap().push(ticket.clone());
        Ok(1000 + self.ticket_counter.fetch_add(1, Ordering::SeqCst))
    }

    async fn close_ticket(&self, _token: &BackendToken, id: TicketId) -> GatewayResult<()> {
        self.check_failure("close_ticket")?;
        self.closed_tickets.lock().unwrap().push(id);
        Ok(())
    }

    async fn add_followup(
        &self,
        _token: &BackendToken,
        id: TicketId,
        content: &str,
    ) -> GatewayResult<()> {
        self.check_failure("add_followup")?;
        self.followups_added
            .lock()
            .unwrap()
            .push((id, content.to_string()));
        Ok(())
    }

    async fn upload_document(
        &self,
        _token: &BackendToken,
        id: TicketId,
        file_name: &str,
        mime: &str,
        _bytes: Vec<u8>,
    ) -> GatewayResult<()> {
        self.check_failure("upload_document")?;
        self.uploads
            .lock()
            .unwrap()
            .push((id, file_name.to_string(), mime.to_string()));
        Ok(())
    }
}
