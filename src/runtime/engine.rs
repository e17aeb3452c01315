//! Conversation engine runtime
//!
//! Applies the pure transition function to inbound events and executes the
//! resulting effects. Gateway work runs in spawned tasks so one user's
//! network call never blocks another user's turn; completions re-enter the
//! engine as events, and every resume point re-checks that the session still
//! exists before touching it.

use super::sessions::SessionStore;
use super::timers::{TimerPurpose, TimerRegistry};
use crate::address_book::AddressBook;
use crate::chat::{ChatSender, InboundMessage, UserId};
use crate::config::{Config, CATEGORIES};
use crate::messages;
use crate::state_machine::{
    transition, Effect, Event, LookupAction, Session, TicketDraft, TransitionContext, Verdict,
};
use crate::ticketing::{
    compose_followup_content, compose_ticket_content, file_extension_for_mime, GatewayError,
    GatewayErrorKind, NewTicket, TicketSummary, TicketingGateway,
};
use crate::webhook::SuppressionRegistry;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub struct Engine<G, C>
where
    G: TicketingGateway + 'static,
    C: ChatSender + 'static,
{
    config: Config,
    gateway: G,
    chat: C,
    sessions: SessionStore,
    address_book: Arc<AddressBook>,
    suppression: Arc<SuppressionRegistry>,
    timers: Arc<TimerRegistry>,
}

impl<G, C> Engine<G, C>
where
    G: TicketingGateway + 'static,
    C: ChatSender + 'static,
{
    pub fn new(
        config: Config,
        gateway: G,
        chat: C,
        address_book: Arc<AddressBook>,
        suppression: Arc<SuppressionRegistry>,
        timers: Arc<TimerRegistry>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            gateway,
            chat,
            sessions: SessionStore::new(),
            address_book,
            suppression,
            timers,
        })
    }

    #[cfg(test)]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Entry point for one inbound chat turn.
    pub async fn on_message(self: &Arc<Self>, message: InboundMessage) {
        let user = message.sender.clone();

        if !self.sessions.contains(&user) {
            // No session: any inbound event is "start".
            self.sessions
                .insert(user.clone(), Session::new(message.display_name.clone()));
            self.send(&user, &messages::main_menu(&message.display_name))
                .await;
            self.rearm_inactivity(&user);
            return;
        }

        self.apply(
            &user,
            Event::Inbound {
                body: message.body,
                display_name: message.display_name,
            },
        )
        .await;
        self.rearm_inactivity(&user);
    }

    /// Apply one event to a user's session and execute the effects.
    pub async fn apply(self: &Arc<Self>, user: &UserId, event: Event) {
        let Some(session) = self.sessions.get(user) else {
            // The session was torn down while this event was in flight. A
            // listing completion carries a token nobody else will release.
            if let Event::TicketsListed { token, .. } = event {
                tracing::debug!(user = %user, "Session gone; releasing orphaned backend token");
                self.gateway.close_session(&token).await;
            }
            return;
        };

        let context = TransitionContext {
            title_max: self.config.title_max,
            description_min: self.config.description_min,
            categories: CATEGORIES,
            kb_url: &self.config.kb_url,
            known_address: self.address_book.address_of(user),
        };

        let result = transition(&session, &context, event);

        match result.verdict {
            Verdict::Continue(next) => {
                let fresh_token = next.backend_token.clone();
                if !self.sessions.replace_if_present(user, next) {
                    // Torn down while we computed. Release a token acquired
                    // by this very transition; the teardown path never saw it.
                    if let Some(token) = fresh_token {
                        if session.backend_token.as_ref() != Some(&token) {
                            self.gateway.close_session(&token).await;
                        }
                    }
                    return;
                }
            }
            Verdict::End => {
                self.teardown(user).await;
            }
        }

        for effect in result.effects {
            self.run_effect(user, effect).await;
        }
    }

    /// The single teardown path: cancel timers, release the backend token
    /// (exactly once), delete the session record.
    async fn teardown(&self, user: &UserId) {
        self.timers.cancel(user, TimerPurpose::Inactivity);
        if let Some(mut session) = self.sessions.remove(user) {
            if let Some(token) = session.backend_token.take() {
                self.gateway.close_session(&token).await;
            }
            tracing::info!(user = %user, "Session ended");
        }
    }

    /// Cancel and re-arm the user's inactivity timer, if a session is live.
    fn rearm_inactivity(self: &Arc<Self>, user: &UserId) {
        if !self.sessions.contains(user) {
            return;
        }
        let engine = Arc::clone(self);
        let expired_user = user.clone();
        self.timers.schedule(
            user,
            TimerPurpose::Inactivity,
            self.config.inactivity,
            async move {
                tracing::debug!(user = %expired_user, "Inactivity timer fired");
                engine.apply(&expired_user, Event::InactivityTimeout).await;
            },
        );
    }

    fn run_effect<'a>(
        self: &'a Arc<Self>,
        user: &'a UserId,
        effect: Effect,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
        match effect {
            Effect::Reply(text) => self.send(user, &text).await,

            Effect::SaveAddress { address } => {
                if let Err(error) = self.address_book.remember(user, &address) {
                    tracing::error!(user = %user, %error, "Failed to persist contact address");
                }
            }

            Effect::ListTickets { address, action } => {
                let engine = Arc::clone(self);
                let user = user.clone();
                tokio::spawn(async move {
                    let event = engine.do_list_tickets(&address, action).await;
                    engine.apply(&user, event).await;
                    engine.rearm_inactivity(&user);
                });
            }

            Effect::FetchTicketThread { ticket } => {
                let engine = Arc::clone(self);
                let user = user.clone();
                tokio::spawn(async move {
                    let event = engine.do_fetch_thread(&user, &ticket).await;
                    engine.apply(&user, event).await;
                    engine.rearm_inactivity(&user);
                });
            }

            Effect::CreateTicket { draft } => {
                let engine = Arc::clone(self);
                let user = user.clone();
                tokio::spawn(async move {
                    let event = engine.do_create_ticket(&user, draft).await;
                    engine.apply(&user, event).await;
                });
            }

            Effect::CloseTicket { ticket } => {
                let engine = Arc::clone(self);
                let user = user.clone();
                tokio::spawn(async move {
                    let event = engine.do_close_ticket(&user, &ticket).await;
                    engine.apply(&user, event).await;
                });
            }

            Effect::PostFollowup {
                ticket,
                text,
                attachments,
            } => {
                let engine = Arc::clone(self);
                let user = user.clone();
                tokio::spawn(async move {
                    let event = engine
                        .do_post_followup(&user, &ticket, &text, &attachments)
                        .await;
                    engine.apply(&user, event).await;
                });
            }
        }
        })
    }

    // ========================================================================
    // Gateway flows. Each returns the completion event to feed back in.
    // ========================================================================

    async fn do_list_tickets(&self, address: &str, action: LookupAction) -> Event {
        let token = match self.gateway.open_session().await {
            Ok(token) => token,
            Err(error) => {
                warn_gateway("open_session", &error);
                return Event::GatewayFailed;
            }
        };

        let backend_user = match self.gateway.search_user_by_address(&token, address).await {
            Ok(Some(found)) => found,
            Ok(None) => {
                self.gateway.close_session(&token).await;
                return Event::RequesterUnknown {
                    address: address.to_string(),
                };
            }
            Err(error) => {
                warn_gateway("search_user", &error);
                self.gateway.close_session(&token).await;
                return Event::GatewayFailed;
            }
        };

        match self
            .gateway
            .search_tickets_by_requester(&token, backend_user.id)
            .await
        {
            Ok(tickets) if tickets.is_empty() => {
                self.gateway.close_session(&token).await;
                Event::NoOpenTickets
            }
            Ok(tickets) => Event::TicketsListed {
                token,
                tickets,
                action,
            },
            Err(error) => {
                warn_gateway("search_tickets", &error);
                self.gateway.close_session(&token).await;
                Event::GatewayFailed
            }
        }
    }

    async fn do_fetch_thread(&self, user: &UserId, ticket: &TicketSummary) -> Event {
        // The token was stored by the listing step; without it the flow is
        // already broken and aborts.
        let Some(token) = self.sessions.get(user).and_then(|s| s.backend_token) else {
            tracing::warn!(user = %user, "No backend token held for detail fetch");
            return Event::GatewayFailed;
        };

        let detail = self.gateway.get_ticket_detail(&token, ticket.id).await;
        let followups = self.gateway.list_followups(&token, ticket.id).await;
        match (detail, followups) {
            (Ok(detail), Ok(followups)) => Event::ThreadFetched { detail, followups },
            (Err(error), _) | (_, Err(error)) => {
                tracing::warn!(user = %user, ticket = ticket.id, %error, "Thread fetch failed");
                Event::GatewayFailed
            }
        }
    }

    async fn do_create_ticket(&self, user: &UserId, draft: TicketDraft) -> Event {
        let token = match self.gateway.open_session().await {
            Ok(token) => token,
            Err(error) => {
                warn_gateway("open_session", &error);
                return Event::GatewayFailed;
            }
        };

        // Best-effort requester match; the ticket is created either way.
        let requester = match &draft.contact_address {
            Some(address) => match self.gateway.search_user_by_address(&token, address).await {
                Ok(found) => {
                    if found.is_none() {
                        self.send(user, &messages::requester_unmatched_warning(address))
                            .await;
                    }
                    found
                }
                Err(error) => {
                    tracing::warn!(%error, "Requester search failed; creating unlinked ticket");
                    None
                }
            },
            None => None,
        };

        let requester_name = requester
            .as_ref()
            .map(|u| u.display_name.as_str())
            .unwrap_or("Not found");
        let title = draft.title.clone().unwrap_or_default();
        let ticket = NewTicket {
            name: format!("{title} - {} via chat", draft.display_name),
            content: compose_ticket_content(
                requester_name,
                draft.contact_address.as_deref(),
                user,
                draft.description.as_deref().unwrap_or(""),
                &draft.attachments,
            ),
            category_id: draft.category.map(|c| c.backend_id).unwrap_or(0),
            requester: requester.map(|u| u.id),
        };

        let created = self.gateway.create_ticket(&token, &ticket).await;
        let ticket_id = match created {
            Ok(id) => id,
            Err(error) => {
                tracing::warn!(%error, "Ticket creation failed");
                self.gateway.close_session(&token).await;
                return Event::GatewayFailed;
            }
        };

        if let Err(error) = self
            .upload_documents(&token, ticket_id, &draft.attachments)
            .await
        {
            tracing::warn!(ticket = ticket_id, %error, "Attachment upload failed");
            self.gateway.close_session(&token).await;
            return Event::GatewayFailed;
        }

        self.gateway.close_session(&token).await;
        tracing::info!(user = %user, ticket = ticket_id, "Ticket created");
        Event::TicketCreated { id: ticket_id }
    }

    async fn do_close_ticket(&self, user: &UserId, ticket: &TicketSummary) -> Event {
        let Some(token) = self.sessions.get(user).and_then(|s| s.backend_token) else {
            tracing::warn!(user = %user, "No backend token held for ticket close");
            return Event::GatewayFailed;
        };

        if let Err(error) = self.gateway.close_ticket(&token, ticket.id).await {
            tracing::warn!(user = %user, ticket = ticket.id, %error, "Ticket close failed");
            return Event::GatewayFailed;
        }

        // Mark the suppression window so the backend's own notification of
        // this close is not echoed back, and schedule its expiry.
        self.suppression.mark(user, ticket.id);
        let suppression = Arc::clone(&self.suppression);
        let marked_user = user.clone();
        let ticket_id = ticket.id;
        self.timers.schedule(
            user,
            TimerPurpose::SuppressionExpiry,
            self.suppression.cooldown(),
            async move {
                suppression.clear_if(&marked_user, ticket_id);
            },
        );

        tracing::info!(user = %user, ticket = ticket.id, "Ticket closed");
        Event::TicketClosed { id: ticket.id }
    }

    async fn do_post_followup(
        &self,
        user: &UserId,
        ticket: &TicketSummary,
        text: &str,
        attachments: &[crate::chat::AttachmentBlob],
    ) -> Event {
        let Some(token) = self.sessions.get(user).and_then(|s| s.backend_token) else {
            tracing::warn!(user = %user, "No backend token held for followup");
            return Event::GatewayFailed;
        };

        let content = compose_followup_content(text, attachments);
        if let Err(error) = self.gateway.add_followup(&token, ticket.id, &content).await {
            tracing::warn!(user = %user, ticket = ticket.id, %error, "Followup post failed");
            return Event::GatewayFailed;
        }

        if let Err(error) = self.upload_documents(&token, ticket.id, attachments).await {
            tracing::warn!(user = %user, ticket = ticket.id, %error, "Attachment upload failed");
            return Event::GatewayFailed;
        }

        tracing::info!(user = %user, ticket = ticket.id, "Followup posted");
        Event::FollowupPosted { id: ticket.id }
    }

    /// Upload non-image attachments as documents. Images are already inlined
    /// in the HTML body.
    async fn upload_documents(
        &self,
        token: &crate::ticketing::BackendToken,
        ticket_id: crate::ticketing::TicketId,
        attachments: &[crate::chat::AttachmentBlob],
    ) -> crate::ticketing::GatewayResult<()> {
        for (index, attachment) in attachments.iter().enumerate() {
            if attachment.is_image() {
                continue;
            }
            let file_name = format!(
                "attachment_{ticket_id}_{}{}",
                index + 1,
                file_extension_for_mime(&attachment.mime)
            );
            self.gateway
                .upload_document(
                    token,
                    ticket_id,
                    &file_name,
                    &attachment.mime,
                    attachment.bytes.clone(),
                )
                .await?;
        }
        Ok(())
    }

    async fn send(&self, user: &UserId, text: &str) {
        if let Err(error) = self.chat.send(user, text).await {
            tracing::warn!(user = %user, %error, "Failed to send chat message");
        }
    }
}

/// Auth failures mean our tokens are bad, which an operator must fix; other
/// gateway failures are routine.
fn warn_gateway(stage: &str, error: &GatewayError) {
    match error.kind {
        GatewayErrorKind::Auth => {
            tracing::error!(stage, %error, "Backend rejected our credentials");
        }
        _ => tracing::warn!(stage, %error, "Backend call failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::MessageBody;
    use crate::runtime::testing::{MockChat, MockGateway};
    use std::time::Duration;

    const USER: &str = "5511999@c.us";

    fn test_config() -> Config {
        Config {
            backend_url: "http://backend.test/apirest.php".to_string(),
            app_token: "app".to_string(),
            user_token: "usr".to_string(),
            webhook_port: 0,
            address_book_path: String::new(),
            inactivity: Duration::from_secs(300),
            title_max: 70,
            description_min: 20,
            suppression_cooldown: Duration::from_secs(30),
            webhook_delay: Duration::from_millis(30),
            kb_url: "https://example.com/kb".to_string(),
        }
    }

    struct Fixture {
        engine: Arc<Engine<Arc<MockGateway>, Arc<MockChat>>>,
        gateway: Arc<MockGateway>,
        chat: Arc<MockChat>,
        suppression: Arc<SuppressionRegistry>,
        book: Arc<AddressBook>,
    }

    fn fixture(gateway: MockGateway, config: Config) -> Fixture {
        let gateway = Arc::new(gateway);
        let chat = Arc::new(MockChat::new());
        let book = Arc::new(AddressBook::in_memory());
        let suppression = Arc::new(SuppressionRegistry::new(config.suppression_cooldown));
        let engine = Engine::new(
            config,
            gateway.clone(),
            chat.clone(),
            book.clone(),
            suppression.clone(),
            Arc::new(TimerRegistry::new()),
        );
        Fixture {
            engine,
            gateway,
            chat,
            suppression,
            book,
        }
    }

    fn text(text: &str) -> InboundMessage {
        InboundMessage {
            sender: USER.to_string(),
            display_name: "Ada".to_string(),
            body: MessageBody::Text(text.to_string()),
        }
    }

    fn attachment(mime: &str) -> InboundMessage {
        InboundMessage {
            sender: USER.to_string(),
            display_name: "Ada".to_string(),
            body: MessageBody::Attachment {
                bytes: vec![1, 2, 3],
                mime: mime.to_string(),
                caption: None,
            },
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn first_message_greets_with_menu() {
        let f = fixture(MockGateway::new(), test_config());
        f.engine.on_message(text("hello")).await;

        let sent = f.chat.sent_to(&USER.to_string());
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Ada"));
        assert_eq!(f.engine.sessions().len(), 1);
    }

    #[tokio::test]
    async fn full_creation_flow_creates_ticket_and_ends_session() {
        let gateway = MockGateway::new().with_user("ada@example.com", 9, "Ada Lovelace");
        let f = fixture(gateway, test_config());

        f.engine.on_message(text("hello")).await;
        f.engine.on_message(text("1")).await; // open a ticket
        f.engine.on_message(text("2")).await; // category
        f.engine.on_message(text("VPN down")).await; // title
        f.engine
            .on_message(text("cannot reach anything since this morning"))
            .await; // description
        f.engine.on_message(text("ada@example.com")).await; // email
        f.engine.on_message(attachment("application/pdf")).await;
        f.engine.on_message(text("2")).await; // done attaching -> summary
        f.engine.on_message(text("1")).await; // confirm
        settle().await;

        let created = f.gateway.created.lock().unwrap().clone();
        assert_eq!(created.len(), 1);
        assert!(created[0].name.contains("VPN down"));
        assert!(created[0].name.contains("Ada"));
        assert_eq!(created[0].requester, Some(9));

        // The PDF went up as a document with a derived name.
        let uploads = f.gateway.uploads.lock().unwrap().clone();
        assert_eq!(uploads.len(), 1);
        assert!(uploads[0].1.ends_with(".pdf"));

        // Address was remembered, session ended, token released.
        assert_eq!(
            f.book.address_of(&USER.to_string()),
            Some("ada@example.com".to_string())
        );
        assert_eq!(f.engine.sessions().len(), 0);
        assert!(f.gateway.all_tokens_released());
        assert!(f
            .chat
            .last_to(&USER.to_string())
            .unwrap()
            .contains("#1000"));
    }

    #[tokio::test]
    async fn cancel_mid_listing_closes_the_held_token_exactly_once() {
        let gateway = MockGateway::new()
            .with_user("ada@example.com", 9, "Ada Lovelace")
            .with_open_ticket(101, "VPN down");
        let f = fixture(gateway, test_config());
        f.book
            .remember(&USER.to_string(), "ada@example.com")
            .unwrap();

        f.engine.on_message(text("hello")).await;
        f.engine.on_message(text("3")).await;
        settle().await;

        // Mid-flow: token held, listing shown.
        let session = f.engine.sessions().get(&USER.to_string()).unwrap();
        assert!(session.backend_token.is_some());
        assert_eq!(session.found_tickets.len(), 1);

        f.engine.on_message(text("0")).await;

        assert_eq!(f.engine.sessions().len(), 0);
        assert_eq!(f.gateway.close_count(), 1);
        assert!(f.gateway.all_tokens_released());
        assert!(f
            .chat
            .last_to(&USER.to_string())
            .unwrap()
            .contains("cancelled"));
    }

    #[tokio::test]
    async fn consult_flow_shows_thread_and_posts_followup() {
        let gateway = MockGateway::new()
            .with_user("ada@example.com", 9, "Ada Lovelace")
            .with_open_ticket(101, "VPN down");
        let f = fixture(gateway, test_config());
        f.book
            .remember(&USER.to_string(), "ada@example.com")
            .unwrap();

        f.engine.on_message(text("hello")).await;
        f.engine.on_message(text("3")).await;
        settle().await;
        f.engine.on_message(text("1")).await; // select ticket
        settle().await;

        let transcript = f.chat.sent_to(&USER.to_string()).join("\n");
        assert!(transcript.contains("VPN down"));
        assert!(transcript.contains("#101"));

        f.engine.on_message(text("1")).await; // yes, reply
        f.engine.on_message(text("rebooted the router, no change")).await;
        f.engine.on_message(text("2")).await; // no attachments
        settle().await;

        let followups = f.gateway.followups_added.lock().unwrap().clone();
        assert_eq!(followups.len(), 1);
        assert_eq!(followups[0].0, 101);
        assert!(followups[0].1.contains("rebooted the router"));

        assert_eq!(f.engine.sessions().len(), 0);
        assert!(f.gateway.all_tokens_released());
    }

    #[tokio::test]
    async fn close_flow_marks_suppression_window() {
        let gateway = MockGateway::new()
            .with_user("ada@example.com", 9, "Ada Lovelace")
            .with_open_ticket(101, "VPN down");
        let f = fixture(gateway, test_config());
        f.book
            .remember(&USER.to_string(), "ada@example.com")
            .unwrap();

        f.engine.on_message(text("hello")).await;
        f.engine.on_message(text("4")).await;
        settle().await;
        f.engine.on_message(text("1")).await; // pick the ticket to close
        settle().await;

        assert_eq!(f.gateway.closed_tickets.lock().unwrap().clone(), vec![101]);
        assert!(f.suppression.is_suppressed(&USER.to_string(), 101));
        assert_eq!(f.engine.sessions().len(), 0);
        assert!(f.gateway.all_tokens_released());
    }

    #[tokio::test]
    async fn backend_failure_aborts_flow_with_apology() {
        let gateway = MockGateway::new().with_user("ada@example.com", 9, "Ada Lovelace");
        gateway.fail_on("open_session");
        let f = fixture(gateway, test_config());
        f.book
            .remember(&USER.to_string(), "ada@example.com")
            .unwrap();

        f.engine.on_message(text("hello")).await;
        f.engine.on_message(text("3")).await;
        settle().await;

        assert_eq!(f.engine.sessions().len(), 0);
        assert!(f
            .chat
            .last_to(&USER.to_string())
            .unwrap()
            .contains("went wrong"));
    }

    #[tokio::test]
    async fn unknown_requester_ends_flow_informationally() {
        let f = fixture(MockGateway::new(), test_config());
        f.book
            .remember(&USER.to_string(), "ada@example.com")
            .unwrap();

        f.engine.on_message(text("hello")).await;
        f.engine.on_message(text("3")).await;
        settle().await;

        assert_eq!(f.engine.sessions().len(), 0);
        assert!(f.gateway.all_tokens_released());
        assert!(f
            .chat
            .last_to(&USER.to_string())
            .unwrap()
            .contains("ada@example.com"));
    }

    #[tokio::test]
    async fn no_open_tickets_ends_flow() {
        let gateway = MockGateway::new().with_user("ada@example.com", 9, "Ada Lovelace");
        let f = fixture(gateway, test_config());
        f.book
            .remember(&USER.to_string(), "ada@example.com")
            .unwrap();

        f.engine.on_message(text("hello")).await;
        f.engine.on_message(text("3")).await;
        settle().await;

        assert_eq!(f.engine.sessions().len(), 0);
        assert!(f.gateway.all_tokens_released());
        assert!(f
            .chat
            .last_to(&USER.to_string())
            .unwrap()
            .contains("no open tickets"));
    }

    #[tokio::test]
    async fn inactivity_fires_forced_cancellation() {
        let mut config = test_config();
        config.inactivity = Duration::from_millis(30);
        let f = fixture(MockGateway::new(), config);

        f.engine.on_message(text("hello")).await;
        assert_eq!(f.engine.sessions().len(), 1);

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(f.engine.sessions().len(), 0);
        assert!(f
            .chat
            .last_to(&USER.to_string())
            .unwrap()
            .contains("inactivity"));
    }

    #[tokio::test]
    async fn activity_rearms_the_inactivity_timer() {
        let mut config = test_config();
        config.inactivity = Duration::from_millis(80);
        let f = fixture(MockGateway::new(), config);

        f.engine.on_message(text("hello")).await;
        for _ in 0..3 {
            tokio::time::sleep(Duration::from_millis(40)).await;
            f.engine.on_message(text("not a valid option")).await;
        }
        // Elapsed well past the window, but each turn re-armed it.
        assert_eq!(f.engine.sessions().len(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(f.engine.sessions().len(), 0);
    }

    #[tokio::test]
    async fn menu_kb_option_replies_and_ends() {
        let f = fixture(MockGateway::new(), test_config());

        f.engine.on_message(text("hello")).await;
        f.engine.on_message(text("2")).await;

        assert_eq!(f.engine.sessions().len(), 0);
        assert!(f
            .chat
            .last_to(&USER.to_string())
            .unwrap()
            .contains("https://example.com/kb"));

        // Next message starts a fresh session with the menu again.
        f.engine.on_message(text("hi again")).await;
        assert_eq!(f.engine.sessions().len(), 1);
    }

    #[tokio::test]
    async fn image_attachment_is_inlined_not_uploaded() {
        let gateway = MockGateway::new().with_user("ada@example.com", 9, "Ada Lovelace");
        let f = fixture(gateway, test_config());

        f.engine.on_message(text("hello")).await;
        f.engine.on_message(text("1")).await;
        f.engine.on_message(text("1")).await;
        f.engine.on_message(text("Screen glitch")).await;
        f.engine
            .on_message(text("screen flickers whenever I open the editor"))
            .await;
        f.engine.on_message(text("ada@example.com")).await;
        f.engine.on_message(attachment("image/png")).await;
        f.engine.on_message(text("2")).await;
        f.engine.on_message(text("1")).await;
        settle().await;

        let created = f.gateway.created.lock().unwrap().clone();
        assert_eq!(created.len(), 1);
        assert!(created[0].content.contains("data:image/png;base64,"));
        assert!(f.gateway.uploads.lock().unwrap().is_empty());
    }
}
