//! Delayed, deduplicated notification delivery
//!
//! Accept phase (synchronous with the HTTP request): extract the requester
//! address, resolve it to a chat user, store the payload, and (re)start that
//! user's delay timer. Process phase (when the timer fires uninterrupted):
//! re-parse whatever payload is stored by then, re-resolve the user, apply
//! the suppression check, and deliver at most one message.

use super::parser::{self, WebhookParseError};
use super::suppression::SuppressionRegistry;
use crate::address_book::AddressBook;
use crate::chat::{ChatSender, UserId};
use crate::messages;
use crate::runtime::{TimerPurpose, TimerRegistry};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Outcome of the synchronous accept phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookDisposition {
    /// A delay timer is now pending for the resolved user.
    Scheduled,
    /// The address resolved to nobody; acknowledged and dropped.
    NoRecipient,
}

pub struct WebhookCoalescer {
    delay: Duration,
    chat: Arc<dyn ChatSender>,
    address_book: Arc<AddressBook>,
    suppression: Arc<SuppressionRegistry>,
    timers: Arc<TimerRegistry>,
    /// Latest raw payload per user. A newer notification replaces the stored
    /// payload and restarts the timer; only the latest is ever processed.
    pending: Mutex<HashMap<UserId, String>>,
}

impl WebhookCoalescer {
    pub fn new(
        delay: Duration,
        chat: Arc<dyn ChatSender>,
        address_book: Arc<AddressBook>,
        suppression: Arc<SuppressionRegistry>,
        timers: Arc<TimerRegistry>,
    ) -> Self {
        Self {
            delay,
            chat,
            address_book,
            suppression,
            timers,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Synchronous accept phase. An unextractable address is the only
    /// rejection; an unknown one is accepted and dropped.
    pub fn accept(self: &Arc<Self>, raw: &str) -> Result<WebhookDisposition, WebhookParseError> {
        let address = parser::extract_requester_address(raw)?;

        let Some(user) = self.address_book.user_for_address(&address) else {
            tracing::debug!(address = %address, "No chat user for notification address; dropping");
            return Ok(WebhookDisposition::NoRecipient);
        };

        self.pending
            .lock()
            .unwrap()
            .insert(user.clone(), raw.to_string());

        let coalescer = Arc::clone(self);
        let recipient = user.clone();
        self.timers
            .schedule(&user, TimerPurpose::WebhookDelay, self.delay, async move {
                coalescer.process(&recipient).await;
            });

        Ok(WebhookDisposition::Scheduled)
    }

    /// Delayed processing phase. Every failure here is a silent drop: a
    /// notification carries no delivery obligation.
    async fn process(&self, user: &UserId) {
        let Some(raw) = self.pending.lock().unwrap().remove(user) else {
            return;
        };

        let fields = match parser::parse_notification(&raw) {
            Ok(fields) => fields,
            Err(error) => {
                tracing::debug!(user = %user, %error, "Undeliverable notification payload");
                return;
            }
        };

        let Some(recipient) = self.address_book.user_for_address(&fields.requester_address) else {
            tracing::debug!(
                address = %fields.requester_address,
                "Notification address no longer resolves; dropping"
            );
            return;
        };

        if self.suppression.is_suppressed(&recipient, fields.ticket_id) {
            tracing::debug!(
                user = %recipient,
                ticket = fields.ticket_id,
                "Suppressing echo of our own ticket action"
            );
            return;
        }

        let message = messages::update_notification(fields.ticket_id, &fields.title);
        match self.chat.send(&recipient, &message).await {
            Ok(()) => {
                tracing::info!(user = %recipient, ticket = fields.ticket_id, "Update notification sent");
            }
            Err(error) => {
                tracing::warn!(user = %recipient, %error, "Failed to deliver update notification");
            }
        }
    }

    #[cfg(test)]
    fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}
