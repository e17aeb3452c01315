//! Suppression of self-caused update notifications
//!
//! The moment the engine mutates a ticket on a user's behalf, an entry is
//! recorded here. A notification for the same (user, ticket) arriving while
//! the entry is younger than the cooldown is an echo and must not be
//! delivered.

use crate::chat::UserId;
use crate::ticketing::TicketId;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct SuppressionEntry {
    ticket_id: TicketId,
    at: Instant,
}

/// At most one active entry per user; a new mutation overwrites the prior
/// one. Entries are age-checked on read and cleared by an expiry timer.
pub struct SuppressionRegistry {
    cooldown: Duration,
    entries: Mutex<HashMap<UserId, SuppressionEntry>>,
}

impl SuppressionRegistry {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Record that the service just mutated `ticket_id` for `user`.
    pub fn mark(&self, user: &UserId, ticket_id: TicketId) {
        self.entries.lock().unwrap().insert(
            user.clone(),
            SuppressionEntry {
                ticket_id,
                at: Instant::now(),
            },
        );
    }

    /// Whether a notification for (user, ticket) should be dropped.
    pub fn is_suppressed(&self, user: &UserId, ticket_id: TicketId) -> bool {
        self.entries
            .lock()
            .unwrap()
            .get(user)
            .is_some_and(|entry| {
                entry.ticket_id == ticket_id && entry.at.elapsed() < self.cooldown
            })
    }

    /// Expiry: remove the entry, but only if it still refers to `ticket_id`
    /// (a newer mutation may have overwritten it).
    pub fn clear_if(&self, user: &UserId, ticket_id: TicketId) {
        let mut entries = self.entries.lock().unwrap();
        if entries
            .get(user)
            .is_some_and(|entry| entry.ticket_id == ticket_id)
        {
            entries.remove(user);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marked_ticket_is_suppressed_within_cooldown() {
        let registry = SuppressionRegistry::new(Duration::from_secs(30));
        let user = "user@c.us".to_string();
        registry.mark(&user, 7);

        assert!(registry.is_suppressed(&user, 7));
        assert!(!registry.is_suppressed(&user, 8));
        assert!(!registry.is_suppressed(&"other@c.us".to_string(), 7));
    }

    #[test]
    fn zero_cooldown_never_suppresses() {
        let registry = SuppressionRegistry::new(Duration::ZERO);
        let user = "user@c.us".to_string();
        registry.mark(&user, 7);
        assert!(!registry.is_suppressed(&user, 7));
    }

    #[test]
    fn newer_mark_overwrites_older_one() {
        let registry = SuppressionRegistry::new(Duration::from_secs(30));
        let user = "user@c.us".to_string();
        registry.mark(&user, 7);
        registry.mark(&user, 9);

        assert!(!registry.is_suppressed(&user, 7));
        assert!(registry.is_suppressed(&user, 9));
    }

    #[test]
    fn clear_if_only_removes_matching_entry() {
        let registry = SuppressionRegistry::new(Duration::from_secs(30));
        let user = "user@c.us".to_string();
        registry.mark(&user, 7);

        registry.clear_if(&user, 3);
        assert!(registry.is_suppressed(&user, 7));

        registry.clear_if(&user, 7);
        assert!(!registry.is_suppressed(&user, 7));
    }
}
