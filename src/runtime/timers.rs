//! Scheduled-cancelable-task registry
//!
//! One live handle per (user, purpose): scheduling always cancels the prior
//! handle for that key, and cancellation is idempotent. Timers are ordinary
//! spawned tasks that sleep first, so an abort before the deadline means the
//! task never runs.

use crate::chat::UserId;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// What a timer is for. Each purpose has its own slot per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerPurpose {
    /// Force-terminate an idle conversation.
    Inactivity,
    /// Delayed processing of a pending update notification.
    WebhookDelay,
    /// Expiry of a suppression entry.
    SuppressionExpiry,
}

struct TimerSlot {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Registry of live timers, keyed by (user, purpose).
#[derive(Default)]
pub struct TimerRegistry {
    generation: AtomicU64,
    slots: Mutex<HashMap<(UserId, TimerPurpose), TimerSlot>>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay`, replacing (and aborting) any timer already
    /// scheduled for this (user, purpose).
    pub fn schedule<F>(
        self: &Arc<Self>,
        user: &UserId,
        purpose: TimerPurpose,
        delay: Duration,
        task: F,
    ) where
        F: Future<Output = ()> + Send + 'static,
    {
        let key = (user.clone(), purpose);
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);

        let registry = Arc::clone(self);
        let cleanup_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
            registry.finish(&cleanup_key, generation);
        });

        let mut slots = self.slots.lock().unwrap();
        if let Some(prior) = slots.insert(key, TimerSlot { generation, handle }) {
            prior.handle.abort();
        }
    }

    /// Cancel the timer for (user, purpose) if one is scheduled. Idempotent.
    pub fn cancel(&self, user: &UserId, purpose: TimerPurpose) {
        let removed = self.slots.lock().unwrap().remove(&(user.clone(), purpose));
        if let Some(slot) = removed {
            slot.handle.abort();
        }
    }

    /// Drop a slot after its task ran, unless it was replaced meanwhile.
    fn finish(&self, key: &(UserId, TimerPurpose), generation: u64) {
        let mut slots = self.slots.lock().unwrap();
        if slots.get(key).is_some_and(|slot| slot.generation == generation) {
            slots.remove(key);
        }
    }

    #[cfg(test)]
    fn live_count(&self) -> usize {
        self.slots.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn user() -> UserId {
        "user@c.us".to_string()
    }

    #[tokio::test]
    async fn timer_fires_after_delay() {
        let registry = Arc::new(TimerRegistry::new());
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        registry.schedule(
            &user(),
            TimerPurpose::Inactivity,
            Duration::from_millis(10),
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test]
    async fn rescheduling_replaces_the_prior_timer() {
        let registry = Arc::new(TimerRegistry::new());
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = Arc::clone(&fired);
            registry.schedule(
                &user(),
                TimerPurpose::WebhookDelay,
                Duration::from_millis(20),
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                },
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_prevents_firing_and_is_idempotent() {
        let registry = Arc::new(TimerRegistry::new());
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        registry.schedule(
            &user(),
            TimerPurpose::Inactivity,
            Duration::from_millis(20),
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        registry.cancel(&user(), TimerPurpose::Inactivity);
        registry.cancel(&user(), TimerPurpose::Inactivity);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test]
    async fn purposes_do_not_collide() {
        let registry = Arc::new(TimerRegistry::new());
        let fired = Arc::new(AtomicUsize::new(0));

        for purpose in [TimerPurpose::Inactivity, TimerPurpose::WebhookDelay] {
            let counter = Arc::clone(&fired);
            registry.schedule(&user(), purpose, Duration::from_millis(10), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }
}
