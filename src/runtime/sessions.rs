//! In-memory session store

use crate::chat::UserId;
use crate::state_machine::Session;
use std::collections::HashMap;
use std::sync::Mutex;

/// Map from user identity to live conversation, owned by the engine.
///
/// Locks are never held across awaits; callers work on cloned snapshots and
/// write back with `replace_if_present`, which fails when the session was
/// torn down in the meantime.
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<UserId, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user: &UserId) -> Option<Session> {
        self.inner.lock().unwrap().get(user).cloned()
    }

    pub fn contains(&self, user: &UserId) -> bool {
        self.inner.lock().unwrap().contains_key(user)
    }

    pub fn insert(&self, user: UserId, session: Session) {
        self.inner.lock().unwrap().insert(user, session);
    }

    /// Replace the stored session, but only if one still exists for the
    /// user. Returns whether the write happened.
    pub fn replace_if_present(&self, user: &UserId, session: Session) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.get_mut(user) {
            Some(slot) => {
                *slot = session;
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, user: &UserId) -> Option<Session> {
        self.inner.lock().unwrap().remove(user)
    }

    #[allow(dead_code)] // Used by tests to assert teardown
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::FlowState;

    #[test]
    fn replace_fails_after_removal() {
        let store = SessionStore::new();
        let user = "user@c.us".to_string();
        store.insert(user.clone(), Session::new("Ada"));

        let mut session = store.get(&user).unwrap();
        session.state = FlowState::AwaitingCategory;

        store.remove(&user);
        assert!(!store.replace_if_present(&user, session));
        assert_eq!(store.len(), 0);
    }
}
