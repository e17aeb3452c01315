//! Conversation runtime
//!
//! Owns the mutable per-user registries and executes the effects produced by
//! the pure state machine: outbound sends, address persistence, gateway
//! calls, and timer (re)arming.

mod engine;
mod sessions;
mod timers;

pub mod testing;

pub use engine::Engine;
pub use sessions::SessionStore;
pub use timers::{TimerPurpose, TimerRegistry};
