//! Asynchronous ticket-update notification pipeline
//!
//! Notifications arrive as opaque text bodies, keyed only by the requester
//! address buried in them. The coalescer resolves the address to a chat user,
//! delays processing so self-initiated updates settle, collapses bursts to
//! the latest payload, and drops echoes of the service's own actions.

mod coalescer;
mod parser;
mod suppression;

pub use coalescer::{WebhookCoalescer, WebhookDisposition};
pub use parser::{parse_notification, strip_html, NotificationFields, WebhookParseError};
pub use suppression::SuppressionRegistry;
