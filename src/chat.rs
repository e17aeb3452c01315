//! Chat transport boundary
//!
//! The transport connection itself (pairing, reconnection) lives outside this
//! service; these are the types it delivers and the trait it must implement
//! to carry messages back out.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Opaque handle for a chat participant. All per-user state is keyed by it.
pub type UserId = String;

/// Body of an inbound chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Text(String),
    Attachment {
        bytes: Vec<u8>,
        mime: String,
        /// Text sent alongside the file, if any.
        caption: Option<String>,
    },
}

impl MessageBody {
    /// The textual content of this turn, normalized for token matching.
    pub fn normalized_text(&self) -> Option<String> {
        let text = match self {
            MessageBody::Text(t) => Some(t.as_str()),
            MessageBody::Attachment { caption, .. } => caption.as_deref(),
        };
        text.map(|t| t.trim().to_lowercase())
    }

    /// The raw textual content of this turn, untrimmed.
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            MessageBody::Text(t) => Some(t.as_str()),
            MessageBody::Attachment { caption, .. } => caption.as_deref(),
        }
    }
}

/// A binary attachment captured from a chat turn and held in a ticket draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentBlob {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl AttachmentBlob {
    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

/// One inbound event from the chat transport.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub sender: UserId,
    pub display_name: String,
    pub body: MessageBody,
}

/// Failure to deliver an outbound message.
#[derive(Debug, Error)]
#[error("chat send failed: {0}")]
pub struct ChatError(pub String);

/// Outbound side of the chat transport.
#[async_trait]
pub trait ChatSender: Send + Sync {
    /// Deliver a text message to a chat participant.
    async fn send(&self, to: &UserId, text: &str) -> Result<(), ChatError>;
}

#[async_trait]
impl<T: ChatSender + ?Sized> ChatSender for Arc<T> {
    async fn send(&self, to: &UserId, text: &str) -> Result<(), ChatError> {
        (**self).send(to, text).await
    }
}

/// Transport that logs outbound messages instead of delivering them.
///
/// Used for demos and when no real transport is wired up.
pub struct ConsoleChat;

#[async_trait]
impl ChatSender for ConsoleChat {
    async fn send(&self, to: &UserId, text: &str) -> Result<(), ChatError> {
        tracing::info!(channel = "console", to = %to, "outbound: {text}");
        Ok(())
    }
}
