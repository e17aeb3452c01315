//! Gateway error types

use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Ticketing backend error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Network, message)
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Api, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Auth, message)
    }
}

/// Error classification for the ticketing backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Connection failure or timeout
    Network,
    /// The backend answered with an error status or an unreadable body
    Api,
    /// Session or application token rejected (401, 403)
    Auth,
}
