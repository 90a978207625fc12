//! Error types for the game hub.
//!
//! Each layer of the hub has its own error enum so callers can tell a
//! malformed frame apart from an engine rejection or a dead session. None of
//! these errors terminate a session's event loop; they are surfaced to the
//! affected clients as `error` envelopes or end a single connection.

use thiserror::Error;

/// Top-level server errors raised while binding or serving.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures while decoding an inbound client frame.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Invalid payload for '{kind}': {reason}")]
    InvalidPayload { kind: &'static str, reason: String },
}

/// Rejections reported by a rules engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid move notation: {0}")]
    InvalidNotation(String),
    #[error("illegal move: {0}")]
    IllegalMove(String),
    #[error("invalid position: {0}")]
    InvalidPosition(String),
}

/// Errors returned by a [`SessionHandle`](crate::session::SessionHandle).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session's event loop has stopped and no longer accepts events.
    #[error("session {0} is closed")]
    Closed(String),
}

/// Errors returned by the [`SessionRegistry`](crate::registry::SessionRegistry).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry: could not find session with id: {0}")]
    NotFound(String),
}

/// Reasons a client connection stopped abnormally.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("no liveness acknowledgment within {0:?}")]
    LivenessTimeout(std::time::Duration),
    #[error("write did not complete within {0:?}")]
    WriteTimeout(std::time::Duration),
    #[error("message of {size} bytes exceeds limit of {limit}")]
    MessageTooLarge { size: usize, limit: usize },
    #[error("binary frame is not valid UTF-8")]
    InvalidUtf8,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Session(#[from] SessionError),
}
