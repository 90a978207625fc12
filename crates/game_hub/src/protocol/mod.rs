//! Wire protocol exchanged over the duplex transport.
//!
//! Every frame is a JSON envelope of the shape `{ "type": <kind>, "data": <payload> }`.
//! Client envelopes carry a move selector (or nothing, for the game-lifecycle
//! kinds); server envelopes carry the session view.
//!
//! ```json
//! { "type": "move", "data": "e2e4" }
//! { "type": "initial", "data": { "fen": "...", "moves": ["a2a3", "..."], "player": "white" } }
//! { "type": "move", "data": { "fen": "...", "moves": ["..."], "move": "e2e4" } }
//! { "type": "error", "data": "invalid move: e2e5" }
//! ```
//!
//! Unknown or absent kinds decode to [`ClientMessage::Unknown`] rather than
//! failing, so a newer client never tears its own connection down by sending
//! a kind this server does not understand.

pub mod types;

pub use types::{EndReason, GameOutcome, GameResult, Role};

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;

/// Separator placed between envelopes that were coalesced into one frame.
pub const FRAME_SEPARATOR: char = '\n';

/// Discriminator of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Move,
    Resign,
    OfferDraw,
    AcceptDraw,
    DeclineDraw,
    GameEnd,
    Error,
    Initial,
    Unknown,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Move => "move",
            MessageKind::Resign => "resign",
            MessageKind::OfferDraw => "offer_draw",
            MessageKind::AcceptDraw => "accept_draw",
            MessageKind::DeclineDraw => "decline_draw",
            MessageKind::GameEnd => "game_end",
            MessageKind::Error => "error",
            MessageKind::Initial => "initial",
            MessageKind::Unknown => "unknown",
        }
    }
}

impl From<&str> for MessageKind {
    fn from(name: &str) -> Self {
        match name {
            "move" => MessageKind::Move,
            "resign" => MessageKind::Resign,
            "offer_draw" => MessageKind::OfferDraw,
            "accept_draw" => MessageKind::AcceptDraw,
            "decline_draw" => MessageKind::DeclineDraw,
            "game_end" => MessageKind::GameEnd,
            "error" => MessageKind::Error,
            "initial" => MessageKind::Initial,
            _ => MessageKind::Unknown,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded client → server envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Submit a move; the selector is matched against the legal-move list.
    Move(String),
    Resign,
    OfferDraw,
    AcceptDraw,
    DeclineDraw,
    /// Any kind this server does not accept from clients. Carries the kind
    /// name as sent, empty when the `type` field was absent.
    Unknown(String),
}

impl ClientMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            ClientMessage::Move(_) => MessageKind::Move,
            ClientMessage::Resign => MessageKind::Resign,
            ClientMessage::OfferDraw => MessageKind::OfferDraw,
            ClientMessage::AcceptDraw => MessageKind::AcceptDraw,
            ClientMessage::DeclineDraw => MessageKind::DeclineDraw,
            ClientMessage::Unknown(_) => MessageKind::Unknown,
        }
    }
}

/// Payload of the `initial` envelope, sent only to the client that joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialPayload {
    pub fen: String,
    pub moves: Vec<String>,
    pub player: Role,
}

/// Payload of the `move` envelope, broadcast after every accepted move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePayload {
    pub fen: String,
    pub moves: Vec<String>,
    #[serde(rename = "move")]
    pub played: String,
}

/// Payload of the `game_end` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEndPayload {
    pub fen: String,
    #[serde(flatten)]
    pub outcome: GameOutcome,
}

/// Payload of the `offer_draw` and `decline_draw` envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawPayload {
    pub player: Role,
}

/// A server → client envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    Initial(InitialPayload),
    Move(MovePayload),
    Error(String),
    GameEnd(GameEndPayload),
    OfferDraw(DrawPayload),
    DeclineDraw(DrawPayload),
}

impl ServerMessage {
    pub fn error(message: impl fmt::Display) -> Self {
        ServerMessage::Error(message.to_string())
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            ServerMessage::Initial(_) => MessageKind::Initial,
            ServerMessage::Move(_) => MessageKind::Move,
            ServerMessage::Error(_) => MessageKind::Error,
            ServerMessage::GameEnd(_) => MessageKind::GameEnd,
            ServerMessage::OfferDraw(_) => MessageKind::OfferDraw,
            ServerMessage::DeclineDraw(_) => MessageKind::DeclineDraw,
        }
    }
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

/// Decodes one client envelope.
///
/// Fails only when the text is not a JSON object of the envelope shape or a
/// `move` envelope does not carry a string selector.
pub fn decode_client(text: &str) -> Result<ClientMessage, ProtocolError> {
    let raw: RawEnvelope = serde_json::from_str(text)?;
    let name = raw.kind.unwrap_or_default();

    let message = match MessageKind::from(name.as_str()) {
        MessageKind::Move => match raw.data {
            serde_json::Value::String(selector) => ClientMessage::Move(selector),
            other => {
                return Err(ProtocolError::InvalidPayload {
                    kind: MessageKind::Move.as_str(),
                    reason: format!("expected a move string, got {other}"),
                })
            }
        },
        MessageKind::Resign => ClientMessage::Resign,
        MessageKind::OfferDraw => ClientMessage::OfferDraw,
        MessageKind::AcceptDraw => ClientMessage::AcceptDraw,
        MessageKind::DeclineDraw => ClientMessage::DeclineDraw,
        MessageKind::GameEnd | MessageKind::Error | MessageKind::Initial | MessageKind::Unknown => {
            ClientMessage::Unknown(name)
        }
    };

    Ok(message)
}

/// Encodes a server envelope.
///
/// An encode failure is logged and degrades to an empty payload so that the
/// caller's event loop keeps running.
pub fn encode(message: &ServerMessage) -> String {
    serde_json::to_string(message).unwrap_or_else(|e| {
        error!("Failed to encode '{}' message: {}", message.kind(), e);
        String::new()
    })
}

/// Collapses embedded newlines and trims surrounding whitespace of an
/// inbound frame before it is decoded.
pub fn normalize_inbound(text: &str) -> String {
    text.replace(FRAME_SEPARATOR, " ").trim().to_string()
}
