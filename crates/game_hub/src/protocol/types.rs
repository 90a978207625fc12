//! Value types shared by the wire protocol, the session actor and the
//! rules engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The playing position a client is bound to within a session.
///
/// `None` is only ever reported for clients that hold no seat; every
/// successfully joined client is bound to `White` or `Black`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    None,
    White,
    Black,
}

impl Role {
    /// The two seats of a session, first mover first.
    pub const SEATS: [Role; 2] = [Role::White, Role::Black];

    /// The opposing seat. `None` has no opponent.
    pub fn opponent(self) -> Role {
        match self {
            Role::White => Role::Black,
            Role::Black => Role::White,
            Role::None => Role::None,
        }
    }

    /// Whether this role is one of the two playing seats.
    pub fn is_seat(self) -> bool {
        self != Role::None
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::None => "none",
            Role::White => "white",
            Role::Black => "black",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final result of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    Resignation,
    Agreement,
}

/// A finished game's result together with the reason it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub result: GameResult,
    pub reason: EndReason,
}

impl GameOutcome {
    /// A decisive outcome in favour of `winner`.
    pub fn victory(winner: Role, reason: EndReason) -> Self {
        let result = match winner {
            Role::White => GameResult::WhiteWins,
            Role::Black => GameResult::BlackWins,
            Role::None => GameResult::Draw,
        };
        Self { result, reason }
    }

    pub fn draw(reason: EndReason) -> Self {
        Self {
            result: GameResult::Draw,
            reason,
        }
    }
}
