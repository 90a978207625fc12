//! Rules engine seam.
//!
//! The session actor never computes move legality itself. It asks a
//! [`RulesEngine`] for the current position, the legal moves from it, and
//! to apply a chosen move. [`ChessEngine`] is the production implementation;
//! tests substitute their own engines through an [`EngineFactory`].

pub mod chess;

pub use chess::ChessEngine;

use crate::error::EngineError;
use crate::protocol::{GameOutcome, Role};
use std::sync::Arc;

/// An authoritative game position plus the rules that move it forward.
///
/// Implementations are owned by exactly one session loop and are never
/// shared between threads, but must be `Send` so the loop can be spawned.
pub trait RulesEngine: Send + 'static {
    /// Canonical board-state string (FEN for chess).
    fn position(&self) -> String;

    /// Every legal move from the current position, in canonical notation.
    /// Empty once the position is terminal.
    fn legal_moves(&self) -> Vec<String>;

    /// Applies a move given in canonical notation and returns its canonical
    /// string. On error the position is left untouched.
    fn apply_move(&mut self, mv: &str) -> Result<String, EngineError>;

    /// The seat whose turn it is.
    fn side_to_move(&self) -> Role;

    /// `Some` once the position is terminal.
    fn outcome(&self) -> Option<GameOutcome>;
}

/// Creates a fresh engine for every new session.
pub type EngineFactory = Arc<dyn Fn() -> Box<dyn RulesEngine> + Send + Sync>;

/// Factory producing standard chess games from the initial position.
pub fn chess_factory() -> EngineFactory {
    Arc::new(|| Box::new(ChessEngine::new()) as Box<dyn RulesEngine>)
}
