//! Standard chess rules backed by shakmaty.
//!
//! Positions are exchanged as FEN and moves as UCI long algebraic notation
//! (`e2e4`, `e7e8q`, `e1g1` for castling).

use super::RulesEngine;
use crate::error::EngineError;
use crate::protocol::{EndReason, GameOutcome, Role};
use shakmaty::{
    fen::Fen, uci::UciMove, CastlingMode, Chess, Color, EnPassantMode, Move, Position,
};

/// A chess game in progress.
#[derive(Debug, Clone, Default)]
pub struct ChessEngine {
    position: Chess,
}

impl ChessEngine {
    /// A game from the standard starting position.
    pub fn new() -> Self {
        Self::default()
    }

    /// A game from an arbitrary FEN.
    pub fn from_fen(fen: &str) -> Result<Self, EngineError> {
        let fen: Fen = fen
            .parse()
            .map_err(|e| EngineError::InvalidPosition(format!("{e}")))?;
        let position: Chess = fen
            .into_position(CastlingMode::Standard)
            .map_err(|e| EngineError::InvalidPosition(format!("{e}")))?;
        Ok(Self { position })
    }

    fn parse_move(&self, mv: &str) -> Result<Move, EngineError> {
        let uci: UciMove = mv
            .parse()
            .map_err(|_| EngineError::InvalidNotation(mv.to_string()))?;
        uci.to_move(&self.position)
            .map_err(|_| EngineError::IllegalMove(mv.to_string()))
    }

    fn role_of(color: Color) -> Role {
        match color {
            Color::White => Role::White,
            Color::Black => Role::Black,
        }
    }
}

impl RulesEngine for ChessEngine {
    fn position(&self) -> String {
        Fen::from_position(self.position.clone(), EnPassantMode::Legal).to_string()
    }

    fn legal_moves(&self) -> Vec<String> {
        self.position
            .legal_moves()
            .iter()
            .map(|m| UciMove::from_move(m, CastlingMode::Standard).to_string())
            .collect()
    }

    fn apply_move(&mut self, mv: &str) -> Result<String, EngineError> {
        let m = self.parse_move(mv)?;
        if !self.position.is_legal(&m) {
            return Err(EngineError::IllegalMove(mv.to_string()));
        }

        let canonical = UciMove::from_move(&m, CastlingMode::Standard).to_string();
        self.position = self
            .position
            .clone()
            .play(&m)
            .map_err(|_| EngineError::IllegalMove(mv.to_string()))?;
        Ok(canonical)
    }

    fn side_to_move(&self) -> Role {
        Self::role_of(self.position.turn())
    }

    fn outcome(&self) -> Option<GameOutcome> {
        if self.position.is_checkmate() {
            // The side to move is mated.
            let winner = Self::role_of(self.position.turn()).opponent();
            Some(GameOutcome::victory(winner, EndReason::Checkmate))
        } else if self.position.is_stalemate() {
            Some(GameOutcome::draw(EndReason::Stalemate))
        } else if self.position.is_insufficient_material() {
            Some(GameOutcome::draw(EndReason::InsufficientMaterial))
        } else {
            None
        }
    }
}
