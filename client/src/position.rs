use sha2::{Digest, Sha256};
use std::collections::HashMap;

use chess_match_registry::types::Color;

use crate::chess::{Board, IllegalMove, MoveEffect, STANDARD_START};
use crate::error::ClientError;
use crate::moves::ChessMove;

/// Result of a game as seen by the local rules engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameOutcome {
    Ongoing,
    Checkmate { winner: Color },
    Stalemate,
    InsufficientMaterial,
    FiftyMoveRule,
    ThreefoldRepetition,
}

impl GameOutcome {
    pub fn is_over(self) -> bool {
        self != GameOutcome::Ongoing
    }

    /// The side to report to `finishMatch`, `None` for a draw.
    pub fn winner(self) -> Option<Color> {
        match self {
            GameOutcome::Checkmate { winner } => Some(winner),
            _ => None,
        }
    }
}

/// A board plus the history needed for repetition draws. Its FEN is what
/// the on-chain commitment hashes.
#[derive(Clone, Debug)]
pub struct Position {
    board: Board,
    start_index: u16,
    seen: HashMap<u64, u8>,
    plies: u32,
}

impl Position {
    pub fn standard() -> Self {
        Self::from_start(Board::standard(), STANDARD_START)
    }

    pub fn chess960(index: u16) -> Result<Self, ClientError> {
        let board =
            Board::chess960(index).ok_or(ClientError::InvalidStartPosition { index })?;
        Ok(Self::from_start(board, index))
    }

    fn from_start(board: Board, index: u16) -> Self {
        let mut seen = HashMap::new();
        seen.insert(board.repetition_key(), 1);
        Position {
            board,
            start_index: index,
            seen,
            plies: 0,
        }
    }

    /// Plays `moves` from the given start position.
    pub fn replay(start_index: u16, moves: &[ChessMove]) -> Result<Self, ClientError> {
        let mut position = Self::chess960(start_index)?;
        for (ply, mv) in moves.iter().enumerate() {
            position.apply(mv).map_err(|e| ClientError::Rejected {
                reason: format!("ply {} ({mv}): {e}", ply + 1),
            })?;
        }
        Ok(position)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn start_index(&self) -> u16 {
        self.start_index
    }

    /// Half-moves played since the start position.
    pub fn plies(&self) -> u32 {
        self.plies
    }

    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    pub fn apply(&mut self, mv: &ChessMove) -> Result<MoveEffect, IllegalMove> {
        let effect = self
            .board
            .apply(mv.from.index(), mv.to.index(), mv.promotion)?;
        *self.seen.entry(self.board.repetition_key()).or_insert(0) += 1;
        self.plies += 1;
        Ok(effect)
    }

    pub fn fen(&self) -> String {
        self.board.fen()
    }

    /// SHA-256 of the FEN text.
    pub fn state_hash(&self) -> [u8; 32] {
        Sha256::digest(self.fen().as_bytes()).into()
    }

    pub fn outcome(&self) -> GameOutcome {
        let side = self.board.side_to_move();
        if !self.board.has_any_legal_move() {
            return if self.board.in_check(side) {
                GameOutcome::Checkmate {
                    winner: side.opposite(),
                }
            } else {
                GameOutcome::Stalemate
            };
        }
        if self.board.insufficient_material() {
            return GameOutcome::InsufficientMaterial;
        }
        if self.board.halfmove_clock() >= 100 {
            return GameOutcome::FiftyMoveRule;
        }
        let repeats = self
            .seen
            .get(&self.board.repetition_key())
            .copied()
            .unwrap_or(0);
        if repeats >= 3 {
            return GameOutcome::ThreefoldRepetition;
        }
        GameOutcome::Ongoing
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::standard()
    }
}

/// Commitment to pass as `initialStateHash` when creating a match.
pub fn initial_state_hash(start_index: u16) -> Result<[u8; 32], ClientError> {
    Ok(Position::chess960(start_index)?.state_hash())
}
