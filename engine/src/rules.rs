//! Rules-engine seam.
//!
//! Move legality, simulation, and termination live in an external rules
//! collaborator. The engine talks to it through the [`Rules`] trait and
//! never second-guesses it: a move is legal exactly when the collaborator
//! lists it, and positions change only through [`Rules::apply_move`].

use gambit_types::{Color, LegalMove, Position};
use thiserror::Error;

/// Terminal status of a position, before any move is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Ongoing,
    Checkmate { winner: Color },
    Stalemate,
}

impl GameStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Ongoing)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ongoing => "ongoing",
            Self::Checkmate { .. } => "checkmate",
            Self::Stalemate => "stalemate",
        }
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the rules collaborator reports after applying one move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub position: Position,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_stalemate: bool,
}

impl MoveOutcome {
    /// Whether the move ended the game.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.is_checkmate || self.is_stalemate
    }
}

/// Faults surfaced by the rules collaborator.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("rules engine rejected position: {0}")]
    InvalidPosition(String),
    #[error("illegal move: {notation}")]
    IllegalMove { notation: String },
    #[error("rules engine failure: {0}")]
    Backend(String),
}

/// Contract for the external rules engine.
///
/// Implementations must be deterministic for a fixed position: the same
/// input yields the same legal-move list in the same order, which the
/// scorer relies on for stable candidate ordering.
pub trait Rules: Send + Sync {
    /// Every legal move for the side to move, with the canonical notation
    /// that [`Rules::apply_move`] accepts back.
    fn legal_moves(&self, position: &Position) -> Result<Vec<LegalMove>, RulesError>;

    /// Apply `notation` to `position` and report the resulting state.
    fn apply_move(&self, position: &Position, notation: &str) -> Result<MoveOutcome, RulesError>;

    /// Terminal status of the position as it stands.
    fn status(&self, position: &Position) -> Result<GameStatus, RulesError>;

    /// Which color moves next.
    fn turn(&self, position: &Position) -> Result<Color, RulesError>;
}
