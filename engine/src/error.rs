//! Decision-level error taxonomy.
//!
//! Every terminal failure maps to a stable category string so transports
//! can surface `{error: category}` responses without matching on Rust
//! enum shapes.

use gambit_oracle::OracleError;
use gambit_types::{Color, PositionError};
use thiserror::Error;

use crate::rules::{GameStatus, RulesError};

#[derive(Debug, Error)]
pub enum DecisionError {
    /// The supplied position could not be read. Rejected before any
    /// oracle call.
    #[error("invalid position: {0}")]
    InvalidPosition(#[from] PositionError),

    /// The game is already over; there is no move to make.
    #[error("game already over ({status})")]
    AlreadyTerminal { status: GameStatus },

    /// The position has the other side to move.
    #[error("{side_to_move} to move, engine plays {engine}")]
    NotToMove { engine: Color, side_to_move: Color },

    /// The rules engine reports an empty legal-move set.
    #[error("no legal moves available")]
    NoLegalMoves,

    /// The reasoning oracle never produced a usable completion.
    #[error("reasoning oracle unavailable")]
    OracleUnavailable(#[source] OracleError),

    /// Every attempt was consumed without an accepted move and the
    /// exhaustion fallback is disabled.
    #[error("no accepted move after {attempts} attempts")]
    ExhaustedRetries { attempts: u32 },

    /// The rules collaborator failed mid-decision.
    #[error("rules engine failure")]
    Rules(#[from] RulesError),
}

impl DecisionError {
    /// Stable category string for structured error responses.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::InvalidPosition(_) => "invalid-position",
            Self::AlreadyTerminal { .. } => "already-terminal",
            Self::NotToMove { .. } => "not-to-move",
            Self::NoLegalMoves => "no-legal-moves",
            Self::OracleUnavailable(_) => "oracle-unavailable",
            Self::ExhaustedRetries { .. } => "exhausted-retries",
            Self::Rules(_) => "rules-failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_are_stable() {
        let err = DecisionError::NotToMove {
            engine: Color::White,
            side_to_move: Color::Black,
        };
        assert_eq!(err.category(), "not-to-move");
        assert_eq!(DecisionError::NoLegalMoves.category(), "no-legal-moves");
        assert_eq!(
            DecisionError::ExhaustedRetries { attempts: 5 }.category(),
            "exhausted-retries"
        );
        assert_eq!(
            DecisionError::AlreadyTerminal {
                status: GameStatus::Stalemate
            }
            .category(),
            "already-terminal"
        );
        assert_eq!(
            DecisionError::Rules(RulesError::Backend("down".to_owned())).category(),
            "rules-failure"
        );
    }

    #[test]
    fn display_names_the_sides() {
        let err = DecisionError::NotToMove {
            engine: Color::White,
            side_to_move: Color::Black,
        };
        assert_eq!(err.to_string(), "black to move, engine plays white");
    }
}
