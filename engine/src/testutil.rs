//! Shared test doubles.

use std::collections::{HashMap, HashSet};

use gambit_types::{Color, LegalMove, Position};

use crate::rules::{GameStatus, MoveOutcome, Rules, RulesError};

pub(crate) const STARTING: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

pub(crate) fn quiet_outcome(position: &str) -> MoveOutcome {
    MoveOutcome {
        position: Position::new(position),
        is_check: false,
        is_checkmate: false,
        is_stalemate: false,
    }
}

pub(crate) fn check_outcome(position: &str) -> MoveOutcome {
    MoveOutcome {
        is_check: true,
        ..quiet_outcome(position)
    }
}

pub(crate) fn mate_outcome(position: &str) -> MoveOutcome {
    MoveOutcome {
        is_check: true,
        is_checkmate: true,
        ..quiet_outcome(position)
    }
}

/// Canned rules collaborator.
///
/// The move list answers the starting position; simulated positions answer
/// with scripted reply lists and are otherwise quiet. Applied moves return
/// scripted outcomes or a synthesized quiet one, and status/turn are
/// constants.
pub(crate) struct ScriptedRules {
    root: String,
    moves: Vec<LegalMove>,
    outcomes: HashMap<String, MoveOutcome>,
    replies: HashMap<String, Vec<LegalMove>>,
    failing: HashSet<String>,
    status: GameStatus,
    turn: Color,
}

impl ScriptedRules {
    pub(crate) fn new(turn: Color, moves: Vec<LegalMove>) -> Self {
        Self {
            root: STARTING.to_owned(),
            moves,
            outcomes: HashMap::new(),
            replies: HashMap::new(),
            failing: HashSet::new(),
            status: GameStatus::Ongoing,
            turn,
        }
    }

    pub(crate) fn with_status(mut self, status: GameStatus) -> Self {
        self.status = status;
        self
    }

    /// Outcome returned when `notation` is applied to any position.
    pub(crate) fn with_outcome(mut self, notation: &str, outcome: MoveOutcome) -> Self {
        self.outcomes.insert(notation.to_owned(), outcome);
        self
    }

    /// Legal-move list for one specific position string.
    pub(crate) fn with_replies(mut self, position: &str, moves: Vec<LegalMove>) -> Self {
        self.replies.insert(position.to_owned(), moves);
        self
    }

    /// Make `apply_move` fail for `notation`.
    pub(crate) fn with_apply_failure(mut self, notation: &str) -> Self {
        self.failing.insert(notation.to_owned());
        self
    }
}

impl Rules for ScriptedRules {
    fn legal_moves(&self, position: &Position) -> Result<Vec<LegalMove>, RulesError> {
        if let Some(scripted) = self.replies.get(position.as_str()) {
            return Ok(scripted.clone());
        }
        if position.as_str() == self.root {
            return Ok(self.moves.clone());
        }
        Ok(Vec::new())
    }

    fn apply_move(&self, _position: &Position, notation: &str) -> Result<MoveOutcome, RulesError> {
        if self.failing.contains(notation) {
            return Err(RulesError::Backend(format!(
                "scripted failure applying {notation}"
            )));
        }
        match self.outcomes.get(notation) {
            Some(outcome) => Ok(outcome.clone()),
            None => Ok(quiet_outcome(&format!("after {notation}"))),
        }
    }

    fn status(&self, _position: &Position) -> Result<GameStatus, RulesError> {
        Ok(self.status)
    }

    fn turn(&self, _position: &Position) -> Result<Color, RulesError> {
        Ok(self.turn)
    }
}
