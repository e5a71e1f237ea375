//! Game-phase classification.

use gambit_types::{BoardState, GamePhase};

use crate::config::PhaseThresholds;

/// Classify the stage of the game from ply count and remaining material.
///
/// Total function: every (ply, material) pair maps to exactly one phase,
/// and identical inputs always produce the identical phase. Material
/// dominates ply - a bare board is an endgame no matter how early it was
/// reached.
#[must_use]
pub fn classify(board: &BoardState, ply: u32, thresholds: PhaseThresholds) -> GamePhase {
    if board.material_total() <= thresholds.endgame_material_max {
        GamePhase::Endgame
    } else if ply < thresholds.opening_max_plies {
        GamePhase::Opening
    } else {
        GamePhase::Middlegame
    }
}
