//! Deterministic move scoring.
//!
//! Each legal move is simulated through the rules collaborator and scored
//! from static features. The scorer is pure over (position, legal-move
//! set): it never mutates the input position and re-running it yields the
//! identical ordering.

use gambit_types::{LegalMove, MoveCandidate, Piece, Position};

use crate::rules::{MoveOutcome, Rules};

pub(crate) const CHECKMATE_BONUS: i32 = 10_000;
pub(crate) const CHECK_BONUS: i32 = 50;
pub(crate) const CASTLE_BONUS: i32 = 6;
const CAPTURE_WEIGHT: i32 = 10;
const PROMOTION_WEIGHT: i32 = 10;
const SAFETY_WEIGHT: i32 = 5;

/// Score every legal move and return candidates sorted descending.
///
/// Rules failures while simulating one candidate degrade that candidate to
/// a neutral score instead of failing the decision.
pub fn rank_candidates<R: Rules + ?Sized>(
    rules: &R,
    position: &Position,
    moves: Vec<LegalMove>,
) -> Vec<MoveCandidate> {
    let mut candidates: Vec<MoveCandidate> = moves
        .into_iter()
        .map(|mv| score_one(rules, position, mv))
        .collect();
    // Stable sort: equal scores keep the rules engine's move order.
    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates
}

fn score_one<R: Rules + ?Sized>(rules: &R, position: &Position, mv: LegalMove) -> MoveCandidate {
    let outcome = match rules.apply_move(position, &mv.notation) {
        Ok(outcome) => outcome,
        Err(error) => {
            tracing::warn!(notation = %mv.notation, %error, "simulation failed; scoring as neutral");
            return MoveCandidate::new(mv, 0, "simulation unavailable");
        }
    };

    let mut score = 0i32;
    let mut features: Vec<String> = Vec::new();

    if let Some(captured) = mv.captured_piece {
        score += captured.value() as i32 * CAPTURE_WEIGHT;
        features.push(format!("captures the {captured}"));
    }
    if let Some(promoted) = mv.promotion {
        score += (promoted.value() as i32 - Piece::Pawn.value() as i32) * PROMOTION_WEIGHT;
        features.push(format!("promotes to a {promoted}"));
    }
    if mv.is_castle {
        score += CASTLE_BONUS;
        features.push("castles the king".to_owned());
    }
    if outcome.is_checkmate {
        score += CHECKMATE_BONUS;
        features.push("delivers checkmate".to_owned());
    } else if outcome.is_check {
        score += CHECK_BONUS;
        features.push("gives check".to_owned());
    }

    if let Some(penalty) = safety_penalty(rules, &outcome, &mv) {
        score -= penalty;
        features.push(format!(
            "the {} can be taken on {}",
            mv.moving_piece, mv.destination
        ));
    }

    let description = if features.is_empty() {
        format!("quiet {} move to {}", mv.moving_piece, mv.destination)
    } else {
        features.join("; ")
    };
    MoveCandidate::new(mv, score, description)
}

/// Penalty when the destination square stays attackable after the move.
///
/// Detected as any opponent legal move in the resulting position landing
/// on the destination. For captures the trade differential replaces the
/// full piece-value penalty.
fn safety_penalty<R: Rules + ?Sized>(
    rules: &R,
    outcome: &MoveOutcome,
    mv: &LegalMove,
) -> Option<i32> {
    if outcome.is_terminal() {
        return None;
    }
    let replies = match rules.legal_moves(&outcome.position) {
        Ok(replies) => replies,
        Err(error) => {
            tracing::debug!(notation = %mv.notation, %error, "reply probe failed; skipping safety term");
            return None;
        }
    };
    if !replies.iter().any(|reply| reply.destination == mv.destination) {
        return None;
    }
    let mover = mv.moving_piece.value() as i32;
    let penalty = match mv.captured_piece {
        Some(captured) => (mover - captured.value() as i32).max(0) * SAFETY_WEIGHT,
        None => mover * SAFETY_WEIGHT,
    };
    (penalty > 0).then_some(penalty)
}
