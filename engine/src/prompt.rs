//! Prompt assembly for the oracle's three jobs: deciding, proposing and
//! critiquing moves, plus plan generation.
//!
//! Assembly is deterministic - same inputs, same text. Every legal move's
//! exact notation string appears verbatim so the oracle is never asked to
//! invent notation it cannot copy.

use gambit_types::{AttemptRecord, BoardState, Color, GamePhase, MoveCandidate, StrategicPlan};

use crate::rules::MoveOutcome;

pub(crate) const DECIDER_SYSTEM: &str =
    "You are a strong chess player choosing a move. Answer in the exact reply format you are given.";
pub(crate) const PROPOSER_SYSTEM: &str =
    "You are a strong chess player proposing a candidate move. Answer in the exact reply format you are given.";
pub(crate) const CRITIC_SYSTEM: &str =
    "You are a demanding chess coach reviewing a proposed move. Answer with the JSON object you are asked for.";
pub(crate) const PLAN_SYSTEM: &str =
    "You are a chess strategist writing a short multi-move plan. Answer with the JSON object you are asked for.";

/// Everything the decision-facing prompts draw from.
pub(crate) struct PromptContext<'a> {
    pub board: &'a BoardState,
    pub color: Color,
    pub phase: GamePhase,
    pub candidates: &'a [MoveCandidate],
    pub narrative: &'a str,
    pub plan: Option<&'a StrategicPlan>,
}

/// Feedback carried into a rebuilt request after a rejected attempt.
#[derive(Debug)]
pub(crate) struct RetryFeedback {
    /// The notation the oracle answered with, when one could be read.
    pub rejected: Option<String>,
    pub reason: String,
}

pub(crate) const fn phase_guidance(phase: GamePhase) -> &'static str {
    match phase {
        GamePhase::Opening => "Develop minor pieces toward the center and castle early.",
        GamePhase::Middlegame => "Look for tactics and improve your worst-placed piece.",
        GamePhase::Endgame => "Activate the king and push passed pawns.",
    }
}

/// The single-role decision prompt.
pub(crate) fn decision_prompt(ctx: &PromptContext<'_>, feedback: Option<&RetryFeedback>) -> String {
    let mut out = String::with_capacity(1024);
    out.push_str(&format!("You are playing {}. It is your move.\n\n", ctx.color));
    push_board(&mut out, ctx.board);
    push_phase(&mut out, ctx.phase);

    if !ctx.narrative.is_empty() {
        out.push_str(ctx.narrative);
        out.push_str("\n\n");
    }
    push_plan_excerpt(&mut out, ctx);

    out.push_str("Legal moves, best-scored first:\n");
    for candidate in ctx.candidates {
        out.push_str(&format!(
            "  {} (score {}) - {}\n",
            candidate.notation(),
            candidate.score,
            candidate.description
        ));
    }
    out.push('\n');

    if let Some(feedback) = feedback {
        match &feedback.rejected {
            Some(notation) => out.push_str(&format!(
                "Your previous answer \"{notation}\" was rejected: {}.\n",
                feedback.reason
            )),
            None => out.push_str(&format!(
                "Your previous answer was rejected: {}.\n",
                feedback.reason
            )),
        }
        out.push_str(&format!(
            "Choose strictly from these notations: {}\n\n",
            notation_list(ctx.candidates)
        ));
    }

    out.push_str(
        "Reply with exactly two lines:\n\
         MOVE: <notation copied from the list above>\n\
         REASON: <one sentence>\n",
    );
    out
}

/// The proposer's prompt over the remaining pool.
pub(crate) fn proposer_prompt(
    ctx: &PromptContext<'_>,
    pool: &[MoveCandidate],
    attempts: &[AttemptRecord],
) -> String {
    let mut out = String::with_capacity(1024);
    out.push_str(&format!(
        "You are proposing a move for {}. A reviewer will judge it.\n\n",
        ctx.color
    ));
    push_board(&mut out, ctx.board);
    push_phase(&mut out, ctx.phase);
    push_plan_excerpt(&mut out, ctx);

    if !attempts.is_empty() {
        out.push_str("Already rejected, do not repeat:\n");
        for attempt in attempts {
            out.push_str(&format!(
                "  {} (scored {}/10): {}\n",
                attempt.notation,
                attempt.evaluation.score.get(),
                attempt.evaluation.rationale
            ));
        }
        out.push('\n');
    }

    out.push_str("Remaining candidates:\n");
    for candidate in pool {
        out.push_str(&format!(
            "  {} (score {}) - {}\n",
            candidate.notation(),
            candidate.score,
            candidate.description
        ));
    }

    out.push_str(
        "\nPropose exactly one move from the remaining candidates.\n\
         Reply with one line:\n\
         MOVE: <notation copied from the list above>\n",
    );
    out
}

/// The critic's prompt over one candidate, simulated one ply ahead.
pub(crate) fn critic_prompt(
    ctx: &PromptContext<'_>,
    candidate: &MoveCandidate,
    outcome: &MoveOutcome,
) -> String {
    let mut out = String::with_capacity(1024);
    out.push_str(&format!(
        "{} is considering the move {}.\n\n",
        color_name_capitalized(ctx.color),
        candidate.notation()
    ));
    push_board(&mut out, ctx.board);
    push_phase(&mut out, ctx.phase);
    out.push_str(&format!(
        "Proposed move: {} (heuristic score {}) - {}\n",
        candidate.notation(),
        candidate.score,
        candidate.description
    ));

    // The resulting position comes straight from the rules engine; render
    // it when it parses, otherwise quote it raw.
    match BoardState::parse(&outcome.position) {
        Ok(after) => {
            out.push_str("Position after the move:\n");
            out.push_str(&after.render_ascii());
        }
        Err(_) => {
            out.push_str(&format!("Position after the move: {}\n", outcome.position));
        }
    }
    if outcome.is_checkmate {
        out.push_str("The move delivers checkmate.\n");
    } else if outcome.is_check {
        out.push_str("The move gives check.\n");
    }

    out.push_str(
        "\nJudge the move for soundness and purpose. Reply with a single JSON object:\n\
         {\"approved\": true or false, \"score\": 1 to 10, \"rationale\": \"one sentence\", \
         \"suggestions\": \"optional alternative ideas\"}\n",
    );
    out
}

/// The plan-generation prompt.
pub(crate) fn plan_prompt(
    board: &BoardState,
    color: Color,
    phase: GamePhase,
    narrative: &str,
    prior: Option<&StrategicPlan>,
) -> String {
    let mut out = String::with_capacity(1024);
    out.push_str(&format!(
        "Write a strategic plan for {color} covering the next few moves.\n\n"
    ));
    push_board(&mut out, board);
    push_phase(&mut out, phase);
    if !narrative.is_empty() {
        out.push_str(narrative);
        out.push_str("\n\n");
    }
    if let Some(prior) = prior {
        out.push_str(&format!(
            "The previous plan was \"{}\" (from ply {}). Keep what still applies.\n\n",
            prior.primary_goal, prior.created_at_ply
        ));
    }
    out.push_str(
        "Reply with a single JSON object and nothing else:\n\
         {\"primaryGoal\": \"...\", \"tacticalPatterns\": [\"...\"], \"coordinationNote\": \"...\", \
         \"keySquares\": [\"...\"], \"pawnPlan\": \"...\", \"threatNote\": \"...\", \
         \"movePriorities\": [\"...\"], \"reasoning\": \"...\"}\n",
    );
    out
}

fn push_board(out: &mut String, board: &BoardState) {
    out.push_str("Position:\n");
    out.push_str(&board.render_ascii());
    out.push('\n');
}

fn push_phase(out: &mut String, phase: GamePhase) {
    out.push_str(&format!("Phase: {phase}. {}\n\n", phase_guidance(phase)));
}

fn push_plan_excerpt(out: &mut String, ctx: &PromptContext<'_>) {
    // Plans written for another phase are stale context, not guidance.
    let Some(plan) = ctx.plan.filter(|p| p.phase_at_creation == ctx.phase) else {
        return;
    };
    out.push_str(&format!(
        "Current plan (from ply {}): {}\n",
        plan.created_at_ply, plan.primary_goal
    ));
    if !plan.move_priorities.is_empty() {
        out.push_str(&format!("  Priorities: {}\n", plan.move_priorities.join(", ")));
    }
    if !plan.key_squares.is_empty() {
        out.push_str(&format!("  Key squares: {}\n", plan.key_squares.join(", ")));
    }
    if !plan.threat_note.is_empty() {
        out.push_str(&format!("  Threats: {}\n", plan.threat_note));
    }
    out.push('\n');
}

fn notation_list(candidates: &[MoveCandidate]) -> String {
    candidates
        .iter()
        .map(MoveCandidate::notation)
        .collect::<Vec<_>>()
        .join(", ")
}

fn color_name_capitalized(color: Color) -> &'static str {
    match color {
        Color::White => "White",
        Color::Black => "Black",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gambit_types::{LegalMove, Piece, Position};

    const STARTING: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn board() -> BoardState {
        BoardState::parse(&Position::new(STARTING)).unwrap()
    }

    fn candidates() -> Vec<MoveCandidate> {
        vec![
            MoveCandidate::new(
                LegalMove::new("Nf3", "g1", "f3", Piece::Knight),
                12,
                "develops the knight",
            ),
            MoveCandidate::new(LegalMove::new("e4", "e2", "e4", Piece::Pawn), 8, "claims the center"),
            MoveCandidate::new(LegalMove::new("O-O", "e1", "g1", Piece::King), 6, "castles the king"),
        ]
    }

    fn ctx<'a>(
        board: &'a BoardState,
        cands: &'a [MoveCandidate],
        plan: Option<&'a StrategicPlan>,
    ) -> PromptContext<'a> {
        PromptContext {
            board,
            color: Color::White,
            phase: GamePhase::Opening,
            candidates: cands,
            narrative: "Recent moves: e4 e5",
            plan,
        }
    }

    #[test]
    fn every_notation_appears_verbatim() {
        let board = board();
        let cands = candidates();
        let prompt = decision_prompt(&ctx(&board, &cands, None), None);
        for candidate in &cands {
            assert!(prompt.contains(candidate.notation()));
        }
        assert!(prompt.contains("MOVE:"));
        assert!(prompt.contains("REASON:"));
        assert!(prompt.contains("8 | r n b q k b n r"));
    }

    #[test]
    fn retry_feedback_names_rejection_and_legal_list() {
        let board = board();
        let cands = candidates();
        let feedback = RetryFeedback {
            rejected: Some("Qh7".to_owned()),
            reason: "it is not in the legal move list".to_owned(),
        };
        let prompt = decision_prompt(&ctx(&board, &cands, None), Some(&feedback));
        assert!(prompt.contains("\"Qh7\" was rejected"));
        assert!(prompt.contains("Choose strictly from these notations: Nf3, e4, O-O"));
    }

    #[test]
    fn plan_excerpt_requires_matching_phase() {
        let board = board();
        let cands = candidates();
        let current = StrategicPlan::neutral(GamePhase::Opening, 2);
        let prompt = decision_prompt(&ctx(&board, &cands, Some(&current)), None);
        assert!(prompt.contains("Current plan (from ply 2)"));

        let stale = StrategicPlan::neutral(GamePhase::Endgame, 2);
        let prompt = decision_prompt(&ctx(&board, &cands, Some(&stale)), None);
        assert!(!prompt.contains("Current plan"));
    }

    #[test]
    fn proposer_prompt_lists_pool_and_rejections() {
        let board = board();
        let cands = candidates();
        let attempts = vec![AttemptRecord {
            notation: "Nf3".to_owned(),
            candidate_score: 12,
            evaluation: gambit_types::Evaluation::rejection("too slow"),
        }];
        let prompt = proposer_prompt(&ctx(&board, &cands, None), &cands[1..], &attempts);
        assert!(prompt.contains("Already rejected"));
        assert!(prompt.contains("Nf3 (scored 1/10): too slow"));
        assert!(prompt.contains("e4 (score 8)"));
        assert!(!prompt.contains("Nf3 (score 12)"));
    }

    #[test]
    fn critic_prompt_shows_simulation() {
        let board = board();
        let cands = candidates();
        let outcome = MoveOutcome {
            position: Position::new("rnbqkbnr/pppppppp/8/8/8/5N2/PPPPPPPP/RNBQKB1R b KQkq - 1 1"),
            is_check: false,
            is_checkmate: false,
            is_stalemate: false,
        };
        let prompt = critic_prompt(&ctx(&board, &cands, None), &cands[0], &outcome);
        assert!(prompt.contains("Proposed move: Nf3"));
        assert!(prompt.contains("Position after the move:"));
        assert!(prompt.contains("\"approved\""));
    }

    #[test]
    fn critic_prompt_quotes_unparseable_result_raw() {
        let board = board();
        let cands = candidates();
        let outcome = MoveOutcome {
            position: Position::new("opaque-state-7"),
            is_check: true,
            is_checkmate: false,
            is_stalemate: false,
        };
        let prompt = critic_prompt(&ctx(&board, &cands, None), &cands[0], &outcome);
        assert!(prompt.contains("Position after the move: opaque-state-7"));
        assert!(prompt.contains("gives check"));
    }

    #[test]
    fn plan_prompt_carries_prior_goal_and_schema() {
        let prior = StrategicPlan::neutral(GamePhase::Opening, 3);
        let prompt = plan_prompt(&board(), Color::Black, GamePhase::Opening, "", Some(&prior));
        assert!(prompt.contains("strategic plan for black"));
        assert!(prompt.contains(&prior.primary_goal));
        assert!(prompt.contains("\"primaryGoal\""));
        assert!(prompt.contains("\"movePriorities\""));
    }
}
