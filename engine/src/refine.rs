//! Proposer/critic refinement protocol.
//!
//! Each iteration spends two oracle calls: one proposes a move from the
//! remaining candidate pool, one judges it against a one-ply simulation of
//! the resulting position. Rejected candidates leave the pool so the
//! proposer cannot loop on a refuted idea. Exhaustion falls back to the
//! attempt the critic scored highest.

use gambit_oracle::Oracle;
use gambit_types::{AttemptRecord, CriticScore, Evaluation, MoveCandidate, Position};

use crate::config::EngineConfig;
use crate::error::DecisionError;
use crate::parse;
use crate::prompt::{self, PromptContext};
use crate::rules::{MoveOutcome, Rules};

/// What the refinement protocol settled on.
#[derive(Debug)]
pub(crate) struct RefineOutcome {
    pub candidate: MoveCandidate,
    pub rationale: String,
    pub attempts: Vec<AttemptRecord>,
    pub iterations: u32,
    pub fallback: bool,
}

pub(crate) async fn run<R: Rules + ?Sized>(
    rules: &R,
    oracle: &dyn Oracle,
    position: &Position,
    ctx: &PromptContext<'_>,
    config: &EngineConfig,
) -> Result<RefineOutcome, DecisionError> {
    let threshold = CriticScore::from(config.limits.approval_threshold);
    let mut pool: Vec<MoveCandidate> = ctx.candidates.to_vec();
    let mut attempts: Vec<AttemptRecord> = Vec::new();

    if pool.is_empty() {
        return Err(DecisionError::NoLegalMoves);
    }

    let mut iterations_used: u32 = 0;
    for iteration in 1..=config.limits.max_iterations {
        if pool.is_empty() {
            break;
        }
        iterations_used = iteration;

        let candidate = match propose(oracle, ctx, &pool, &attempts, config).await {
            Some(notation) => take_from_pool(&mut pool, &notation).unwrap_or_else(|| {
                tracing::debug!(
                    iteration,
                    notation,
                    "proposal outside the remaining pool, substituting top-scored candidate"
                );
                pool.remove(0)
            }),
            None => {
                tracing::debug!(iteration, "unusable proposal, substituting top-scored candidate");
                pool.remove(0)
            }
        };

        let evaluation = match rules.apply_move(position, candidate.notation()) {
            Ok(outcome) => critique(oracle, ctx, &candidate, &outcome, threshold, config).await,
            Err(error) => {
                tracing::warn!(notation = %candidate.notation(), %error, "candidate simulation failed");
                Evaluation::rejection("simulation failed")
            }
        };

        let approved = evaluation.approved;
        let rationale = if evaluation.rationale.is_empty() {
            candidate.description.clone()
        } else {
            evaluation.rationale.clone()
        };
        attempts.push(AttemptRecord {
            notation: candidate.notation().to_owned(),
            candidate_score: candidate.score,
            evaluation,
        });

        if approved {
            tracing::debug!(iteration, notation = %candidate.notation(), "critic approved");
            return Ok(RefineOutcome {
                candidate,
                rationale,
                attempts,
                iterations: iteration,
                fallback: false,
            });
        }
    }

    settle_from_attempts(ctx, attempts, iterations_used)
}

/// Nothing was approved: fall back to the attempt the critic liked most,
/// or to the top heuristic candidate when no attempt was ever made.
fn settle_from_attempts(
    ctx: &PromptContext<'_>,
    attempts: Vec<AttemptRecord>,
    iterations: u32,
) -> Result<RefineOutcome, DecisionError> {
    let mut best: Option<usize> = None;
    for (index, record) in attempts.iter().enumerate() {
        let better = match best {
            Some(current) => record.evaluation.score > attempts[current].evaluation.score,
            None => true,
        };
        if better {
            best = Some(index);
        }
    }

    if let Some(index) = best {
        let record = &attempts[index];
        let Some(candidate) = ctx
            .candidates
            .iter()
            .find(|c| c.notation() == record.notation)
            .cloned()
        else {
            // Attempt notations come from the candidate list; not finding one
            // means the list changed underneath us.
            return Err(DecisionError::ExhaustedRetries {
                attempts: iterations,
            });
        };
        let rationale = if record.evaluation.rationale.is_empty() {
            candidate.description.clone()
        } else {
            record.evaluation.rationale.clone()
        };
        tracing::warn!(
            notation = %candidate.notation(),
            critic_score = %record.evaluation.score,
            "no candidate approved, falling back to best-reviewed attempt"
        );
        return Ok(RefineOutcome {
            candidate,
            rationale,
            attempts,
            iterations,
            fallback: true,
        });
    }

    if let Some(best) = ctx.candidates.first() {
        tracing::warn!(
            notation = %best.notation(),
            "no refinement attempts were made, falling back to top-scored candidate"
        );
        return Ok(RefineOutcome {
            candidate: best.clone(),
            rationale: best.description.clone(),
            attempts,
            iterations,
            fallback: true,
        });
    }

    Err(DecisionError::NoLegalMoves)
}

async fn propose(
    oracle: &dyn Oracle,
    ctx: &PromptContext<'_>,
    pool: &[MoveCandidate],
    attempts: &[AttemptRecord],
    config: &EngineConfig,
) -> Option<String> {
    let request = config
        .oracle
        .request(prompt::proposer_prompt(ctx, pool, attempts))
        .with_system(prompt::PROPOSER_SYSTEM);
    match oracle.complete(request).await {
        Ok(completion) => parse::proposal(&completion.text).ok(),
        Err(error) => {
            tracing::warn!(%error, "proposer call failed");
            None
        }
    }
}

async fn critique(
    oracle: &dyn Oracle,
    ctx: &PromptContext<'_>,
    candidate: &MoveCandidate,
    outcome: &MoveOutcome,
    threshold: CriticScore,
    config: &EngineConfig,
) -> Evaluation {
    let request = config
        .oracle
        .request(prompt::critic_prompt(ctx, candidate, outcome))
        .with_system(prompt::CRITIC_SYSTEM);
    match oracle.complete(request).await {
        Ok(completion) => {
            parse::critic_verdict(&completion.text, threshold).unwrap_or_else(|| {
                tracing::debug!(notation = %candidate.notation(), "unreadable critic verdict");
                Evaluation::rejection("critic reply unreadable")
            })
        }
        Err(error) => {
            tracing::warn!(%error, "critic call failed");
            Evaluation::rejection("critic unavailable")
        }
    }
}

fn take_from_pool(pool: &mut Vec<MoveCandidate>, notation: &str) -> Option<MoveCandidate> {
    let index = pool.iter().position(|c| c.notation() == notation)?;
    Some(pool.remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{quiet_outcome, ScriptedRules};
    use gambit_oracle::{ScriptedOracle, ScriptedResponse};
    use gambit_types::{BoardState, Color, GamePhase, LegalMove, Piece};

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
            MoveCandidate::new(LegalMove::new("d4", "d2", "d4", Piece::Pawn), 7, "claims the center"),
        ]
    }

    fn rules() -> ScriptedRules {
        ScriptedRules::new(
            Color::White,
            vec![
                LegalMove::new("Nf3", "g1", "f3", Piece::Knight),
                LegalMove::new("e4", "e2", "e4", Piece::Pawn),
                LegalMove::new("d4", "d2", "d4", Piece::Pawn),
            ],
        )
    }

    fn ctx<'a>(board: &'a BoardState, cands: &'a [MoveCandidate]) -> PromptContext<'a> {
        PromptContext {
            board,
            color: Color::White,
            phase: GamePhase::Opening,
            candidates: cands,
            narrative: "",
            plan: None,
        }
    }

    fn position() -> Position {
        Position::new(STARTING)
    }

    #[tokio::test]
    async fn approval_on_first_iteration() {
        let board = board();
        let cands = candidates();
        let oracle = ScriptedOracle::from_texts([
            "MOVE: Nf3",
            r#"{"approved": true, "score": 8, "rationale": "solid development"}"#,
        ]);

        let outcome = run(
            &rules(),
            &oracle,
            &position(),
            &ctx(&board, &cands),
            &EngineConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.candidate.notation(), "Nf3");
        assert_eq!(outcome.rationale, "solid development");
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.attempts.len(), 1);
        assert!(outcome.attempts[0].evaluation.approved);
        assert!(!outcome.fallback);
        assert_eq!(oracle.call_count(), 2);
    }

    #[tokio::test]
    async fn rejected_candidate_leaves_the_pool() {
        let board = board();
        let cands = candidates();
        let oracle = ScriptedOracle::from_texts([
            "MOVE: Nf3",
            r#"{"approved": false, "score": 3, "rationale": "too slow here"}"#,
            "MOVE: e4",
            r#"{"approved": true, "score": 9, "rationale": "strongest center claim"}"#,
        ]);

        let outcome = run(
            &rules(),
            &oracle,
            &position(),
            &ctx(&board, &cands),
            &EngineConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.candidate.notation(), "e4");
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.attempts.len(), 2);
        assert!(!outcome.attempts[0].evaluation.approved);

        // The second proposer prompt must not offer the refuted move again.
        let prompts = oracle.prompts();
        assert!(prompts[2].contains("Nf3 (scored 3/10): too slow here"));
        assert!(!prompts[2].contains("Nf3 (score 12)"));
    }

    #[tokio::test]
    async fn all_rejected_falls_back_to_best_reviewed_attempt() {
        let board = board();
        let cands = candidates();
        let oracle = ScriptedOracle::from_texts([
            "MOVE: Nf3",
            r#"{"approved": false, "score": 4, "rationale": "passive"}"#,
            "MOVE: e4",
            r#"{"approved": false, "score": 6, "rationale": "overextends slightly"}"#,
            "MOVE: d4",
            r#"{"approved": false, "score": 2, "rationale": "blocks the bishop"}"#,
        ]);

        let outcome = run(
            &rules(),
            &oracle,
            &position(),
            &ctx(&board, &cands),
            &EngineConfig::default(),
        )
        .await
        .unwrap();

        assert!(outcome.fallback);
        assert_eq!(outcome.candidate.notation(), "e4");
        assert_eq!(outcome.rationale, "overextends slightly");
        assert_eq!(outcome.attempts.len(), 3);
        assert_eq!(outcome.iterations, 3);
    }

    #[tokio::test]
    async fn unusable_proposal_substitutes_top_of_pool() {
        let board = board();
        let cands = candidates();
        let oracle = ScriptedOracle::from_texts([
            "I like the look of the kingside.",
            r#"{"approved": true, "score": 7, "rationale": "fine"}"#,
        ]);

        let outcome = run(
            &rules(),
            &oracle,
            &position(),
            &ctx(&board, &cands),
            &EngineConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.candidate.notation(), "Nf3");
        assert!(!outcome.fallback);
    }

    #[tokio::test]
    async fn repeated_proposal_substitutes_from_remaining_pool() {
        let board = board();
        let cands = candidates();
        let oracle = ScriptedOracle::from_texts([
            "MOVE: Nf3",
            r#"{"approved": false, "score": 3, "rationale": "slow"}"#,
            // Proposes the already-refuted move again.
            "MOVE: Nf3",
            r#"{"approved": true, "score": 8, "rationale": "good enough"}"#,
        ]);

        let outcome = run(
            &rules(),
            &oracle,
            &position(),
            &ctx(&board, &cands),
            &EngineConfig::default(),
        )
        .await
        .unwrap();

        // Substituted with the best remaining candidate, not the refuted one.
        assert_eq!(outcome.candidate.notation(), "e4");
    }

    #[tokio::test]
    async fn critic_failure_counts_as_rejection() {
        let board = board();
        let cands = candidates();
        let oracle = ScriptedOracle::new([
            ScriptedResponse::text("MOVE: Nf3"),
            ScriptedResponse::Fail(gambit_oracle::OracleError::EmptyCompletion),
            ScriptedResponse::text("MOVE: e4"),
            ScriptedResponse::text(r#"{"approved": true, "score": 8, "rationale": "strong"}"#),
        ]);

        let outcome = run(
            &rules(),
            &oracle,
            &position(),
            &ctx(&board, &cands),
            &EngineConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.candidate.notation(), "e4");
        assert_eq!(outcome.attempts[0].evaluation.rationale, "critic unavailable");
        assert_eq!(outcome.attempts[0].evaluation.score, CriticScore::MIN);
    }

    #[tokio::test]
    async fn simulation_failure_skips_the_critic() {
        let board = board();
        let cands = candidates();
        let rules = rules().with_apply_failure("Nf3");
        let oracle = ScriptedOracle::from_texts([
            "MOVE: Nf3",
            "MOVE: e4",
            r#"{"approved": true, "score": 8, "rationale": "strong"}"#,
        ]);

        let outcome = run(
            &rules,
            &oracle,
            &position(),
            &ctx(&board, &cands),
            &EngineConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.candidate.notation(), "e4");
        assert_eq!(outcome.attempts[0].evaluation.rationale, "simulation failed");
        // Proposer, proposer, critic: the failed simulation spent no critic call.
        assert_eq!(oracle.call_count(), 3);
    }

    #[tokio::test]
    async fn zero_iteration_budget_falls_back_to_top_candidate() {
        let board = board();
        let cands = candidates();
        let oracle = ScriptedOracle::repeating("unused");
        let mut config = EngineConfig::default();
        config.limits.max_iterations = 0;

        let outcome = run(&rules(), &oracle, &position(), &ctx(&board, &cands), &config)
            .await
            .unwrap();

        assert!(outcome.fallback);
        assert_eq!(outcome.candidate.notation(), "Nf3");
        assert_eq!(outcome.iterations, 0);
        assert!(outcome.attempts.is_empty());
        assert_eq!(oracle.call_count(), 0);
    }

    #[tokio::test]
    async fn empty_candidate_list_is_rejected_up_front() {
        let board = board();
        let oracle = ScriptedOracle::repeating("unused");

        let err = run(
            &rules(),
            &oracle,
            &position(),
            &ctx(&board, &[]),
            &EngineConfig::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DecisionError::NoLegalMoves));
    }

    #[tokio::test]
    async fn tie_on_critic_score_keeps_the_earlier_attempt() {
        let board = board();
        let cands = candidates();
        let oracle = ScriptedOracle::from_texts([
            "MOVE: Nf3",
            r#"{"approved": false, "score": 5, "rationale": "first reviewed"}"#,
            "MOVE: e4",
            r#"{"approved": false, "score": 5, "rationale": "second reviewed"}"#,
            "MOVE: d4",
            r#"{"approved": false, "score": 4, "rationale": "third reviewed"}"#,
        ]);

        let outcome = run(
            &rules(),
            &oracle,
            &position(),
            &ctx(&board, &cands),
            &EngineConfig::default(),
        )
        .await
        .unwrap();

        assert!(outcome.fallback);
        assert_eq!(outcome.candidate.notation(), "Nf3");
        assert_eq!(outcome.rationale, "first reviewed");
    }

    #[test]
    fn quiet_outcome_is_nonterminal() {
        let outcome = quiet_outcome("after-e4");
        assert!(!outcome.is_terminal());
    }
}
