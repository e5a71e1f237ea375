//! Decision orchestration for Gambit.
//!
//! The engine owns one pipeline: validate the position, score the legal
//! moves, assemble prompt context (history narrative plus the cached
//! strategic plan), run the configured oracle protocol, and apply the
//! chosen move through the rules collaborator. It never computes chess
//! itself - legality, simulation and termination come from the [`Rules`]
//! seam, judgment comes from the [`Oracle`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

// Re-export from crates for public API
pub use gambit_oracle::{
    ApiKey, Completion, CompletionRequest, HttpOracle, HttpOracleConfig, Oracle, OracleError,
    ScriptedOracle, ScriptedResponse,
};
pub use gambit_types::{
    AttemptRecord, BoardState, Color, CriticScore, EmptySessionIdError, Evaluation, GamePhase,
    LegalMove, MoveCandidate, Piece, PlanRecord, Position, PositionError, SessionId, StrategicPlan,
};

mod config;
pub use config::{
    ConfigError, EngineConfig, EngineSettings, Limits, OracleSettings, PhaseThresholds, Strategy,
    config_path,
};
mod error;
pub use error::DecisionError;
pub mod phase;
mod rules;
pub use rules::{GameStatus, MoveOutcome, Rules, RulesError};
pub mod scoring;
mod store;
pub use store::{MemoryPlanStore, PlanStore, SqlitePlanStore};

mod direct;
mod narrative;
mod parse;
mod plan_cache;
mod prompt;
mod refine;

use plan_cache::{PlanCache, PlanSeed};
use prompt::PromptContext;

// ============================================================================
// DecisionRequest - one "choose a move" call
// ============================================================================

/// Everything the caller supplies for one decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    /// Current position, side to move encoded within.
    pub position: Position,
    /// Moves played so far, oldest first.
    #[serde(default)]
    pub move_history: Vec<String>,
    /// Plies played before this decision; drives phase classification and
    /// the plan refresh cadence.
    #[serde(default)]
    pub ply_count: u32,
    /// Plan echoed back by a caller that keeps session state externally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_plan: Option<StrategicPlan>,
}

impl DecisionRequest {
    pub fn new(position: impl Into<Position>) -> Self {
        Self {
            position: position.into(),
            move_history: Vec::new(),
            ply_count: 0,
            prior_plan: None,
        }
    }

    #[must_use]
    pub fn with_history<I, S>(mut self, moves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.move_history = moves.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_ply(mut self, ply: u32) -> Self {
        self.ply_count = ply;
        self
    }

    #[must_use]
    pub fn with_prior_plan(mut self, plan: StrategicPlan) -> Self {
        self.prior_plan = Some(plan);
        self
    }
}

// ============================================================================
// DecisionOutcome - the reply
// ============================================================================

/// The decided move plus everything needed to display or verify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOutcome {
    /// Chosen move, in the rules engine's canonical notation.
    #[serde(rename = "move")]
    pub notation: String,
    /// Why, in the oracle's words (or the scorer's, on fallback).
    pub rationale: String,
    pub resulting_position: Position,
    pub phase: GamePhase,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_stalemate: bool,
    pub is_terminal: bool,
    /// Active strategic plan, when the session holds one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<StrategicPlan>,
    /// Refinement attempts in order. Empty outside the refine strategy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<AttemptRecord>,
    /// Oracle rounds spent reaching the decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
    /// True when the move came from deterministic fallback rather than an
    /// oracle judgment.
    #[serde(default)]
    pub fallback_used: bool,
}

// ============================================================================
// DecisionEngine - orchestration
// ============================================================================

/// Move-decision orchestrator for one game session.
///
/// Owns the rules collaborator, the oracle handle, plan persistence and
/// configuration. One engine serves one session; call [`decide`] once per
/// engine move.
///
/// [`decide`]: DecisionEngine::decide
pub struct DecisionEngine<R: Rules> {
    rules: R,
    oracle: Arc<dyn Oracle>,
    store: Box<dyn PlanStore>,
    cache: PlanCache,
    config: EngineConfig,
    session: SessionId,
}

impl<R: Rules> DecisionEngine<R> {
    /// Build an engine, warming the plan cache from the store when the
    /// session already has a plan.
    pub fn new(
        rules: R,
        oracle: Arc<dyn Oracle>,
        store: Box<dyn PlanStore>,
        config: EngineConfig,
        session: SessionId,
    ) -> Self {
        let mut cache = PlanCache::new();
        match store.get(&session) {
            Ok(Some(record)) => cache.warm(&record.plan),
            Ok(None) => {}
            Err(error) => tracing::warn!(%error, "failed to read stored plan"),
        }
        Self {
            rules,
            oracle,
            store,
            cache,
            config,
            session,
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Active strategic plan, if the session holds one.
    #[must_use]
    pub fn plan(&self) -> Option<&StrategicPlan> {
        self.cache.current()
    }

    /// Forget the session's plan, in memory and in the store.
    pub fn reset(&mut self) {
        self.cache.clear(self.store.as_mut(), &self.session);
    }

    /// Decide and apply one move for the configured color.
    ///
    /// # Errors
    ///
    /// Fails when the request does not validate (bad position, terminal
    /// game, wrong side to move, no legal moves), when the rules
    /// collaborator fails, when the oracle never answers, or when every
    /// attempt is exhausted with fallback disabled.
    pub async fn decide(
        &mut self,
        request: DecisionRequest,
    ) -> Result<DecisionOutcome, DecisionError> {
        let board = BoardState::parse(&request.position)?;

        let status = self.rules.status(&request.position)?;
        if status.is_terminal() {
            return Err(DecisionError::AlreadyTerminal { status });
        }

        let side_to_move = self.rules.turn(&request.position)?;
        if side_to_move != self.config.engine.color {
            return Err(DecisionError::NotToMove {
                engine: self.config.engine.color,
                side_to_move,
            });
        }

        let mut legal = self.rules.legal_moves(&request.position)?;
        if legal.is_empty() {
            return Err(DecisionError::NoLegalMoves);
        }

        let phase = phase::classify(&board, request.ply_count, self.config.phase);

        // Adopt the caller's echoed plan before any early return, so a
        // forced move still carries the plan forward in its outcome.
        if let Some(prior) = &request.prior_plan {
            self.cache.warm(prior);
        }

        // A forced move needs no deliberation and spends no oracle calls.
        if legal.len() == 1 {
            let candidate = MoveCandidate::new(legal.remove(0), 0, "only legal move");
            tracing::debug!(notation = %candidate.notation(), "single legal move");
            return self.finish(
                &request,
                candidate,
                "Only legal move available.".to_owned(),
                phase,
                Vec::new(),
                Some(1),
                false,
            );
        }

        let candidates = scoring::rank_candidates(&self.rules, &request.position, legal);

        let narrative = if self.config.engine.narrate_history {
            narrative::summarize(self.oracle.as_ref(), &request.move_history, self.config.oracle)
                .await
        } else {
            narrative::plain_summary(&request.move_history)
        };

        let seed = PlanSeed {
            board: &board,
            position: &request.position,
            narrative: &narrative,
            phase,
            ply: request.ply_count,
        };
        self.cache
            .ensure(
                self.oracle.as_ref(),
                self.store.as_mut(),
                &self.session,
                &seed,
                &self.config,
            )
            .await;

        let ctx = PromptContext {
            board: &board,
            color: self.config.engine.color,
            phase,
            candidates: &candidates,
            narrative: &narrative,
            plan: self.cache.current(),
        };

        match self.config.engine.strategy {
            Strategy::Direct => {
                let decided = direct::run(self.oracle.as_ref(), &ctx, &self.config).await?;
                self.finish(
                    &request,
                    decided.candidate,
                    decided.rationale,
                    phase,
                    Vec::new(),
                    Some(decided.attempts_used),
                    decided.fallback,
                )
            }
            Strategy::Refine => {
                let decided = refine::run(
                    &self.rules,
                    self.oracle.as_ref(),
                    &request.position,
                    &ctx,
                    &self.config,
                )
                .await?;
                self.finish(
                    &request,
                    decided.candidate,
                    decided.rationale,
                    phase,
                    decided.attempts,
                    Some(decided.iterations),
                    decided.fallback,
                )
            }
        }
    }

    /// Apply the chosen move and assemble the outcome.
    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        request: &DecisionRequest,
        candidate: MoveCandidate,
        rationale: String,
        phase: GamePhase,
        attempts: Vec<AttemptRecord>,
        iterations: Option<u32>,
        fallback_used: bool,
    ) -> Result<DecisionOutcome, DecisionError> {
        let applied = self.rules.apply_move(&request.position, candidate.notation())?;
        let is_terminal = applied.is_terminal();
        tracing::info!(
            notation = %candidate.notation(),
            %phase,
            fallback = fallback_used,
            "move decided"
        );
        Ok(DecisionOutcome {
            notation: candidate.notation().to_owned(),
            rationale,
            resulting_position: applied.position,
            phase,
            is_check: applied.is_check,
            is_checkmate: applied.is_checkmate,
            is_stalemate: applied.is_stalemate,
            is_terminal,
            plan: self.cache.current().cloned(),
            attempts,
            iterations,
            fallback_used,
        })
    }
}

#[cfg(test)]
mod testutil;
