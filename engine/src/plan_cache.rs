//! Strategic plan lifecycle.
//!
//! Plans refresh on a ply cadence rather than every decision: one oracle
//! call buys guidance for several moves. The cache tracks when the plan was
//! last refreshed; the store keeps it across process restarts. Generation
//! failure is absorbed - the previous plan, or a fixed neutral one, carries
//! the decision while the next refresh window retries.

use gambit_oracle::{Oracle, OracleError};
use gambit_types::{BoardState, GamePhase, PlanRecord, Position, SessionId, StrategicPlan};
use thiserror::Error;

use crate::config::EngineConfig;
use crate::parse::{self, ParseError};
use crate::prompt;
use crate::store::PlanStore;

#[derive(Debug, Error)]
enum PlanFailure {
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Everything plan generation reads from the current decision.
pub(crate) struct PlanSeed<'a> {
    pub board: &'a BoardState,
    pub position: &'a Position,
    pub narrative: &'a str,
    pub phase: GamePhase,
    pub ply: u32,
}

/// In-memory view of the session's plan plus its refresh bookkeeping.
#[derive(Debug, Default)]
pub(crate) struct PlanCache {
    plan: Option<StrategicPlan>,
    last_refreshed_at_ply: u32,
}

impl PlanCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn current(&self) -> Option<&StrategicPlan> {
        self.plan.as_ref()
    }

    /// Adopt an existing plan (from the store, or echoed by the caller)
    /// without spending an oracle call. A warmed plan never displaces one
    /// already held.
    pub(crate) fn warm(&mut self, plan: &StrategicPlan) {
        if self.plan.is_none() {
            self.last_refreshed_at_ply = plan.created_at_ply;
            self.plan = Some(plan.clone());
        }
    }

    pub(crate) fn needs_refresh(&self, ply: u32, interval: u32) -> bool {
        self.plan.is_none() || ply.saturating_sub(self.last_refreshed_at_ply) >= interval
    }

    /// Make sure a plan is in place for this decision, regenerating when the
    /// refresh cadence says so.
    pub(crate) async fn ensure(
        &mut self,
        oracle: &dyn Oracle,
        store: &mut dyn PlanStore,
        session: &SessionId,
        seed: &PlanSeed<'_>,
        config: &EngineConfig,
    ) {
        if !self.needs_refresh(seed.ply, config.limits.plan_refresh_plies) {
            return;
        }

        match self.regenerate(oracle, seed, config).await {
            Ok((plan, reasoning)) => {
                let record = PlanRecord {
                    plan: plan.clone(),
                    reasoning,
                    phase: seed.phase,
                    created_at_ply: seed.ply,
                    position: seed.position.clone(),
                };
                if let Err(error) = store.put(session, &record) {
                    tracing::warn!(%error, "failed to persist plan, continuing with in-memory copy");
                }
                tracing::debug!(ply = seed.ply, goal = %plan.primary_goal, "plan refreshed");
                self.plan = Some(plan);
                self.last_refreshed_at_ply = seed.ply;
            }
            Err(error) => {
                tracing::warn!(%error, "plan generation failed");
                if self.plan.is_none() {
                    self.plan = Some(StrategicPlan::neutral(seed.phase, seed.ply));
                }
                // Refresh stamp untouched: the next window retries.
            }
        }
    }

    async fn regenerate(
        &self,
        oracle: &dyn Oracle,
        seed: &PlanSeed<'_>,
        config: &EngineConfig,
    ) -> Result<(StrategicPlan, String), PlanFailure> {
        let request = config
            .oracle
            .request(prompt::plan_prompt(
                seed.board,
                config.engine.color,
                seed.phase,
                seed.narrative,
                self.plan.as_ref(),
            ))
            .with_system(prompt::PLAN_SYSTEM);
        let completion = oracle.complete(request).await?;
        let draft = parse::plan_draft(&completion.text)?;
        Ok(draft.into_plan(seed.phase, seed.ply))
    }

    /// Drop the plan here and in the store; used on session reset.
    pub(crate) fn clear(&mut self, store: &mut dyn PlanStore, session: &SessionId) {
        self.plan = None;
        self.last_refreshed_at_ply = 0;
        if let Err(error) = store.clear(session) {
            tracing::warn!(%error, "failed to clear stored plan");
        }
    }
}
