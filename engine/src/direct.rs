//! Single-role decision protocol.
//!
//! One oracle call is asked to pick from the scored candidate list. Replies
//! that cannot be read, or that name a move outside the list, burn an attempt
//! and trigger a rebuilt prompt carrying the rejection. The attempt budget is
//! a hard ceiling; what happens at exhaustion depends on how the attempts
//! failed and on `fallback_on_exhaustion`.

use gambit_oracle::{Oracle, OracleError};
use gambit_types::MoveCandidate;

use crate::config::EngineConfig;
use crate::error::DecisionError;
use crate::parse;
use crate::prompt::{self, PromptContext, RetryFeedback};

/// What the direct protocol settled on.
#[derive(Debug)]
pub(crate) struct DirectOutcome {
    pub candidate: MoveCandidate,
    pub rationale: String,
    pub attempts_used: u32,
    pub fallback: bool,
}

pub(crate) async fn run(
    oracle: &dyn Oracle,
    ctx: &PromptContext<'_>,
    config: &EngineConfig,
) -> Result<DirectOutcome, DecisionError> {
    let max_attempts = config.limits.max_attempts;
    let mut feedback: Option<RetryFeedback> = None;
    let mut oracle_failures: u32 = 0;
    let mut last_oracle_error: Option<OracleError> = None;

    for attempt in 1..=max_attempts {
        let request = config
            .oracle
            .request(prompt::decision_prompt(ctx, feedback.as_ref()))
            .with_system(prompt::DECIDER_SYSTEM);

        let reply = match oracle.complete(request).await {
            Ok(completion) => completion.text,
            Err(error) => {
                tracing::warn!(attempt, %error, "oracle call failed");
                oracle_failures += 1;
                last_oracle_error = Some(error);
                // Nothing to correct in the prompt; retry it as-is.
                continue;
            }
        };

        match parse::decision_reply(&reply) {
            Ok(parsed) => {
                if let Some(candidate) = ctx
                    .candidates
                    .iter()
                    .find(|c| c.notation() == parsed.notation)
                {
                    let rationale = if parsed.rationale.is_empty() {
                        candidate.description.clone()
                    } else {
                        parsed.rationale
                    };
                    return Ok(DirectOutcome {
                        candidate: candidate.clone(),
                        rationale,
                        attempts_used: attempt,
                        fallback: false,
                    });
                }
                tracing::debug!(attempt, notation = %parsed.notation, "oracle chose an illegal move");
                feedback = Some(RetryFeedback {
                    rejected: Some(parsed.notation),
                    reason: "it is not in the legal move list".to_owned(),
                });
            }
            Err(error) => {
                tracing::debug!(attempt, %error, "unreadable oracle reply");
                feedback = Some(RetryFeedback {
                    rejected: None,
                    reason: "the reply did not contain a MOVE: line".to_owned(),
                });
            }
        }
    }

    // The oracle never produced a reply at all: that is an availability
    // problem, not a quality problem, and falling back would mask it.
    if oracle_failures == max_attempts
        && let Some(error) = last_oracle_error
    {
        return Err(DecisionError::OracleUnavailable(error));
    }

    if config.engine.fallback_on_exhaustion
        && let Some(best) = ctx.candidates.first()
    {
        tracing::warn!(
            notation = %best.notation(),
            attempts = max_attempts,
            "attempts exhausted, falling back to top-scored move"
        );
        return Ok(DirectOutcome {
            candidate: best.clone(),
            rationale: format!(
                "Fallback after {max_attempts} failed attempts: {}",
                best.description
            ),
            attempts_used: max_attempts,
            fallback: true,
        });
    }

    Err(DecisionError::ExhaustedRetries {
        attempts: max_attempts,
    })
}
