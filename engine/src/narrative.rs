//! Move-history narration for prompt context.
//!
//! By default the history is summarized locally as a plain tail of recent
//! moves. When narration is enabled the oracle is asked for a short prose
//! summary first; any failure there falls back to the plain form, since a
//! decision must never be blocked by flavor text.

use gambit_oracle::Oracle;

use crate::config::OracleSettings;

/// How many trailing moves the plain summary quotes.
const NARRATIVE_WINDOW: usize = 8;

pub(crate) const NARRATOR_SYSTEM: &str =
    "You are a chess commentator. Summarize the game so far in two or three plain sentences.";

/// Deterministic summary: the last few moves verbatim.
pub(crate) fn plain_summary(history: &[String]) -> String {
    if history.is_empty() {
        return "No moves played yet.".to_owned();
    }
    let tail_start = history.len().saturating_sub(NARRATIVE_WINDOW);
    format!("Recent moves: {}", history[tail_start..].join(" "))
}

/// Oracle-narrated summary with the plain form as fallback.
pub(crate) async fn summarize(
    oracle: &dyn Oracle,
    history: &[String],
    settings: OracleSettings,
) -> String {
    if history.is_empty() {
        return plain_summary(history);
    }
    let prompt = format!(
        "Summarize this chess game so far, focusing on themes, imbalances and \
         who stands better. Moves in order: {}",
        history.join(" ")
    );
    let request = settings.request(prompt).with_system(NARRATOR_SYSTEM);
    match oracle.complete(request).await {
        Ok(completion) => completion.text.trim().to_owned(),
        Err(error) => {
            tracing::debug!(%error, "history narration failed, using plain summary");
            plain_summary(history)
        }
    }
}
