//! Defensive parsing of free-form oracle text.
//!
//! The oracle promises nothing about format. Every extractor here returns
//! a typed result; nothing in this module panics on arbitrary input.

use std::sync::OnceLock;

use gambit_types::{CriticScore, Evaluation, GamePhase, StrategicPlan};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum ParseError {
    #[error("no MOVE line in the reply")]
    MissingMove,
    #[error("no JSON object in the reply")]
    MissingJson,
    #[error("malformed JSON in the reply: {0}")]
    BadJson(String),
}

struct Extractors {
    move_line: Regex,
    reason_line: Regex,
    score_mention: Regex,
    rejection_word: Regex,
    approval_word: Regex,
}

impl Extractors {
    fn new() -> Self {
        Self {
            move_line: Regex::new(r"(?im)^\s*MOVE\s*:\s*(.+)$").expect("valid move marker regex"),
            reason_line: Regex::new(r"(?im)^\s*REASON\s*:\s*(.+)$")
                .expect("valid reason marker regex"),
            score_mention: Regex::new(r"(?i)\bscore\b\s*[:=]?\s*(\d{1,3})")
                .expect("valid score mention regex"),
            rejection_word: Regex::new(r"(?i)\b(?:rejected|not\s+approved|(?:dis|un)approved)\b")
                .expect("valid rejection keyword regex"),
            approval_word: Regex::new(r"(?i)\bapproved\b").expect("valid approval keyword regex"),
        }
    }
}

static EXTRACTORS: OnceLock<Extractors> = OnceLock::new();

fn extractors() -> &'static Extractors {
    EXTRACTORS.get_or_init(Extractors::new)
}

/// Move and rationale pulled from a decision reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedDecision {
    pub notation: String,
    pub rationale: String,
}

/// Extract the `MOVE:`/`REASON:` marker lines from a decision reply.
///
/// A missing move token is a parse failure; a missing reason is tolerated
/// and yields an empty rationale.
pub(crate) fn decision_reply(text: &str) -> Result<ParsedDecision, ParseError> {
    let notation = move_token(text).ok_or(ParseError::MissingMove)?;
    let rationale = extractors()
        .reason_line
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_owned())
        .unwrap_or_default();
    Ok(ParsedDecision {
        notation,
        rationale,
    })
}

/// Extract just the proposed notation from a proposer reply.
pub(crate) fn proposal(text: &str) -> Result<String, ParseError> {
    move_token(text).ok_or(ParseError::MissingMove)
}

fn move_token(text: &str) -> Option<String> {
    let line = extractors()
        .move_line
        .captures(text)
        .and_then(|caps| caps.get(1))?
        .as_str();
    // Oracles decorate: "MOVE: `Nf3` (best by test)". Take the first word
    // and shed quoting and trailing punctuation.
    let token = line
        .split_whitespace()
        .next()?
        .trim_matches(|c: char| matches!(c, '`' | '"' | '\'' | '*' | '.' | ',' | ';' | ')' | '('));
    if token.is_empty() {
        None
    } else {
        Some(token.to_owned())
    }
}

/// First balanced JSON object embedded in `text`, braces inside string
/// literals accounted for.
pub(crate) fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, byte) in text.as_bytes().iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if *byte == b'\\' {
                escaped = true;
            } else if *byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=offset]);
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Debug, Deserialize)]
struct CriticDraft {
    approved: Option<bool>,
    score: Option<i64>,
    rationale: Option<String>,
    suggestions: Option<String>,
}

/// Read a critic verdict out of a reply.
///
/// JSON is preferred; a keyword scan covers oracles that answer in prose.
/// The explicit approved/rejected statement wins; otherwise the numeric
/// score against `threshold` decides. `None` when no verdict of either
/// kind can be read.
pub(crate) fn critic_verdict(text: &str, threshold: CriticScore) -> Option<Evaluation> {
    if let Some(json) = extract_json(text)
        && let Ok(draft) = serde_json::from_str::<CriticDraft>(json)
    {
        let score = draft.score.map_or(CriticScore::MIN, CriticScore::new);
        return Some(Evaluation {
            approved: draft.approved.unwrap_or(score >= threshold),
            score,
            rationale: draft.rationale.unwrap_or_default(),
            suggestions: draft.suggestions,
        });
    }

    // Keyword fallback, on word boundaries so "disapproved" never reads as
    // approval. Negations first: "not approved" still has the bare word.
    let stated = if extractors().rejection_word.is_match(text) {
        Some(false)
    } else if extractors().approval_word.is_match(text) {
        Some(true)
    } else {
        None
    };
    let mentioned = extractors()
        .score_mention
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .map(CriticScore::new);
    if stated.is_none() && mentioned.is_none() {
        return None;
    }
    let score = mentioned.unwrap_or(CriticScore::MIN);
    Some(Evaluation {
        approved: stated.unwrap_or(score >= threshold),
        score,
        rationale: text.trim().to_owned(),
        suggestions: None,
    })
}

/// Plan fields as the oracle writes them. The refresh stamps are added by
/// the cache, never trusted from the reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlanDraft {
    pub primary_goal: String,
    #[serde(default)]
    pub tactical_patterns: Vec<String>,
    #[serde(default)]
    pub coordination_note: String,
    #[serde(default)]
    pub key_squares: Vec<String>,
    #[serde(default)]
    pub pawn_plan: String,
    #[serde(default)]
    pub threat_note: String,
    #[serde(default)]
    pub move_priorities: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
}

impl PlanDraft {
    pub(crate) fn into_plan(self, phase: GamePhase, ply: u32) -> (StrategicPlan, String) {
        let plan = StrategicPlan {
            primary_goal: self.primary_goal,
            tactical_patterns: self.tactical_patterns,
            coordination_note: self.coordination_note,
            key_squares: self.key_squares,
            pawn_plan: self.pawn_plan,
            threat_note: self.threat_note,
            move_priorities: self.move_priorities,
            phase_at_creation: phase,
            created_at_ply: ply,
        };
        (plan, self.reasoning)
    }
}

/// Parse a plan-generation reply into its draft fields.
pub(crate) fn plan_draft(text: &str) -> Result<PlanDraft, ParseError> {
    let json = extract_json(text).ok_or(ParseError::MissingJson)?;
    serde_json::from_str(json).map_err(|error| ParseError::BadJson(error.to_string()))
}
