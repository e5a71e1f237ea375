//! Core domain types for Gambit.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the engine.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod board;
pub use board::{BoardState, Position, PositionError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Colors & Pieces
// ============================================================================

/// Side of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Piece kind, independent of color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Piece {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl Piece {
    /// Material value in pawn units. The king carries no material value;
    /// it can never be exchanged.
    #[must_use]
    pub const fn value(self) -> u32 {
        match self {
            Self::Pawn => 1,
            Self::Knight | Self::Bishop => 3,
            Self::Rook => 5,
            Self::Queen => 9,
            Self::King => 0,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pawn => "pawn",
            Self::Knight => "knight",
            Self::Bishop => "bishop",
            Self::Rook => "rook",
            Self::Queen => "queen",
            Self::King => "king",
        }
    }

    /// Parse a FEN piece letter. Uppercase letters are white, lowercase black.
    #[must_use]
    pub fn from_fen_char(c: char) -> Option<(Color, Self)> {
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        let piece = match c.to_ascii_lowercase() {
            'p' => Self::Pawn,
            'n' => Self::Knight,
            'b' => Self::Bishop,
            'r' => Self::Rook,
            'q' => Self::Queen,
            'k' => Self::King,
            _ => return None,
        };
        Some((color, piece))
    }

    #[must_use]
    pub const fn fen_char(self, color: Color) -> char {
        let c = match self {
            Self::Pawn => 'p',
            Self::Knight => 'n',
            Self::Bishop => 'b',
            Self::Rook => 'r',
            Self::Queen => 'q',
            Self::King => 'k',
        };
        match color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }
}

impl std::fmt::Display for Piece {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Game Phase
// ============================================================================

/// Coarse stage of the game. Derived from ply count and remaining material,
/// recomputed every decision - never stored independently of the position
/// that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Opening,
    Middlegame,
    Endgame,
}

impl GamePhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Middlegame => "middlegame",
            Self::Endgame => "endgame",
        }
    }
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Moves & Candidates
// ============================================================================

/// A single legal move as reported by the rules collaborator.
///
/// `notation` is the canonical short encoding the rules engine accepts back
/// in `apply_move`; validation compares against it by exact string match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalMove {
    pub notation: String,
    pub origin: String,
    pub destination: String,
    pub moving_piece: Piece,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_piece: Option<Piece>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<Piece>,
    #[serde(default)]
    pub is_castle: bool,
}

impl LegalMove {
    pub fn new(
        notation: impl Into<String>,
        origin: impl Into<String>,
        destination: impl Into<String>,
        moving_piece: Piece,
    ) -> Self {
        Self {
            notation: notation.into(),
            origin: origin.into(),
            destination: destination.into(),
            moving_piece,
            captured_piece: None,
            promotion: None,
            is_castle: false,
        }
    }

    #[must_use]
    pub fn with_capture(mut self, piece: Piece) -> Self {
        self.captured_piece = Some(piece);
        self
    }

    #[must_use]
    pub fn with_promotion(mut self, piece: Piece) -> Self {
        self.promotion = Some(piece);
        self
    }

    #[must_use]
    pub fn castling(mut self) -> Self {
        self.is_castle = true;
        self
    }
}

/// A legal move annotated with its heuristic score and a one-line
/// description of its salient features.
///
/// Invariant: every legal move for a position has exactly one candidate per
/// decision cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCandidate {
    #[serde(flatten)]
    pub mv: LegalMove,
    pub score: i32,
    pub description: String,
}

impl MoveCandidate {
    pub fn new(mv: LegalMove, score: i32, description: impl Into<String>) -> Self {
        Self {
            mv,
            score,
            description: description.into(),
        }
    }

    #[must_use]
    pub fn notation(&self) -> &str {
        &self.mv.notation
    }
}

// ============================================================================
// Critic Evaluations
// ============================================================================

/// Critic verdict score on the 1-10 scale. Out-of-range values are clamped
/// on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct CriticScore(u8);

impl CriticScore {
    pub const MIN: Self = Self(1);
    pub const MAX: Self = Self(10);

    #[must_use]
    pub fn new(raw: i64) -> Self {
        let clamped = u8::try_from(raw.clamp(1, 10)).unwrap_or(Self::MAX.0);
        Self(clamped)
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl From<u8> for CriticScore {
    fn from(raw: u8) -> Self {
        Self(raw.clamp(1, 10))
    }
}

impl From<CriticScore> for u8 {
    fn from(score: CriticScore) -> Self {
        score.0
    }
}

impl std::fmt::Display for CriticScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Critic verdict for one proposed move. Produced once per attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub approved: bool,
    pub score: CriticScore,
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<String>,
}

impl Evaluation {
    /// A rejection synthesized when the critic itself failed.
    #[must_use]
    pub fn rejection(rationale: impl Into<String>) -> Self {
        Self {
            approved: false,
            score: CriticScore::MIN,
            rationale: rationale.into(),
            suggestions: None,
        }
    }
}

/// One evaluated candidate from the refinement protocol. Appended for every
/// accepted or rejected candidate, never removed; fallback selection scans
/// this list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub notation: String,
    pub candidate_score: i32,
    pub evaluation: Evaluation,
}

// ============================================================================
// Strategic Plans
// ============================================================================

/// Longer-horizon strategic intent, refreshed on a fixed ply cadence rather
/// than every decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategicPlan {
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
    pub phase_at_creation: GamePhase,
    pub created_at_ply: u32,
}

impl StrategicPlan {
    /// Fixed fallback plan used when generation fails and no prior plan
    /// exists.
    #[must_use]
    pub fn neutral(phase: GamePhase, ply: u32) -> Self {
        Self {
            primary_goal: "Improve piece activity while keeping the king safe".to_owned(),
            tactical_patterns: vec![
                "watch for hanging pieces".to_owned(),
                "look for forks and pins".to_owned(),
            ],
            coordination_note: "Coordinate pieces before committing to an attack".to_owned(),
            key_squares: vec![
                "d4".to_owned(),
                "e4".to_owned(),
                "d5".to_owned(),
                "e5".to_owned(),
            ],
            pawn_plan: "Keep the pawn structure solid; avoid creating weaknesses".to_owned(),
            threat_note: "No immediate threats identified".to_owned(),
            move_priorities: vec![
                "king safety".to_owned(),
                "piece activity".to_owned(),
                "central control".to_owned(),
            ],
            phase_at_creation: phase,
            created_at_ply: ply,
        }
    }
}

/// Wholesale persistence payload for one session's plan. Overwritten on
/// refresh, removed on clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRecord {
    pub plan: StrategicPlan,
    pub reasoning: String,
    pub phase: GamePhase,
    pub created_at_ply: u32,
    pub position: Position,
}

// ============================================================================
// Session Identity
// ============================================================================

#[derive(Debug, Error)]
#[error("session id must not be empty")]
pub struct EmptySessionIdError;

/// Store key scoping plan persistence to one game session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptySessionIdError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(EmptySessionIdError)
        } else {
            Ok(Self(value))
        }
    }

    /// A fresh random identifier for callers that do not bring their own.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionId {
    type Error = EmptySessionIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionId> for String {
    fn from(value: SessionId) -> Self {
        value.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piece_values_follow_fixed_table() {
        assert_eq!(Piece::Pawn.value(), 1);
        assert_eq!(Piece::Knight.value(), 3);
        assert_eq!(Piece::Bishop.value(), 3);
        assert_eq!(Piece::Rook.value(), 5);
        assert_eq!(Piece::Queen.value(), 9);
        assert_eq!(Piece::King.value(), 0);
    }

    #[test]
    fn piece_fen_chars_round_trip() {
        assert_eq!(Piece::from_fen_char('N'), Some((Color::White, Piece::Knight)));
        assert_eq!(Piece::from_fen_char('q'), Some((Color::Black, Piece::Queen)));
        assert_eq!(Piece::from_fen_char('x'), None);
        assert_eq!(Piece::Knight.fen_char(Color::White), 'N');
        assert_eq!(Piece::Queen.fen_char(Color::Black), 'q');
    }

    #[test]
    fn color_opponent_flips() {
        assert_eq!(Color::White.opponent(), Color::Black);
        assert_eq!(Color::Black.opponent(), Color::White);
    }

    #[test]
    fn game_phase_strings_are_lowercase() {
        assert_eq!(GamePhase::Opening.as_str(), "opening");
        assert_eq!(GamePhase::Middlegame.as_str(), "middlegame");
        assert_eq!(GamePhase::Endgame.as_str(), "endgame");
    }

    // ========================================================================
    // CriticScore Tests
    // ========================================================================

    #[test]
    fn critic_score_clamps_out_of_range_input() {
        assert_eq!(CriticScore::new(-3), CriticScore::MIN);
        assert_eq!(CriticScore::new(0), CriticScore::MIN);
        assert_eq!(CriticScore::new(7).get(), 7);
        assert_eq!(CriticScore::new(10), CriticScore::MAX);
        assert_eq!(CriticScore::new(250), CriticScore::MAX);
    }

    #[test]
    fn critic_score_clamps_on_deserialize() {
        let score: CriticScore = serde_json::from_str("42").unwrap();
        assert_eq!(score, CriticScore::MAX);
        let score: CriticScore = serde_json::from_str("0").unwrap();
        assert_eq!(score, CriticScore::MIN);
    }

    #[test]
    fn evaluation_rejection_scores_minimum() {
        let rejection = Evaluation::rejection("critic unavailable");
        assert!(!rejection.approved);
        assert_eq!(rejection.score, CriticScore::MIN);
    }

    // ========================================================================
    // Move & Candidate Tests
    // ========================================================================

    #[test]
    fn legal_move_builders_set_flags() {
        let mv = LegalMove::new("exd5", "e4", "d5", Piece::Pawn).with_capture(Piece::Knight);
        assert_eq!(mv.captured_piece, Some(Piece::Knight));
        assert!(!mv.is_castle);

        let castle = LegalMove::new("O-O", "e1", "g1", Piece::King).castling();
        assert!(castle.is_castle);
    }

    #[test]
    fn move_candidate_serializes_flat() {
        let candidate = MoveCandidate::new(
            LegalMove::new("Nf3", "g1", "f3", Piece::Knight),
            12,
            "develops the knight",
        );
        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(json["notation"], "Nf3");
        assert_eq!(json["movingPiece"], "knight");
        assert_eq!(json["score"], 12);
        assert!(json.get("mv").is_none());
    }

    #[test]
    fn attempt_record_uses_camel_case_keys() {
        let record = AttemptRecord {
            notation: "e4".to_owned(),
            candidate_score: 5,
            evaluation: Evaluation::rejection("too loose"),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["candidateScore"], 5);
        assert_eq!(json["evaluation"]["approved"], false);
    }

    // ========================================================================
    // Plan Tests
    // ========================================================================

    #[test]
    fn neutral_plan_stamps_phase_and_ply() {
        let plan = StrategicPlan::neutral(GamePhase::Endgame, 41);
        assert_eq!(plan.phase_at_creation, GamePhase::Endgame);
        assert_eq!(plan.created_at_ply, 41);
        assert!(!plan.primary_goal.is_empty());
    }

    #[test]
    fn plan_record_round_trips_with_camel_case_keys() {
        let record = PlanRecord {
            plan: StrategicPlan::neutral(GamePhase::Opening, 0),
            reasoning: "default".to_owned(),
            phase: GamePhase::Opening,
            created_at_ply: 0,
            position: Position::new("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("createdAtPly").is_some());
        assert!(json["plan"].get("primaryGoal").is_some());

        let back: PlanRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn plan_tolerates_sparse_json() {
        // Oracle output frequently omits list fields; only the goal and the
        // stamps are required.
        let json = r#"{
            "primaryGoal": "attack the kingside",
            "phaseAtCreation": "middlegame",
            "createdAtPly": 14
        }"#;
        let plan: StrategicPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.primary_goal, "attack the kingside");
        assert!(plan.tactical_patterns.is_empty());
        assert_eq!(plan.phase_at_creation, GamePhase::Middlegame);
    }

    // ========================================================================
    // SessionId Tests
    // ========================================================================

    #[test]
    fn session_id_rejects_empty() {
        assert!(SessionId::new("").is_err());
        assert!(SessionId::new("   ").is_err());
        assert!(SessionId::new("game-42").is_ok());
    }

    #[test]
    fn generated_session_ids_differ() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }
}
