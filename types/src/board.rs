//! Serialized positions and their read-only parsed form.
//!
//! Positions are produced and mutated by the rules collaborator; the engine
//! only ever reads them. Parsing here covers exactly what decision logic
//! needs - piece placement for material accounting and board rendering, the
//! side to move, and the fullmove number. Legality stays behind the rules
//! seam.

use crate::{Color, Piece};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A serialized board position in FEN-style notation, treated as an opaque
/// hand-off value between the caller, the rules engine, and the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(String);

impl Position {
    #[must_use]
    pub fn new(fen: impl Into<String>) -> Self {
        Self(fen.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Position {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("position is empty")]
    Empty,
    #[error("expected 8 ranks, found {0}")]
    RankCount(usize),
    #[error("rank {rank} covers {files} files, expected 8")]
    FileCount { rank: usize, files: usize },
    #[error("unrecognized piece letter {0:?}")]
    InvalidPiece(char),
    #[error("side to move must be 'w' or 'b', found {0:?}")]
    InvalidSideToMove(String),
    #[error("missing side-to-move field")]
    MissingSideToMove,
}

/// Read-only parsed view of a [`Position`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardState {
    // squares[0] is rank 8, matching serialized rank order.
    squares: [[Option<(Color, Piece)>; 8]; 8],
    side_to_move: Color,
    fullmove: u32,
}

impl BoardState {
    pub fn parse(position: &Position) -> Result<Self, PositionError> {
        let text = position.as_str().trim();
        if text.is_empty() {
            return Err(PositionError::Empty);
        }
        let mut fields = text.split_ascii_whitespace();
        let placement = fields.next().ok_or(PositionError::Empty)?;

        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(PositionError::RankCount(ranks.len()));
        }

        let mut squares = [[None; 8]; 8];
        for (row, rank) in ranks.iter().enumerate() {
            let mut file = 0usize;
            for c in rank.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as usize;
                } else {
                    let occupant =
                        Piece::from_fen_char(c).ok_or(PositionError::InvalidPiece(c))?;
                    if file < 8 {
                        squares[row][file] = Some(occupant);
                    }
                    file += 1;
                }
            }
            if file != 8 {
                return Err(PositionError::FileCount {
                    rank: 8 - row,
                    files: file,
                });
            }
        }

        let side_to_move = match fields.next() {
            Some("w") => Color::White,
            Some("b") => Color::Black,
            Some(other) => return Err(PositionError::InvalidSideToMove(other.to_owned())),
            None => return Err(PositionError::MissingSideToMove),
        };

        // Castling rights, en passant and the halfmove clock belong to the
        // rules engine; skip ahead to the fullmove counter when present.
        let fullmove = fields.nth(3).and_then(|f| f.parse().ok()).unwrap_or(1);

        Ok(Self {
            squares,
            side_to_move,
            fullmove,
        })
    }

    #[must_use]
    pub const fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[must_use]
    pub const fn fullmove(&self) -> u32 {
        self.fullmove
    }

    /// Total material on the board for both sides, in pawn units. Kings
    /// contribute nothing.
    #[must_use]
    pub fn material_total(&self) -> u32 {
        self.squares
            .iter()
            .flatten()
            .flatten()
            .map(|&(_, piece)| piece.value())
            .sum()
    }

    /// Material for one side only, in pawn units.
    #[must_use]
    pub fn material_for(&self, color: Color) -> u32 {
        self.squares
            .iter()
            .flatten()
            .flatten()
            .filter(|&&(c, _)| c == color)
            .map(|&(_, piece)| piece.value())
            .sum()
    }

    /// ASCII diagram with rank 8 at the top, suitable for embedding in a
    /// prompt.
    #[must_use]
    pub fn render_ascii(&self) -> String {
        let mut out = String::with_capacity(200);
        for (row, rank) in self.squares.iter().enumerate() {
            out.push_str(&format!("{} |", 8 - row));
            for square in rank {
                out.push(' ');
                out.push(square.map_or('.', |(color, piece)| piece.fen_char(color)));
            }
            out.push('\n');
        }
        out.push_str("    a b c d e f g h\n");
        out
    }
}
