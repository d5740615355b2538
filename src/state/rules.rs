//! Win and draw detection.
//!
//! Lines are scanned rows first, then columns, then the two diagonals. The
//! transform can complete lines for both colors at once; the first complete
//! line in scan order decides the game.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::board::{Board, Color, Position, BOARD_SIZE};

/// Result of evaluating a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Game continues
    None,
    /// Four in a line
    Win(Color),
    /// Board full with no line
    Draw,
}

impl Outcome {
    /// The recorded winner for a terminal outcome.
    pub fn winner(&self) -> Option<Winner> {
        match self {
            Self::None => None,
            Self::Win(Color::White) => Some(Winner::White),
            Self::Win(Color::Black) => Some(Winner::Black),
            Self::Draw => Some(Winner::Draw),
        }
    }
}

/// Final result of a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    White,
    Black,
    Draw,
}

impl Winner {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
            Self::Draw => "draw",
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All ten lines in scan order.
pub fn lines() -> impl Iterator<Item = [Position; BOARD_SIZE]> {
    let at = |row, col| Position { row, col };
    let rows = (0..BOARD_SIZE).map(move |r| [at(r, 0), at(r, 1), at(r, 2), at(r, 3)]);
    let cols = (0..BOARD_SIZE).map(move |c| [at(0, c), at(1, c), at(2, c), at(3, c)]);
    let diagonals = [
        [at(0, 0), at(1, 1), at(2, 2), at(3, 3)],
        [at(0, 3), at(1, 2), at(2, 1), at(3, 0)],
    ];
    rows.chain(cols).chain(diagonals)
}

/// Evaluate a board after a move.
pub fn evaluate(board: &Board) -> Outcome {
    for line in lines() {
        let first = board.get(line[0]);
        if let Some(color) = first {
            if line.iter().all(|p| board.get(*p) == first) {
                return Outcome::Win(color);
            }
        }
    }

    if board.is_full() {
        Outcome::Draw
    } else {
        Outcome::None
    }
}
