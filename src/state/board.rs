//! Board state and the per-move transform.
//!
//! Every accepted move runs the same three steps on a snapshot of the
//! board: the piece is written, the inner 2x2 block turns clockwise, and
//! the 12-cell outer ring shifts one step counter-clockwise. The result is
//! a fresh `Board`; the input is never touched.
//!
//! ```text
//!   ring index (clockwise from the top-left corner)
//!
//!    0  1  2  3
//!   11  .  .  4
//!   10  .  .  5
//!    9  8  7  6
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use super::game::GameError;

/// Board dimensions.
pub const BOARD_SIZE: usize = 4;

/// Outer ring in clockwise order starting at the top-left corner.
pub const RING: [(usize, usize); 12] = [
    (0, 0),
    (0, 1),
    (0, 2),
    (0, 3),
    (1, 3),
    (2, 3),
    (3, 3),
    (3, 2),
    (3, 1),
    (3, 0),
    (2, 0),
    (1, 0),
];

/// Inner zone in clockwise order starting at its top-left cell.
pub const INNER: [(usize, usize); 4] = [(1, 1), (1, 2), (2, 2), (2, 1)];

/// Piece color. White moves first and is always the player who waited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }

    /// The other color.
    pub fn opponent(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell. `None` is empty and serializes as `null`.
pub type Cell = Option<Color>;

/// A validated board coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    /// Build a position from raw client coordinates.
    pub fn try_new(row: i64, col: i64) -> Result<Self, GameError> {
        let in_range = |v: i64| (0..BOARD_SIZE as i64).contains(&v);
        if in_range(row) && in_range(col) {
            Ok(Self {
                row: row as usize,
                col: col as usize,
            })
        } else {
            Err(GameError::InvalidCoordinate)
        }
    }

    /// Whether the position lies in the rotating inner zone.
    pub fn is_inner(&self) -> bool {
        (1..=2).contains(&self.row) && (1..=2).contains(&self.col)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// 4x4 game board.
///
/// `Board` is `Copy`; all transforms return a new value so a reader holding
/// an earlier board never sees a half-applied move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    /// An empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a board from explicit rows (for restoring state and tests).
    pub fn from_rows(cells: [[Cell; BOARD_SIZE]; BOARD_SIZE]) -> Self {
        Self { cells }
    }

    pub fn rows(&self) -> &[[Cell; BOARD_SIZE]; BOARD_SIZE] {
        &self.cells
    }

    /// Get cell at position.
    pub fn get(&self, pos: Position) -> Cell {
        self.cells[pos.row][pos.col]
    }

    pub fn is_empty_at(&self, pos: Position) -> bool {
        self.get(pos).is_none()
    }

    /// Number of occupied cells.
    pub fn piece_count(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }

    /// Whether every cell is occupied.
    pub fn is_full(&self) -> bool {
        self.piece_count() == BOARD_SIZE * BOARD_SIZE
    }

    /// Place `color` at `pos`, then rotate the inner zone and shift the ring.
    ///
    /// Occupancy and turn order are the caller's responsibility. Placing on
    /// an occupied cell overwrites it.
    pub fn apply(&self, pos: Position, color: Color) -> Board {
        let mut placed = *self;
        placed.cells[pos.row][pos.col] = Some(color);
        placed.rotate_inner().shift_ring()
    }

    /// Turn the inner 2x2 block 90 degrees clockwise.
    pub fn rotate_inner(&self) -> Board {
        self.cycle(&INNER, INNER.len() - 1)
    }

    /// Move every ring cell one step counter-clockwise.
    pub fn shift_ring(&self) -> Board {
        self.cycle(&RING, 1)
    }

    /// Each cell in `path` takes the value found `offset` steps further along
    /// it, read from the unmodified snapshot `self`.
    fn cycle(&self, path: &[(usize, usize)], offset: usize) -> Board {
        let mut next = *self;
        for (i, &(row, col)) in path.iter().enumerate() {
            let (src_row, src_col) = path[(i + offset) % path.len()];
            next.cells[row][col] = self.cells[src_row][src_col];
        }
        next
    }

    /// Convert board to JSON.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            let line: String = row
                .iter()
                .map(|c| match c {
                    Some(Color::White) => 'W',
                    Some(Color::Black) => 'B',
                    None => '.',
                })
                .collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
