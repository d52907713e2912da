//! Game session payload types and the board wire representation.
//!
//! The full game state travels in every [`GameUpdate`] broadcast: clients
//! never diff, they replace. Cell markers keep the compact one-character
//! wire form (`" "`, `"w"`, `"b"`) so a board serializes as 64 short
//! strings.

use serde::{Deserialize, Serialize};

use super::Outcome;

/// Board side length.
pub const BOARD_SIZE: usize = 8;

/// Total cell count of a full board.
pub const BOARD_CELLS: usize = BOARD_SIZE * BOARD_SIZE;

/// Token color and seat identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    /// The white seat.
    White,
    /// The black seat. Black moves first.
    Black,
}

impl Color {
    /// The opposing color.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::White => write!(f, "white"),
            Self::Black => write!(f, "black"),
        }
    }
}

/// State of a single board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Cell {
    /// No token placed.
    #[default]
    #[serde(rename = " ")]
    Empty,
    /// A white token.
    #[serde(rename = "w")]
    White,
    /// A black token.
    #[serde(rename = "b")]
    Black,
}

impl From<Color> for Cell {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Self::White,
            Color::Black => Self::Black,
        }
    }
}

/// The 8x8 playing board.
///
/// Row-major. Out-of-range accesses return `None`/`false` rather than
/// panicking; callers validate coordinates before mutating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board(pub [[Cell; BOARD_SIZE]; BOARD_SIZE]);

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// An empty board.
    #[must_use]
    pub const fn new() -> Self {
        Self([[Cell::Empty; BOARD_SIZE]; BOARD_SIZE])
    }

    /// Cell at `(row, column)`. `None` if out of range.
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Option<Cell> {
        self.0.get(row).and_then(|r| r.get(column)).copied()
    }

    /// Write a cell. Returns `false` (board unchanged) if out of range.
    pub fn set(&mut self, row: usize, column: usize, cell: Cell) -> bool {
        match self.0.get_mut(row).and_then(|r| r.get_mut(column)) {
            Some(slot) => {
                *slot = cell;
                true
            },
            None => false,
        }
    }

    /// Number of non-empty cells.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.0.iter().flatten().filter(|c| **c != Cell::Empty).count()
    }

    /// True when all 64 cells hold a token.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.occupied() == BOARD_CELLS
    }
}

/// One of the two game seats as seen on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeatView {
    /// Session id holding the seat; `None` while unassigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<u64>,
    /// Username of the seat holder; empty while unassigned.
    pub username: String,
}

/// Full authoritative game state, broadcast to the game's room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// The entire board.
    pub board: Board,
    /// The white seat.
    pub player_white: SeatView,
    /// The black seat.
    pub player_black: SeatView,
    /// Whose turn the server believes it is.
    pub whose_turn: Color,
    /// Wall-clock milliseconds of the last accepted move (or creation).
    pub last_move_ms: u64,
}

/// Request to start a game with another member of the sender's room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStart {
    /// Session id of the opponent.
    pub requested_user: u64,
}

/// Game id handshake, sent identically to both parties on success, or to
/// the requester alone on failure.
///
/// The handshake only mints the id. Neither party is moved anywhere: the
/// client must follow up with a room join where `room == game_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStartResponse {
    /// Request outcome.
    pub result: Outcome,
    /// Failure reason; absent on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Minted game id; empty on failure.
    pub game_id: String,
    /// The opponent's session id; zero on failure.
    pub session_id: u64,
}

impl GameStartResponse {
    /// Successful handshake naming the opponent.
    #[must_use]
    pub fn ok(game_id: impl Into<String>, session_id: u64) -> Self {
        Self { result: Outcome::Success, message: None, game_id: game_id.into(), session_id }
    }

    /// Local failure response.
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            result: Outcome::Fail,
            message: Some(message.into()),
            game_id: String::new(),
            session_id: 0,
        }
    }
}

/// Request to place a token on the board of the sender's current game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayToken {
    /// Target row, `0..8`.
    pub row: u8,
    /// Target column, `0..8`.
    pub column: u8,
    /// Claimed color. Must match the sender's seat.
    pub color: Color,
}

/// Acknowledgment of a token placement, sent to the sender only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayTokenResponse {
    /// Request outcome.
    pub result: Outcome,
    /// Failure reason; absent on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PlayTokenResponse {
    /// Successful acknowledgment.
    #[must_use]
    pub fn ok() -> Self {
        Self { result: Outcome::Success, message: None }
    }

    /// Local failure response.
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self { result: Outcome::Fail, message: Some(message.into()) }
    }
}

/// Full game state broadcast, the single source of truth push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameUpdate {
    /// Always success; failed requests never produce an update.
    pub result: Outcome,
    /// Id of the game (and of its room).
    pub game_id: String,
    /// The full game state.
    pub game: GameSnapshot,
    /// What caused this push, e.g. `"initial update"`.
    pub message: String,
}

/// Terminal game state, broadcast once when the board fills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOver {
    /// Always success.
    pub result: Outcome,
    /// Id of the finished game.
    pub game_id: String,
    /// The final game state.
    pub game: GameSnapshot,
    /// Reported outcome. Win detection is not implemented; the server
    /// reports the fixed string `"everyone"`.
    pub who_won: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_board_has_no_tokens() {
        let board = Board::new();
        assert_eq!(board.occupied(), 0);
        assert!(!board.is_full());
        assert_eq!(board.cell(3, 3), Some(Cell::Empty));
    }

    #[test]
    fn out_of_range_access_is_safe() {
        let mut board = Board::new();
        assert_eq!(board.cell(8, 0), None);
        assert_eq!(board.cell(0, 99), None);
        assert!(!board.set(8, 8, Cell::White));
        assert_eq!(board.occupied(), 0);
    }

    #[test]
    fn set_and_count() {
        let mut board = Board::new();
        assert!(board.set(3, 3, Cell::White));
        assert!(board.set(3, 4, Cell::Black));
        assert_eq!(board.occupied(), 2);
        assert_eq!(board.cell(3, 3), Some(Cell::White));
    }

    #[test]
    fn full_board_detection() {
        let mut board = Board::new();
        for row in 0..BOARD_SIZE {
            for column in 0..BOARD_SIZE {
                board.set(row, column, Cell::Black);
            }
        }
        assert!(board.is_full());
        assert_eq!(board.occupied(), BOARD_CELLS);
    }

    #[test]
    fn cell_wire_markers() {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&Cell::White, &mut buf).unwrap();
        let text: String = ciborium::de::from_reader(buf.as_slice()).unwrap();
        assert_eq!(text, "w");

        buf.clear();
        ciborium::ser::into_writer(&Cell::Empty, &mut buf).unwrap();
        let text: String = ciborium::de::from_reader(buf.as_slice()).unwrap();
        assert_eq!(text, " ");
    }

    #[test]
    fn color_opposite() {
        assert_eq!(Color::White.opposite(), Color::Black);
        assert_eq!(Color::Black.opposite(), Color::White);
    }

    #[test]
    fn snapshot_round_trip() {
        let snapshot = GameSnapshot {
            board: Board::new(),
            player_white: SeatView { session_id: Some(1), username: "alice".to_string() },
            player_black: SeatView::default(),
            whose_turn: Color::Black,
            last_move_ms: 1_700_000_000_000,
        };

        let mut buf = Vec::new();
        ciborium::ser::into_writer(&snapshot, &mut buf).unwrap();
        let decoded: GameSnapshot = ciborium::de::from_reader(buf.as_slice()).unwrap();
        assert_eq!(snapshot, decoded);
    }
}
