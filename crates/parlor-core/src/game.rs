//! Two-seat game state machine.
//!
//! A [`Game`] owns the board, the two colored seats, and the turn marker.
//! Seat assignment is idempotent under re-entry with the same or
//! overlapping membership sets: a seated session keeps its seat for the
//! game's lifetime, and surplus sessions are reported for eviction rather
//! than reseated.

use parlor_proto::payloads::game::{Board, Cell, Color, GameSnapshot, SeatView};

/// One of the two colored seats.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Seat {
    /// Session holding the seat; `None` while unassigned.
    pub session_id: Option<u64>,
    /// Username of the seat holder; empty while unassigned.
    pub username: String,
}

impl Seat {
    fn assign(&mut self, session_id: u64, username: &str) {
        self.session_id = Some(session_id);
        self.username = username.to_string();
    }

    fn view(&self) -> SeatView {
        SeatView { session_id: self.session_id, username: self.username.clone() }
    }
}

/// Errors from applying a token placement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    /// The mover does not hold the seat of the claimed color.
    #[error("mover is not seated as {0}")]
    SeatMismatch(Color),

    /// The target coordinates fall outside the board.
    #[error("cell ({row}, {column}) is out of range")]
    OutOfBounds {
        /// Claimed row.
        row: usize,
        /// Claimed column.
        column: usize,
    },

    /// The target cell already holds a token.
    #[error("cell ({row}, {column}) is already occupied")]
    CellOccupied {
        /// Claimed row.
        row: usize,
        /// Claimed column.
        column: usize,
    },
}

/// Server-authoritative state of one game.
///
/// # Invariants
///
/// - At most two occupied seats; a seat, once assigned, never changes
///   hands until the game is destroyed.
/// - `whose_turn` flips exactly once per accepted move.
/// - Cell occupancy is monotonically non-decreasing: no move clears or
///   overwrites a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    /// The white seat.
    pub white: Seat,
    /// The black seat.
    pub black: Seat,
    /// Whose turn it is. Tracked and flipped, but deliberately not
    /// enforced against movers: see [`Game::place`].
    pub whose_turn: Color,
    /// The board.
    pub board: Board,
    /// Wall-clock milliseconds of the last accepted move (or creation).
    pub last_move_ms: u64,
    finished: bool,
}

impl Game {
    /// Create a fresh game: empty board, empty seats, black to move.
    #[must_use]
    pub fn new(now_ms: u64) -> Self {
        Self {
            white: Seat::default(),
            black: Seat::default(),
            whose_turn: Color::Black,
            board: Board::new(),
            last_move_ms: now_ms,
            finished: false,
        }
    }

    /// The seat color held by `session_id`, if any.
    #[must_use]
    pub fn seat_of(&self, session_id: u64) -> Option<Color> {
        if self.white.session_id == Some(session_id) {
            Some(Color::White)
        } else if self.black.session_id == Some(session_id) {
            Some(Color::Black)
        } else {
            None
        }
    }

    /// True once both seats are held.
    #[must_use]
    pub fn is_seated(&self) -> bool {
        self.white.session_id.is_some() && self.black.session_id.is_some()
    }

    /// Fill empty seats from the given membership enumeration and report
    /// the sessions that must be evicted.
    ///
    /// Seated members keep their seats regardless of enumeration order.
    /// Unseated members fill white then black in enumeration order; every
    /// unseated member beyond the two seats is returned for eviction, so
    /// a third distinct session never survives a push. Re-running with
    /// the same or an overlapping enumeration is a no-op.
    pub fn assign_seats(&mut self, members: &[(u64, String)]) -> Vec<u64> {
        let mut evicted = Vec::new();

        for (session_id, username) in members {
            if self.seat_of(*session_id).is_some() {
                continue;
            }

            if self.white.session_id.is_none() {
                self.white.assign(*session_id, username);
            } else if self.black.session_id.is_none() {
                self.black.assign(*session_id, username);
            } else {
                evicted.push(*session_id);
            }
        }

        evicted
    }

    /// Apply a token placement.
    ///
    /// The claimed color must match the mover's seat and the target cell
    /// must be an empty, in-range square. Turn order is NOT checked: the
    /// turn marker flips to the opposite color on every accepted move,
    /// but a seat holder may move while the marker points at the
    /// opponent. On error nothing changes.
    pub fn place(
        &mut self,
        session_id: u64,
        row: usize,
        column: usize,
        color: Color,
        now_ms: u64,
    ) -> Result<(), MoveError> {
        if self.seat_of(session_id) != Some(color) {
            return Err(MoveError::SeatMismatch(color));
        }

        match self.board.cell(row, column) {
            None => return Err(MoveError::OutOfBounds { row, column }),
            Some(Cell::Empty) => {},
            Some(_) => return Err(MoveError::CellOccupied { row, column }),
        }

        self.board.set(row, column, Cell::from(color));
        self.whose_turn = color.opposite();
        self.last_move_ms = now_ms;

        Ok(())
    }

    /// Mark the game finished if the board just filled.
    ///
    /// Returns `true` exactly once per game, on the transition to a full
    /// board; later calls return `false` so the terminal broadcast and
    /// the expiry timer fire only once.
    pub fn complete_if_full(&mut self) -> bool {
        if self.finished || !self.board.is_full() {
            return false;
        }
        self.finished = true;
        true
    }

    /// True once the game has been marked finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Wire snapshot of the full game state.
    #[must_use]
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            board: self.board,
            player_white: self.white.view(),
            player_black: self.black.view(),
            whose_turn: self.whose_turn,
            last_move_ms: self.last_move_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use parlor_proto::payloads::game::BOARD_SIZE;

    use super::*;

    fn members(ids: &[u64]) -> Vec<(u64, String)> {
        ids.iter().map(|id| (*id, format!("player-{id}"))).collect()
    }

    #[test]
    fn fresh_game_defaults() {
        let game = Game::new(1000);
        assert_eq!(game.whose_turn, Color::Black);
        assert_eq!(game.board.occupied(), 0);
        assert_eq!(game.white.session_id, None);
        assert_eq!(game.black.session_id, None);
        assert!(!game.is_finished());
    }

    #[test]
    fn first_two_members_fill_white_then_black() {
        let mut game = Game::new(0);
        let evicted = game.assign_seats(&members(&[1, 2]));

        assert!(evicted.is_empty());
        assert_eq!(game.seat_of(1), Some(Color::White));
        assert_eq!(game.seat_of(2), Some(Color::Black));
        assert_eq!(game.white.username, "player-1");
    }

    #[test]
    fn assignment_is_idempotent() {
        let mut game = Game::new(0);
        game.assign_seats(&members(&[1, 2]));

        // Re-enumeration in a different order must not reseat anyone.
        let evicted = game.assign_seats(&members(&[2, 1]));
        assert!(evicted.is_empty());
        assert_eq!(game.seat_of(1), Some(Color::White));
        assert_eq!(game.seat_of(2), Some(Color::Black));
    }

    #[test]
    fn third_member_is_evicted_in_any_position() {
        let mut game = Game::new(0);
        game.assign_seats(&members(&[1, 2]));

        // Intruder enumerated first: the seated pair keeps its seats and
        // the intruder is the one reported.
        let evicted = game.assign_seats(&members(&[3, 1, 2]));
        assert_eq!(evicted, vec![3]);
        assert_eq!(game.seat_of(3), None);

        let evicted = game.assign_seats(&members(&[1, 2, 3]));
        assert_eq!(evicted, vec![3]);
    }

    #[test]
    fn partial_seating_completes_on_second_pass() {
        let mut game = Game::new(0);
        game.assign_seats(&members(&[1]));
        assert_eq!(game.seat_of(1), Some(Color::White));
        assert!(!game.is_seated());

        game.assign_seats(&members(&[1, 2]));
        assert_eq!(game.seat_of(2), Some(Color::Black));
        assert!(game.is_seated());
    }

    #[test]
    fn place_writes_cell_and_flips_turn() {
        let mut game = Game::new(0);
        game.assign_seats(&members(&[1, 2]));

        game.place(1, 3, 3, Color::White, 500).unwrap();

        assert_eq!(game.board.cell(3, 3), Some(Cell::White));
        assert_eq!(game.whose_turn, Color::Black);
        assert_eq!(game.last_move_ms, 500);

        game.place(2, 3, 4, Color::Black, 600).unwrap();
        assert_eq!(game.board.cell(3, 4), Some(Cell::Black));
        assert_eq!(game.whose_turn, Color::White);
    }

    #[test]
    fn out_of_turn_moves_are_accepted() {
        // The turn marker is advisory: a fresh game says black moves
        // first, but white's opening move must still land.
        let mut game = Game::new(0);
        game.assign_seats(&members(&[1, 2]));
        assert_eq!(game.whose_turn, Color::Black);

        game.place(1, 0, 0, Color::White, 1).unwrap();
        assert_eq!(game.whose_turn, Color::Black);
    }

    #[test]
    fn seat_mismatch_rejected_without_side_effects() {
        let mut game = Game::new(0);
        game.assign_seats(&members(&[1, 2]));

        // Session 1 holds white; claiming black must fail.
        let err = game.place(1, 0, 0, Color::Black, 1).unwrap_err();
        assert_eq!(err, MoveError::SeatMismatch(Color::Black));

        // An unseated session fails the same way.
        let err = game.place(9, 0, 0, Color::White, 1).unwrap_err();
        assert_eq!(err, MoveError::SeatMismatch(Color::White));

        assert_eq!(game.board.occupied(), 0);
        assert_eq!(game.whose_turn, Color::Black);
    }

    #[test]
    fn occupied_cell_rejected() {
        let mut game = Game::new(0);
        game.assign_seats(&members(&[1, 2]));
        game.place(1, 2, 2, Color::White, 1).unwrap();

        let err = game.place(2, 2, 2, Color::Black, 2).unwrap_err();
        assert_eq!(err, MoveError::CellOccupied { row: 2, column: 2 });
        assert_eq!(game.board.cell(2, 2), Some(Cell::White));
        assert_eq!(game.whose_turn, Color::Black);
    }

    #[test]
    fn out_of_bounds_rejected() {
        let mut game = Game::new(0);
        game.assign_seats(&members(&[1, 2]));

        let err = game.place(1, 8, 0, Color::White, 1).unwrap_err();
        assert_eq!(err, MoveError::OutOfBounds { row: 8, column: 0 });
    }

    #[test]
    fn completion_fires_exactly_once() {
        let mut game = Game::new(0);
        assert!(!game.complete_if_full());

        for row in 0..BOARD_SIZE {
            for column in 0..BOARD_SIZE {
                game.board.set(row, column, Cell::White);
            }
        }

        assert!(game.complete_if_full());
        assert!(!game.complete_if_full());
        assert!(game.is_finished());
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut game = Game::new(100);
        game.assign_seats(&members(&[5, 6]));
        game.place(5, 1, 1, Color::White, 200).unwrap();

        let snapshot = game.snapshot();
        assert_eq!(snapshot.player_white.session_id, Some(5));
        assert_eq!(snapshot.player_black.username, "player-6");
        assert_eq!(snapshot.whose_turn, Color::Black);
        assert_eq!(snapshot.last_move_ms, 200);
        assert_eq!(snapshot.board.cell(1, 1), Some(Cell::White));
    }
}
