//! Property-based tests for the board transform and session turns.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated boards and move sequences.

use proptest::prelude::*;
use spinfour_state::state::{
    evaluate, Board, Cell, Color, MoveOutcome, Outcome, Participant, Position, Session,
    SessionStatus, BOARD_SIZE, RING,
};

fn arbitrary_cell() -> impl Strategy<Value = Cell> {
    prop_oneof![Just(None), Just(Some(Color::White)), Just(Some(Color::Black))]
}

prop_compose! {
    fn arbitrary_board()(rows in prop::array::uniform4(prop::array::uniform4(arbitrary_cell()))) -> Board {
        Board::from_rows(rows)
    }
}

fn arbitrary_color() -> impl Strategy<Value = Color> {
    prop_oneof![Just(Color::White), Just(Color::Black)]
}

fn arbitrary_position() -> impl Strategy<Value = Position> {
    (0..BOARD_SIZE as i64, 0..BOARD_SIZE as i64)
        .prop_map(|(row, col)| Position::try_new(row, col).unwrap())
}

fn new_session() -> Session {
    let participant = |handle: &str| Participant {
        handle: handle.to_string(),
        name: handle.to_string(),
    };
    Session::start("prop".to_string(), participant("w"), participant("b"))
}

proptest! {
    #[test]
    fn placement_adds_exactly_one_piece(
        board in arbitrary_board(),
        pos in arbitrary_position(),
        color in arbitrary_color(),
    ) {
        prop_assume!(board.is_empty_at(pos));
        let next = board.apply(pos, color);
        prop_assert_eq!(next.piece_count(), board.piece_count() + 1);
    }

    #[test]
    fn apply_is_deterministic(
        board in arbitrary_board(),
        pos in arbitrary_position(),
        color in arbitrary_color(),
    ) {
        prop_assert_eq!(board.apply(pos, color), board.apply(pos, color));
    }

    #[test]
    fn transforms_conserve_each_color(board in arbitrary_board()) {
        let count = |b: &Board, c: Color| {
            b.rows().iter().flatten().filter(|cell| **cell == Some(c)).count()
        };
        let turned = board.rotate_inner().shift_ring();
        prop_assert_eq!(count(&turned, Color::White), count(&board, Color::White));
        prop_assert_eq!(count(&turned, Color::Black), count(&board, Color::Black));
    }

    #[test]
    fn full_cycles_restore_board(board in arbitrary_board()) {
        let mut ring = board;
        for _ in 0..RING.len() {
            ring = ring.shift_ring();
        }
        prop_assert_eq!(ring, board);

        let mut inner = board;
        for _ in 0..4 {
            inner = inner.rotate_inner();
        }
        prop_assert_eq!(inner, board);
    }

    #[test]
    fn evaluate_is_total_and_consistent(board in arbitrary_board()) {
        match evaluate(&board) {
            Outcome::Draw => prop_assert!(board.is_full()),
            Outcome::None => prop_assert!(!board.is_full()),
            Outcome::Win(_) => {}
        }
    }

    #[test]
    fn non_terminal_moves_alternate_turns(
        moves in prop::collection::vec(arbitrary_position(), 1..40),
    ) {
        let mut session = new_session();
        for pos in moves {
            if !session.board.is_empty_at(pos) {
                continue;
            }
            let before = session.turn;
            match session.play(before, pos).unwrap() {
                MoveOutcome::Continue { turn, .. } => {
                    prop_assert_ne!(turn, before);
                    prop_assert_eq!(session.turn, turn);
                }
                MoveOutcome::Finished { .. } => {
                    prop_assert_eq!(session.status, SessionStatus::Finished);
                    break;
                }
            }
        }
    }
}

#[test]
fn ring_shift_is_a_bijection_on_twelve_cells() {
    let mut targets = Vec::new();
    for (i, &(row, col)) in RING.iter().enumerate() {
        let pos = Position::try_new(row as i64, col as i64).unwrap();
        let mut single = [[None; BOARD_SIZE]; BOARD_SIZE];
        single[pos.row][pos.col] = Some(Color::White);

        let shifted = Board::from_rows(single).shift_ring();
        assert_eq!(shifted.piece_count(), 1);

        let (to_row, to_col) = RING[(i + RING.len() - 1) % RING.len()];
        assert_eq!(shifted.rows()[to_row][to_col], Some(Color::White));
        targets.push((to_row, to_col));
    }

    targets.sort();
    targets.dedup();
    assert_eq!(targets.len(), 12);
}
