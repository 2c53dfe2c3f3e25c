//! Fleet placement legality and turn target checks.
//!
//! A legal placement consists of straight horizontal or vertical runs of
//! `SHIP` cells, no two runs touching (diagonals included), whose lengths
//! match [`FLEET`] exactly.

use rand::Rng;

use crate::board::{Board, BoardError, Cell, Coord};
use crate::config::{fleet_count, BOARD_SIZE, FLEET, MAX_SHIP_LENGTH};

/// Why a placement was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("ship at {0} is not a straight line")]
    BentShip(Coord),
    #[error("ship at {0} touches another ship")]
    Touching(Coord),
    #[error("ship at {at} has length {length}, which the fleet does not need")]
    UnexpectedLength { at: Coord, length: usize },
    #[error("ship at {0} is surplus to the fleet")]
    Surplus(Coord),
    #[error("fleet is incomplete")]
    Incomplete,
}

/// Visited set over the 100 cells.
#[derive(Clone, Copy, Default)]
struct Visited(u128);

impl Visited {
    fn contains(&self, coord: Coord) -> bool {
        self.0 & (1u128 << coord.index()) != 0
    }

    fn insert(&mut self, coord: Coord) {
        self.0 |= 1u128 << coord.index();
    }
}

fn is_ship(board: &Board, row: isize, col: isize) -> bool {
    board.at(row, col) == Some(Cell::Ship)
}

/// Length of the contiguous `SHIP` run starting at `start` in direction
/// (`dr`, `dc`), `start` included.
fn run_length(board: &Board, start: Coord, dr: isize, dc: isize) -> usize {
    let (row, col) = (start.row() as isize, start.col() as isize);
    let mut len = 0;
    while is_ship(board, row + dr * len as isize, col + dc * len as isize) {
        len += 1;
    }
    len
}

/// `true` when `board` holds exactly the required fleet, legally placed.
pub fn is_placement_legal(board: &Board) -> bool {
    check_placement(board).is_ok()
}

/// Like [`is_placement_legal`], reporting the first violation found.
pub fn check_placement(board: &Board) -> Result<(), PlacementError> {
    let mut remaining = FLEET;
    let mut visited = Visited::default();

    for start in board.ship_coords() {
        if visited.contains(start) {
            continue;
        }
        if remaining.iter().all(|(_, count)| *count == 0) {
            return Err(PlacementError::Surplus(start));
        }

        // Row-major scanning reaches a straight ship at its top/left end.
        let across = run_length(board, start, 0, 1);
        let down = run_length(board, start, 1, 0);
        if across > 1 && down > 1 {
            return Err(PlacementError::BentShip(start));
        }
        let (length, dr, dc) = if across >= down {
            (across, 0, 1)
        } else {
            (down, 1, 0)
        };

        let (row0, col0) = (start.row() as isize, start.col() as isize);
        let in_run = |row: isize, col: isize| {
            let k = if dr == 0 { col - col0 } else { row - row0 };
            (row - row0) == dr * k && (col - col0) == dc * k && (0..length as isize).contains(&k)
        };

        for k in 0..length as isize {
            let (row, col) = (row0 + dr * k, col0 + dc * k);
            for nr in row - 1..=row + 1 {
                for nc in col - 1..=col + 1 {
                    if is_ship(board, nr, nc) && !in_run(nr, nc) {
                        // A joint that continues sideways bends the ship,
                        // anything else is a separate ship touching it.
                        return Err(if nr == row || nc == col {
                            PlacementError::BentShip(start)
                        } else {
                            PlacementError::Touching(start)
                        });
                    }
                }
            }
            if let Ok(coord) = Coord::new(row as usize, col as usize) {
                visited.insert(coord);
            }
        }

        match remaining.iter_mut().find(|(len, _)| *len == length) {
            Some((_, count)) if *count > 0 => *count -= 1,
            _ => return Err(PlacementError::UnexpectedLength { at: start, length }),
        }
    }

    if remaining.iter().all(|(_, count)| *count == 0) {
        Ok(())
    } else {
        Err(PlacementError::Incomplete)
    }
}

/// A cell may be targeted unless it has already been resolved.
pub fn is_targetable(board: &Board, coord: Coord) -> bool {
    matches!(board.get(coord), Cell::Empty | Cell::Ship)
}

/// Build a random legal fleet placement.
pub fn random_fleet<R: Rng>(rng: &mut R) -> Result<Board, BoardError> {
    'restart: for _ in 0..100 {
        let mut board = Board::new();
        for length in (1..=MAX_SHIP_LENGTH).rev() {
            for _ in 0..fleet_count(length).unwrap_or(0) {
                if !place_random_ship(rng, &mut board, length) {
                    continue 'restart;
                }
            }
        }
        return Ok(board);
    }
    Err(BoardError::UnableToPlaceFleet)
}

fn place_random_ship<R: Rng>(rng: &mut R, board: &mut Board, length: usize) -> bool {
    for _ in 0..200 {
        let horizontal: bool = rng.random();
        let (max_r, max_c) = if horizontal {
            (BOARD_SIZE - 1, BOARD_SIZE - length)
        } else {
            (BOARD_SIZE - length, BOARD_SIZE - 1)
        };
        let row = rng.random_range(0..=max_r);
        let col = rng.random_range(0..=max_c);
        let (dr, dc) = if horizontal { (0, 1) } else { (1, 0) };

        let fits = (0..length).all(|k| {
            let (r, c) = ((row + dr * k) as isize, (col + dc * k) as isize);
            (r - 1..=r + 1).all(|nr| (c - 1..=c + 1).all(|nc| !is_ship(board, nr, nc)))
        });
        if !fits {
            continue;
        }
        for k in 0..length {
            if let Ok(coord) = Coord::new(row + dr * k, col + dc * k) {
                board.set(coord, Cell::Ship);
            }
        }
        return true;
    }
    false
}
