//! 10×10 board model shared by both player views.

use alloc::string::String;
use core::fmt;

use crate::config::{BOARD_CELLS, BOARD_SIZE};

/// State of a single board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    Ship,
    Hit,
    Miss,
    /// Opponent-targeted water the server declared resolved, e.g. the
    /// surroundings of a sunk ship.
    Invalidated,
}

impl Cell {
    /// Token used for this state inside `BOARD_STATE` messages.
    pub fn token(self) -> &'static str {
        match self {
            Cell::Empty => "NONE",
            Cell::Ship => "SHIP",
            Cell::Hit => "HIT",
            Cell::Miss => "MISS",
            Cell::Invalidated => "INVALIDATED",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "NONE" => Some(Cell::Empty),
            "SHIP" => Some(Cell::Ship),
            "HIT" => Some(Cell::Hit),
            "MISS" => Some(Cell::Miss),
            "INVALIDATED" => Some(Cell::Invalidated),
            _ => None,
        }
    }

    fn symbol(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Ship => 'S',
            Cell::Hit => 'X',
            Cell::Miss => 'o',
            Cell::Invalidated => '~',
        }
    }
}

/// Errors returned by board addressing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("cell ({row}, {col}) is outside the {size}x{size} board", size = BOARD_SIZE)]
    OutOfBounds { row: usize, col: usize },
    #[error("unable to place the fleet")]
    UnableToPlaceFleet,
}

/// A cell position, always inside the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    row: u8,
    col: u8,
}

impl Coord {
    pub fn new(row: usize, col: usize) -> Result<Self, BoardError> {
        if row >= BOARD_SIZE || col >= BOARD_SIZE {
            return Err(BoardError::OutOfBounds { row, col });
        }
        Ok(Self {
            row: row as u8,
            col: col as u8,
        })
    }

    /// Coordinate of the row-major `index`, if it lies on the board.
    pub fn from_index(index: usize) -> Option<Self> {
        if index >= BOARD_CELLS {
            return None;
        }
        Some(Self {
            row: (index / BOARD_SIZE) as u8,
            col: (index % BOARD_SIZE) as u8,
        })
    }

    /// Parse a wire cell code (`row digit` + `col digit`, e.g. `"23"`).
    ///
    /// A single digit is accepted as a row-0 code, matching the numeric
    /// reading of the field (`"7"` is row 0, column 7).
    pub fn from_code(code: &str) -> Option<Self> {
        if code.is_empty() || code.len() > 2 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value = code.bytes().fold(0usize, |acc, b| acc * 10 + (b - b'0') as usize);
        Self::from_index(value)
    }

    pub fn row(self) -> usize {
        self.row as usize
    }

    pub fn col(self) -> usize {
        self.col as usize
    }

    pub fn index(self) -> usize {
        self.row() * BOARD_SIZE + self.col()
    }

    /// Two-digit wire cell code.
    pub fn code(self) -> String {
        let mut code = String::with_capacity(2);
        code.push((b'0' + self.row) as char);
        code.push((b'0' + self.col) as char);
        code
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.col)
    }
}

/// Row-major 10×10 grid of cells.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    cells: [Cell; BOARD_CELLS],
}

impl Board {
    /// An all-water board.
    pub const fn new() -> Self {
        Self {
            cells: [Cell::Empty; BOARD_CELLS],
        }
    }

    pub fn from_cells(cells: [Cell; BOARD_CELLS]) -> Self {
        Self { cells }
    }

    /// Board with a ship segment on every given coordinate.
    pub fn from_ships<I: IntoIterator<Item = Coord>>(coords: I) -> Self {
        let mut board = Self::new();
        for coord in coords {
            board.set(coord, Cell::Ship);
        }
        board
    }

    pub fn get(&self, coord: Coord) -> Cell {
        self.cells[coord.index()]
    }

    /// Cell at signed (`row`, `col`); `None` off the board.
    pub fn at(&self, row: isize, col: isize) -> Option<Cell> {
        if row < 0 || col < 0 || row >= BOARD_SIZE as isize || col >= BOARD_SIZE as isize {
            return None;
        }
        Some(self.cells[row as usize * BOARD_SIZE + col as usize])
    }

    pub fn set(&mut self, coord: Coord, cell: Cell) {
        self.cells[coord.index()] = cell;
    }

    /// Flip a cell between water and ship while a fleet is being placed.
    pub fn toggle_ship(&mut self, coord: Coord) {
        let cell = &mut self.cells[coord.index()];
        *cell = match *cell {
            Cell::Ship => Cell::Empty,
            _ => Cell::Ship,
        };
    }

    /// Coordinates of every `SHIP` cell in row-major order.
    pub fn ship_coords(&self) -> impl Iterator<Item = Coord> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| **cell == Cell::Ship)
            .filter_map(|(i, _)| Coord::from_index(i))
    }

    pub fn count(&self, state: Cell) -> usize {
        self.cells.iter().filter(|cell| **cell == state).count()
    }

    pub fn clear(&mut self) {
        self.cells = [Cell::Empty; BOARD_CELLS];
    }

    /// Mirror across the main diagonal.
    pub fn transposed(&self) -> Self {
        self.remap(|row, col| (col, row))
    }

    /// Mirror left to right.
    pub fn mirrored(&self) -> Self {
        self.remap(|row, col| (row, BOARD_SIZE - 1 - col))
    }

    /// Rotate a quarter turn clockwise.
    pub fn rotated(&self) -> Self {
        self.remap(|row, col| (col, BOARD_SIZE - 1 - row))
    }

    fn remap(&self, to: impl Fn(usize, usize) -> (usize, usize)) -> Self {
        let mut out = Self::new();
        for (i, cell) in self.cells.iter().enumerate() {
            let (row, col) = to(i / BOARD_SIZE, i % BOARD_SIZE);
            out.cells[row * BOARD_SIZE + col] = *cell;
        }
        out
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  ")?;
        for col in 0..BOARD_SIZE {
            write!(f, " {}", col)?;
        }
        writeln!(f)?;
        for row in 0..BOARD_SIZE {
            write!(f, "{:2}", row)?;
            for col in 0..BOARD_SIZE {
                write!(f, " {}", self.cells[row * BOARD_SIZE + col].symbol())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Board {{")?;
        fmt::Display::fmt(self, f)?;
        write!(f, "}}")
    }
}
