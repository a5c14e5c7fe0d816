//! Tic-tac-toe implementation of the `game-core` state contract.
//!
//! This crate provides the reference game used by the search engine's test
//! scenarios and benchmarks. `Player::One` plays X and moves first.
//!
//! # Usage
//!
//! ```rust
//! use game_core::{GameState, Player};
//! use games_tictactoe::TicTacToe;
//!
//! let state = TicTacToe::new();
//! assert_eq!(state.legal_moves().len(), 9);
//! assert_eq!(state.to_move(), Player::One);
//! ```

use game_core::{GameState, Player, RulesError};

/// Cell values: 0 = empty, 1 = X, 2 = O.
const EMPTY: u8 = 0;

/// Winning positions (rows, columns, diagonals).
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8], // rows
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8], // columns
    [0, 4, 8],
    [2, 4, 6], // diagonals
];

fn mark_of(player: Player) -> u8 {
    match player {
        Player::One => 1,
        Player::Two => 2,
    }
}

fn mark_char(cell: u8) -> char {
    match cell {
        1 => 'X',
        2 => 'O',
        _ => '.',
    }
}

/// Tic-tac-toe game state.
///
/// An immutable snapshot of the board plus the player to move. Cells are
/// indexed 0-8, row-major from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TicTacToe {
    /// Board representation: 0=empty, 1=X, 2=O
    board: [u8; 9],
    /// Player about to move
    to_move: Player,
}

impl TicTacToe {
    /// Create the initial empty-board state. X moves first.
    pub fn new() -> Self {
        Self {
            board: [EMPTY; 9],
            to_move: Player::One,
        }
    }

    /// Parse a board from nine mark characters.
    ///
    /// `marks` must contain exactly nine of `X`, `O` and `.`; whitespace
    /// is ignored, so `"XX. OO. ..."` and `"XX.OO...."` are equivalent.
    /// `to_move` is taken as given rather than inferred from the counts,
    /// so test positions with either side to move can be expressed.
    pub fn from_marks(marks: &str, to_move: Player) -> Result<Self, RulesError> {
        let cells: Vec<u8> = marks
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| match c {
                'X' => Ok(1),
                'O' => Ok(2),
                '.' => Ok(EMPTY),
                other => Err(RulesError::IllegalMove(format!(
                    "unexpected board character '{other}'"
                ))),
            })
            .collect::<Result<_, _>>()?;

        if cells.len() != 9 {
            return Err(RulesError::IllegalMove(format!(
                "board must have exactly 9 cells, got {}",
                cells.len()
            )));
        }

        let mut board = [EMPTY; 9];
        board.copy_from_slice(&cells);
        Ok(Self { board, to_move })
    }

    /// Render the board as three lines of space-separated marks.
    pub fn render(&self) -> String {
        (0..3)
            .map(|row| {
                let start = row * 3;
                self.board[start..start + 3]
                    .iter()
                    .map(|&c| mark_char(c).to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The winning player, if either side has completed a line.
    fn winner(&self) -> Option<Player> {
        for line in &LINES {
            let [a, b, c] = *line;
            if self.board[a] != EMPTY
                && self.board[a] == self.board[b]
                && self.board[b] == self.board[c]
            {
                return Some(match self.board[a] {
                    1 => Player::One,
                    _ => Player::Two,
                });
            }
        }
        None
    }

    fn board_full(&self) -> bool {
        self.board.iter().all(|&cell| cell != EMPTY)
    }
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState for TicTacToe {
    type Move = u8;

    fn legal_moves(&self) -> Vec<u8> {
        if self.is_terminal() {
            return Vec::new();
        }

        (0..9u8)
            .filter(|&pos| self.board[pos as usize] == EMPTY)
            .collect()
    }

    fn apply(&self, mv: u8) -> Result<Self, RulesError> {
        if self.is_terminal() {
            return Err(RulesError::GameOver);
        }
        if mv >= 9 {
            return Err(RulesError::IllegalMove(format!(
                "cell index {mv} out of range"
            )));
        }
        if self.board[mv as usize] != EMPTY {
            return Err(RulesError::IllegalMove(format!(
                "cell {mv} is already occupied"
            )));
        }

        let mut next = *self;
        next.board[mv as usize] = mark_of(self.to_move);
        next.to_move = self.to_move.opponent();
        Ok(next)
    }

    fn is_terminal(&self) -> bool {
        self.winner().is_some() || self.board_full()
    }

    fn to_move(&self) -> Player {
        self.to_move
    }

    fn outcome(&self, perspective: Player) -> Option<f32> {
        match self.winner() {
            Some(who) if who == perspective => Some(1.0),
            Some(_) => Some(-1.0),
            None if self.board_full() => Some(0.0),
            None => None,
        }
    }

    fn canonical_key(&self) -> String {
        let mut key = String::with_capacity(11);
        for &cell in &self.board {
            key.push(mark_char(cell));
        }
        key.push(':');
        key.push(match self.to_move {
            Player::One => 'X',
            Player::Two => 'O',
        });
        key
    }
}
