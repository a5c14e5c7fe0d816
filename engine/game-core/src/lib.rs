//! Core game-state contract consumed by the MCTS search engine.
//!
//! The engine is game-agnostic: it only sees a state through the
//! [`GameState`] trait, which supplies legal moves, move application,
//! terminality and the exact terminal outcome. States are treated as
//! immutable values; applying a move always produces a fresh successor.
//!
//! Games implementing this trait must be two-player, zero-sum,
//! perfect-information and alternating-move. Values use the [-1, 1]
//! convention throughout: +1 is a win, -1 a loss and 0 a draw for the
//! perspective player.

use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// One of the two players in an alternating-move game.
///
/// `One` always moves first from the initial position. Concrete games map
/// their own marker names onto these (tic-tac-toe maps X to `One`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    One,
    Two,
}

impl Player {
    /// The other player.
    #[inline]
    pub fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }
}

/// Errors surfaced by the rules layer when a move cannot be applied.
///
/// The search engine never expects to see these during normal operation:
/// it only applies moves taken from `legal_moves`, so any `RulesError`
/// reaching it signals a defect in the game implementation and is treated
/// as fatal rather than recoverable.
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("Illegal move: {0}")]
    IllegalMove(String),

    #[error("Cannot apply a move to a terminal state")]
    GameOver,
}

/// Contract between a concrete game and the search engine.
///
/// Implementations are value types: cheap to clone, comparable and
/// hashable so positions reached through different move orders can be
/// recognized as the same.
///
/// # Invariants
///
/// * `legal_moves` is empty iff the state is terminal.
/// * `apply` with any move from `legal_moves` succeeds and yields a
///   well-defined successor with the turn passed to the opponent.
/// * `outcome` is `Some` exactly when `is_terminal` is true.
pub trait GameState: Clone + PartialEq + Eq + Hash + Debug + Send + Sync + 'static {
    /// Move type. Small and copyable; a board index for most grid games.
    type Move: Copy + PartialEq + Eq + Hash + Debug + Send + Sync + 'static;

    /// Enumerate the legal moves from this state.
    fn legal_moves(&self) -> Vec<Self::Move>;

    /// Apply a move, producing the successor state.
    fn apply(&self, mv: Self::Move) -> Result<Self, RulesError>;

    /// Whether the game is over at this state.
    fn is_terminal(&self) -> bool;

    /// The player about to move. For terminal states this is the player
    /// who would have moved next had the game continued.
    fn to_move(&self) -> Player;

    /// Exact outcome for `perspective`, defined only at terminal states:
    /// +1.0 win, -1.0 loss, 0.0 draw. `None` for non-terminal states.
    fn outcome(&self, perspective: Player) -> Option<f32>;

    /// Canonical cache key for this position.
    ///
    /// Two states reached through different move orders must map to the
    /// same key iff they are equal. The key includes the side to move.
    /// Board symmetries are deliberately not folded together.
    fn canonical_key(&self) -> String;
}
