//! Monte Carlo Tree Search (MCTS) for turn-based move selection.
//!
//! This crate provides a game-agnostic MCTS engine that works with any
//! game implementing the `game-core` GameState trait.
//!
//! # Overview
//!
//! MCTS builds a search tree by running simulations. Each simulation
//! consists of four phases:
//!
//! 1. **Selection**: Traverse the tree using UCB1 (Upper Confidence Bound)
//!    to balance exploration and exploitation
//! 2. **Expansion**: Add exactly one child to the frontier node for one of
//!    its untried moves
//! 3. **Evaluation**: Estimate the value of the new state with a pluggable
//!    evaluator (random rollouts, or an external scorer with caching)
//! 4. **Backpropagation**: Update visit counts and value sums along the
//!    path from leaf to root, flipping the sign at each level
//!
//! Values live in [-1.0, 1.0] and are always stored for the side to move
//! at the node that holds them.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mcts::{run_mcts, MctsConfig, RolloutEvaluator};
//! use games_tictactoe::TicTacToe;
//!
//! let evaluator = RolloutEvaluator::new(42);
//! let config = MctsConfig::default().with_iterations(800).with_seed(42);
//!
//! let result = run_mcts(TicTacToe::new(), &evaluator, config).unwrap();
//! println!("Best move: {:?}", result.best);
//! ```
//!
//! # Configuration
//!
//! The [`MctsConfig`] struct controls search behavior:
//!
//! - `budget`: iterations or wall-clock time, checked between iterations
//! - `exploration`: UCB1 exploration constant (default: sqrt(2))
//! - `seed`: RNG seed for reproducible searches
//!
//! # Evaluators
//!
//! The search requires an [`Evaluator`] to estimate leaf values:
//!
//! - [`RolloutEvaluator`]: plays random games to a terminal state
//! - [`ScoredEvaluator`]: asks an external scorer through a [`ScoreClient`],
//!   memoizes answers in a persistent [`EvalCache`], and falls back to
//!   rollouts when the scorer fails

pub mod cache;
pub mod config;
pub mod evaluator;
pub mod node;
pub mod scorer;
pub mod search;
pub mod tree;

// Re-export main types
pub use cache::{CacheEntry, EvalCache};
pub use config::{MctsConfig, SearchBudget};
pub use evaluator::{Evaluator, EvaluatorError, RolloutEvaluator};
pub use node::{MctsNode, NodeId};
pub use scorer::{
    ScoreClient, ScoreError, ScoreReply, ScoreRequest, ScoredEvaluator, ScorerStats,
};
pub use search::{run_mcts, MctsSearch, MoveStats, SearchError, SearchResult};
pub use tree::{InvariantError, MctsTree, TreeStats};
