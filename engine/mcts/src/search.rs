//! MCTS search implementation.
//!
//! Implements the core MCTS loop:
//! 1. Selection: traverse the tree using UCB1 to find a frontier node
//! 2. Expansion: add exactly one child for an untried move
//! 3. Evaluation: get a value estimate from the evaluator
//! 4. Backpropagation: update statistics along the path

use std::time::{Duration, Instant};

use game_core::GameState;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::MctsConfig;
use crate::evaluator::{Evaluator, EvaluatorError};
use crate::tree::{InvariantError, MctsTree};

/// Errors that can occur during MCTS search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("tree invariant violated: {0}")]
    Invariant(#[from] InvariantError),

    #[error("evaluator error: {0}")]
    Evaluator(#[from] EvaluatorError),

    #[error("root position has no legal moves")]
    NoLegalMoves,
}

/// Per-move statistics at the root after a search.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveStats<M> {
    pub mv: M,

    /// Visits through this child. Zero for moves never expanded.
    pub visits: u32,

    /// Mean value from the root player's perspective.
    pub value: f32,
}

/// Result of an MCTS search.
#[derive(Debug, Clone)]
pub struct SearchResult<M> {
    /// Recommended move. `None` when the budget allowed no iterations, so
    /// no statistics exist to pick from.
    pub best: Option<M>,

    /// Statistics for every legal root move.
    pub move_stats: Vec<MoveStats<M>>,

    /// Iterations actually run.
    pub iterations: u32,

    pub elapsed: Duration,
}

/// MCTS search over a single root position.
///
/// Owns the tree and the RNG; borrows the evaluator so one evaluator (and
/// its cache) can serve many searches.
pub struct MctsSearch<'a, S: GameState, E: Evaluator<S>> {
    tree: MctsTree<S>,
    evaluator: &'a E,
    config: MctsConfig,
    rng: ChaCha20Rng,
}

impl<'a, S: GameState, E: Evaluator<S>> MctsSearch<'a, S, E> {
    pub fn new(root: S, evaluator: &'a E, config: MctsConfig) -> Self {
        let rng = ChaCha20Rng::seed_from_u64(config.seed);
        Self {
            tree: MctsTree::rooted_at(root),
            evaluator,
            config,
            rng,
        }
    }

    /// Run the search to its budget and return the recommendation.
    pub fn run(&mut self) -> Result<SearchResult<S::Move>, SearchError> {
        let root_state = &self.tree.get(self.tree.root()).state;
        if !root_state.is_terminal() && root_state.legal_moves().is_empty() {
            return Err(SearchError::NoLegalMoves);
        }

        let start = Instant::now();
        let mut iterations = 0u32;

        // Budget is only consulted here, between iterations; an iteration
        // in flight always completes.
        while self.config.budget.allows(iterations, start.elapsed()) {
            self.simulate()?;
            iterations += 1;
        }

        let best = self.tree.best_move(&mut self.rng).map(|(mv, _)| mv);
        let move_stats = self.root_move_stats();
        let elapsed = start.elapsed();

        let stats = self.tree.stats();
        debug!(
            iterations,
            nodes = stats.total_nodes,
            max_depth = stats.max_depth,
            root_value = stats.root_value,
            ?elapsed,
            "search finished"
        );

        Ok(SearchResult {
            best,
            move_stats,
            iterations,
            elapsed,
        })
    }

    /// One iteration: select, expand one node, evaluate, backpropagate.
    fn simulate(&mut self) -> Result<(), SearchError> {
        let mut node_id = self.tree.root();

        // Selection: descend while the node is fully expanded and has
        // somewhere to go
        loop {
            let node = self.tree.get(node_id);
            if node.is_terminal || !node.is_fully_expanded() || node.children.is_empty() {
                break;
            }
            match self
                .tree
                .select_child(node_id, self.config.exploration, &mut self.rng)
            {
                Some(child_id) => node_id = child_id,
                None => break,
            }
        }

        // Expansion: one untried move, picked uniformly at random
        let node = self.tree.get(node_id);
        if !node.is_terminal && !node.untried.is_empty() {
            let mv = node.untried[self.rng.gen_range(0..node.untried.len())];
            node_id = self.tree.expand(node_id, mv)?;
        }

        // Evaluation: exact outcome at terminals, evaluator elsewhere
        let node = self.tree.get(node_id);
        let value = if node.is_terminal {
            node.terminal_value
        } else {
            self.evaluator.evaluate(&node.state, node.state.to_move())?
        };
        trace!(node = node_id.0, value, "evaluated leaf");

        self.tree.backpropagate(node_id, value);
        Ok(())
    }

    fn root_move_stats(&self) -> Vec<MoveStats<S::Move>> {
        let root = self.tree.get(self.tree.root());
        let mut stats: Vec<MoveStats<S::Move>> = root
            .children
            .iter()
            .map(|&(mv, child_id)| {
                let child = self.tree.get(child_id);
                MoveStats {
                    mv,
                    visits: child.visit_count,
                    value: -child.mean_value(),
                }
            })
            .collect();

        // Unexpanded moves still show up, with empty statistics
        for &mv in &root.untried {
            stats.push(MoveStats {
                mv,
                visits: 0,
                value: 0.0,
            });
        }

        stats.sort_by(|a, b| b.visits.cmp(&a.visits));
        stats
    }

    /// The tree built so far, for diagnostics.
    pub fn tree(&self) -> &MctsTree<S> {
        &self.tree
    }
}

/// Run a full search over `root` and return the recommendation.
pub fn run_mcts<S: GameState, E: Evaluator<S>>(
    root: S,
    evaluator: &E,
    config: MctsConfig,
) -> Result<SearchResult<S::Move>, SearchError> {
    MctsSearch::new(root, evaluator, config).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchBudget;
    use crate::evaluator::RolloutEvaluator;
    use game_core::Player;
    use games_tictactoe::TicTacToe;

    fn config(iterations: u32) -> MctsConfig {
        MctsConfig::for_testing().with_iterations(iterations)
    }

    #[test]
    fn test_zero_budget_yields_no_recommendation() {
        let evaluator = RolloutEvaluator::new(0);
        let result = run_mcts(TicTacToe::new(), &evaluator, config(0)).unwrap();

        assert_eq!(result.best, None);
        assert_eq!(result.iterations, 0);
        assert!(result.move_stats.iter().all(|s| s.visits == 0));
    }

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let run = || {
            let evaluator = RolloutEvaluator::new(9);
            run_mcts(TicTacToe::new(), &evaluator, config(200).with_seed(7)).unwrap()
        };

        let a = run();
        let b = run();

        assert_eq!(a.best, b.best);
        assert_eq!(a.iterations, b.iterations);
        assert_eq!(a.move_stats, b.move_stats);
    }

    #[test]
    fn test_visit_counts_sum_to_iterations() {
        let evaluator = RolloutEvaluator::new(3);
        let mut search = MctsSearch::new(TicTacToe::new(), &evaluator, config(100));
        let result = search.run().unwrap();

        let root = search.tree().get(search.tree().root());
        assert_eq!(root.visit_count, result.iterations);

        // Each iteration visits at most one root child
        let child_visits: u32 = result.move_stats.iter().map(|s| s.visits).sum();
        assert!(child_visits <= root.visit_count);
    }

    #[test]
    fn test_finds_winning_move() {
        // X to move completes the top row at cell 2
        let state = TicTacToe::from_marks("XX. OO. ...", Player::One).unwrap();
        let evaluator = RolloutEvaluator::new(1);

        let result = run_mcts(state, &evaluator, config(100)).unwrap();
        assert_eq!(result.best, Some(2));
    }

    #[test]
    fn test_blocks_opponent_win() {
        // O to move; X threatens cell 2 for the top row
        let state = TicTacToe::from_marks("XX. O.. .O.", Player::Two).unwrap();
        let evaluator = RolloutEvaluator::new(1);

        let result = run_mcts(state, &evaluator, config(2_000)).unwrap();
        assert_eq!(result.best, Some(2));
    }

    #[test]
    fn test_single_legal_move() {
        let state = TicTacToe::from_marks("XOX XOO OX.", Player::One).unwrap();
        let evaluator = RolloutEvaluator::new(0);

        let result = run_mcts(state, &evaluator, config(10)).unwrap();
        assert_eq!(result.best, Some(8));
        assert_eq!(result.move_stats.len(), 1);
    }

    #[test]
    fn test_opening_move_avoids_immediate_blunder() {
        let evaluator = RolloutEvaluator::new(5);
        let result = run_mcts(TicTacToe::new(), &evaluator, config(500)).unwrap();

        let mv = result.best.expect("a recommendation must exist");
        let after = TicTacToe::new().apply(mv).unwrap();

        // No reply may give O a forced win in one more O move; from an
        // empty board no such reply exists for any X opening, so this
        // checks the bookkeeping rather than the move's strength
        for reply in after.legal_moves() {
            let after_reply = after.apply(reply).unwrap();
            assert_ne!(after_reply.outcome(Player::Two), Some(1.0));
        }
    }

    #[test]
    fn test_time_budget_terminates() {
        let evaluator = RolloutEvaluator::new(0);
        let cfg = MctsConfig::for_testing()
            .with_budget(SearchBudget::Time(Duration::from_millis(20)))
            .with_seed(1);

        let result = run_mcts(TicTacToe::new(), &evaluator, cfg).unwrap();
        assert!(result.iterations > 0);
        assert!(result.best.is_some());
    }

    #[test]
    fn test_terminal_root_is_searchable() {
        // Searching a finished game is legal; iterations just re-sample the
        // terminal outcome and no children exist
        let state = TicTacToe::from_marks("XXX OO. ...", Player::Two).unwrap();
        let evaluator = RolloutEvaluator::new(0);

        let result = run_mcts(state, &evaluator, config(10)).unwrap();
        assert_eq!(result.best, None);
        assert_eq!(result.iterations, 10);
    }

    #[test]
    fn test_move_stats_cover_all_legal_moves() {
        let evaluator = RolloutEvaluator::new(2);
        let result = run_mcts(TicTacToe::new(), &evaluator, config(30)).unwrap();

        let mut moves: Vec<u8> = result.move_stats.iter().map(|s| s.mv).collect();
        moves.sort_unstable();
        assert_eq!(moves, TicTacToe::new().legal_moves());
    }
}
