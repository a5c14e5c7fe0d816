//! Evaluator trait for leaf position evaluation.
//!
//! The evaluator estimates the value of a game state for a given
//! perspective. The default implementation plays random rollouts to a
//! terminal state; `ScoredEvaluator` wraps an external scoring service
//! with a persistent cache and falls back to rollouts on failure.

use std::sync::Mutex;

use game_core::{GameState, Player};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use thiserror::Error;

/// Errors that can occur during evaluation.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("rollout exceeded {max_depth} plies without reaching a terminal state")]
    RolloutDepthExceeded { max_depth: u32 },
}

/// Trait for leaf evaluators.
///
/// Implementations estimate the value of `state` for `perspective` in
/// `[-1.0, 1.0]`, where +1.0 is a certain win for that player. Evaluators
/// are shared across the search by reference, so implementations keep any
/// mutable state (RNGs, counters) behind interior mutability.
pub trait Evaluator<S: GameState>: Send + Sync {
    fn evaluate(&self, state: &S, perspective: Player) -> Result<f32, EvaluatorError>;
}

/// Evaluator that plays uniformly random moves to a terminal state.
///
/// The resulting outcome is exact for the terminal position reached, which
/// makes the estimate noisy but unbiased. A fixed seed makes the whole
/// sequence of rollouts reproducible.
pub struct RolloutEvaluator {
    rng: Mutex<ChaCha20Rng>,
    max_depth: u32,
}

impl RolloutEvaluator {
    /// Rollout length guard. No square game this engine targets comes close,
    /// so hitting it means the game's terminal detection is broken.
    pub const DEFAULT_MAX_DEPTH: u32 = 1_000;

    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(ChaCha20Rng::seed_from_u64(seed)),
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl<S: GameState> Evaluator<S> for RolloutEvaluator {
    fn evaluate(&self, state: &S, perspective: Player) -> Result<f32, EvaluatorError> {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let mut current = state.clone();
        let mut depth = 0u32;

        while !current.is_terminal() {
            if depth >= self.max_depth {
                return Err(EvaluatorError::RolloutDepthExceeded {
                    max_depth: self.max_depth,
                });
            }

            let moves = current.legal_moves();
            let mv = moves[rng.gen_range(0..moves.len())];
            current = current
                .apply(mv)
                .map_err(|e| EvaluatorError::EvaluationFailed(e.to_string()))?;
            depth += 1;
        }

        Ok(current.outcome(perspective).unwrap_or(0.0))
    }
}
