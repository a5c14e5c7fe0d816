//! MCTS configuration parameters.

use std::time::Duration;

/// Termination condition for a search run.
///
/// The budget is checked at iteration boundaries only, never in the middle
/// of a simulation, so an expiring time budget always leaves the tree with
/// fully backpropagated statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchBudget {
    /// Run exactly this many simulations. Zero is legal and produces a
    /// recommendation from the root's existing statistics only.
    Iterations(u32),

    /// Run until this much wall-clock time has elapsed.
    Time(Duration),
}

impl SearchBudget {
    /// Whether another simulation may start given the work done so far.
    pub fn allows(&self, completed: u32, elapsed: Duration) -> bool {
        match *self {
            SearchBudget::Iterations(limit) => completed < limit,
            SearchBudget::Time(limit) => elapsed < limit,
        }
    }
}

/// Configuration for Monte Carlo Tree Search.
#[derive(Debug, Clone)]
pub struct MctsConfig {
    /// Iteration or wall-clock budget per search.
    pub budget: SearchBudget,

    /// Exploration constant C in the UCB1 formula.
    /// Higher values encourage exploration, lower values favor exploitation.
    /// The classic UCT choice is sqrt(2).
    pub exploration: f32,

    /// Seed for the search RNG (expansion order and tie-breaking).
    /// Identical seeds with identical inputs reproduce identical results.
    pub seed: u64,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            budget: SearchBudget::Iterations(800),
            exploration: std::f32::consts::SQRT_2,
            seed: 0,
        }
    }
}

impl MctsConfig {
    /// Create a fast config for testing.
    pub fn for_testing() -> Self {
        Self {
            budget: SearchBudget::Iterations(50),
            exploration: std::f32::consts::SQRT_2,
            seed: 42,
        }
    }

    /// Builder pattern: set the budget directly.
    pub fn with_budget(mut self, budget: SearchBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Builder pattern: set an iteration budget.
    pub fn with_iterations(mut self, n: u32) -> Self {
        self.budget = SearchBudget::Iterations(n);
        self
    }

    /// Builder pattern: set a wall-clock budget.
    pub fn with_time_budget(mut self, limit: Duration) -> Self {
        self.budget = SearchBudget::Time(limit);
        self
    }

    /// Builder pattern: set the exploration constant.
    pub fn with_exploration(mut self, c: f32) -> Self {
        self.exploration = c;
        self
    }

    /// Builder pattern: set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MctsConfig::default();
        assert_eq!(config.budget, SearchBudget::Iterations(800));
        assert!((config.exploration - std::f32::consts::SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_builder_pattern() {
        let config = MctsConfig::default()
            .with_iterations(100)
            .with_exploration(1.0)
            .with_seed(7);

        assert_eq!(config.budget, SearchBudget::Iterations(100));
        assert!((config.exploration - 1.0).abs() < 1e-6);
        assert_eq!(config.seed, 7);
    }

    #[test]
    fn test_iteration_budget_allows() {
        let budget = SearchBudget::Iterations(3);
        assert!(budget.allows(0, Duration::ZERO));
        assert!(budget.allows(2, Duration::from_secs(3600)));
        assert!(!budget.allows(3, Duration::ZERO));
    }

    #[test]
    fn test_zero_iteration_budget_allows_nothing() {
        let budget = SearchBudget::Iterations(0);
        assert!(!budget.allows(0, Duration::ZERO));
    }

    #[test]
    fn test_time_budget_allows() {
        let budget = SearchBudget::Time(Duration::from_millis(10));
        assert!(budget.allows(1000, Duration::from_millis(9)));
        assert!(!budget.allows(0, Duration::from_millis(10)));
    }
}
