//! MCTS tree structure with arena allocation.
//!
//! The tree uses arena allocation for efficient node storage and
//! cache-friendly traversal. Nodes are stored in a contiguous Vec and
//! referenced by NodeId indices; parent links are plain indices walked
//! only during backpropagation.

use game_core::{GameState, RulesError};
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use thiserror::Error;

use crate::node::{MctsNode, NodeId};

/// Violations of the tree's internal invariants.
///
/// Any of these indicates a defect in the engine or in the game's move
/// enumeration, not a recoverable runtime condition. The search driver
/// aborts the run rather than continuing with corrupted statistics.
#[derive(Debug, Error)]
pub enum InvariantError {
    #[error("cannot expand terminal node {node}")]
    ExpandTerminal { node: u32 },

    #[error("move {mv} is not in the untried set of node {node}")]
    MoveNotUntried { mv: String, node: u32 },

    #[error("move enumeration defect at node {node}: {source}")]
    IllegalMove {
        node: u32,
        #[source]
        source: RulesError,
    },
}

/// MCTS tree with arena-based node storage.
#[derive(Debug)]
pub struct MctsTree<S: GameState> {
    /// Arena storing all nodes
    nodes: Vec<MctsNode<S>>,

    /// Root node index (always 0 after initialization)
    root: NodeId,
}

impl<S: GameState> MctsTree<S> {
    /// Create a fresh tree rooted at `state` with zero visits.
    ///
    /// A previous tree is never reused; every search starts from an empty
    /// root and rebuilds its statistics.
    pub fn rooted_at(state: S) -> Self {
        Self {
            nodes: vec![MctsNode::new_root(state)],
            root: NodeId(0),
        }
    }

    /// Get the root node ID.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a reference to a node by ID.
    #[inline]
    pub fn get(&self, id: NodeId) -> &MctsNode<S> {
        &self.nodes[id.0 as usize]
    }

    /// Get a mutable reference to a node by ID.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut MctsNode<S> {
        &mut self.nodes[id.0 as usize]
    }

    /// Get the total number of nodes in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty (never true after construction).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn allocate(&mut self, node: MctsNode<S>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Expand one child of `parent_id` by playing `mv`.
    ///
    /// `mv` must be in the parent's untried set and the parent must not be
    /// terminal. On success the move transfers from `untried` to
    /// `children`, preserving the partition of the parent's legal moves,
    /// and the new child's ID is returned.
    pub fn expand(&mut self, parent_id: NodeId, mv: S::Move) -> Result<NodeId, InvariantError> {
        let parent = self.get(parent_id);

        if parent.is_terminal {
            return Err(InvariantError::ExpandTerminal { node: parent_id.0 });
        }

        let untried_idx = parent.untried.iter().position(|&m| m == mv).ok_or_else(|| {
            InvariantError::MoveNotUntried {
                mv: format!("{mv:?}"),
                node: parent_id.0,
            }
        })?;

        let child_state = parent
            .state
            .apply(mv)
            .map_err(|source| InvariantError::IllegalMove {
                node: parent_id.0,
                source,
            })?;

        let child_id = self.allocate(MctsNode::new_child(parent_id, mv, child_state));

        let parent = self.get_mut(parent_id);
        // `remove` keeps the remaining untried moves in enumeration order
        let _ = parent.untried.remove(untried_idx);
        parent.children.push((mv, child_id));

        Ok(child_id)
    }

    /// Select the best expanded child of a node using UCB1.
    ///
    /// Unvisited children score infinity and therefore always win over
    /// visited siblings. Ties are broken uniformly with the caller's seeded
    /// RNG, so selection is deterministic for a fixed seed.
    pub fn select_child(
        &self,
        node_id: NodeId,
        exploration: f32,
        rng: &mut ChaCha20Rng,
    ) -> Option<NodeId> {
        let node = self.get(node_id);
        if node.children.is_empty() {
            return None;
        }

        // Pre-compute ln(N_parent) once instead of per-child
        let ln_parent = (node.visit_count.max(1) as f32).ln();

        let mut best_score = f32::NEG_INFINITY;
        let mut best: Vec<NodeId> = Vec::new();

        for &(_, child_id) in &node.children {
            let score = self.get(child_id).ucb1(ln_parent, exploration);
            if score > best_score {
                best_score = score;
                best.clear();
                best.push(child_id);
            } else if score == best_score {
                best.push(child_id);
            }
        }

        Some(best[rng.gen_range(0..best.len())])
    }

    /// Backpropagate a value from a leaf to the root.
    ///
    /// Every node on the path gets one visit and the signed value for its
    /// own perspective; the sign flips at each step up because a position
    /// favorable to the side to move at the child is unfavorable to the
    /// side to move at the parent.
    pub fn backpropagate(&mut self, leaf_id: NodeId, value: f32) {
        let mut current_id = leaf_id;
        let mut current_value = value;

        while current_id.is_some() {
            let node = self.get_mut(current_id);
            node.visit_count += 1;
            node.value_sum += current_value;

            current_value = -current_value;
            current_id = node.parent;
        }
    }

    /// Pick the recommended move at the root: the "robust child" with the
    /// highest visit count, ties broken by highest mean value from the
    /// root player's perspective, remaining ties by the seeded RNG.
    ///
    /// Returns None when the root has no expanded children (for example
    /// after a zero-iteration budget).
    pub fn best_move(&self, rng: &mut ChaCha20Rng) -> Option<(S::Move, NodeId)> {
        let root = self.get(self.root);
        if root.children.is_empty() {
            return None;
        }

        let mut best_visits = 0u32;
        let mut best_value = f32::NEG_INFINITY;
        let mut best: Vec<(S::Move, NodeId)> = Vec::new();

        for &(mv, child_id) in &root.children {
            let child = self.get(child_id);
            let visits = child.visit_count;
            // Child statistics are the opponent's; negate for the root player
            let value = -child.mean_value();

            if best.is_empty()
                || visits > best_visits
                || (visits == best_visits && value > best_value)
            {
                best_visits = visits;
                best_value = value;
                best.clear();
                best.push((mv, child_id));
            } else if visits == best_visits && value == best_value {
                best.push((mv, child_id));
            }
        }

        Some(best[rng.gen_range(0..best.len())])
    }

    /// Get statistics about the tree for diagnostics.
    pub fn stats(&self) -> TreeStats {
        let root = self.get(self.root);
        TreeStats {
            total_nodes: self.nodes.len(),
            root_visits: root.visit_count,
            root_value: root.mean_value(),
            max_depth: self.compute_max_depth(self.root, 0),
        }
    }

    fn compute_max_depth(&self, node_id: NodeId, current_depth: u32) -> u32 {
        let node = self.get(node_id);
        if node.children.is_empty() {
            return current_depth;
        }

        node.children
            .iter()
            .map(|&(_, id)| self.compute_max_depth(id, current_depth + 1))
            .max()
            .unwrap_or(current_depth)
    }
}

/// Statistics about an MCTS tree.
#[derive(Debug, Clone)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub root_visits: u32,
    pub root_value: f32,
    pub max_depth: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::Player;
    use games_tictactoe::TicTacToe;
    use rand::SeedableRng;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(42)
    }

    #[test]
    fn test_rooted_at() {
        let tree = MctsTree::rooted_at(TicTacToe::new());

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root(), NodeId(0));

        let root = tree.get(tree.root());
        assert!(root.parent.is_none());
        assert_eq!(root.visit_count, 0);
        assert_eq!(root.untried.len(), 9);
    }

    #[test]
    fn test_expand_moves_partition() {
        let mut tree = MctsTree::rooted_at(TicTacToe::new());

        let child_id = tree.expand(tree.root(), 4).unwrap();

        assert_eq!(tree.len(), 2);
        assert_eq!(child_id, NodeId(1));

        let root = tree.get(tree.root());
        assert_eq!(root.untried.len(), 8);
        assert!(!root.untried.contains(&4));
        assert_eq!(root.children, vec![(4, NodeId(1))]);

        // untried + children still cover exactly the legal moves
        let mut covered: Vec<u8> = root.untried.clone();
        covered.extend(root.children.iter().map(|&(mv, _)| mv));
        covered.sort_unstable();
        assert_eq!(covered, root.state.legal_moves());

        let child = tree.get(child_id);
        assert_eq!(child.parent, tree.root());
        assert_eq!(child.mv, Some(4));
        assert_eq!(child.visit_count, 0);
        assert_eq!(child.state.to_move(), Player::Two);
    }

    #[test]
    fn test_expand_rejects_move_not_untried() {
        let mut tree = MctsTree::rooted_at(TicTacToe::new());
        tree.expand(tree.root(), 4).unwrap();

        // Expanding the same move twice violates the partition
        let result = tree.expand(tree.root(), 4);
        assert!(matches!(
            result,
            Err(InvariantError::MoveNotUntried { .. })
        ));
    }

    #[test]
    fn test_expand_rejects_terminal_node() {
        let state = TicTacToe::from_marks("XXX OO. ...", Player::Two).unwrap();
        let mut tree = MctsTree::rooted_at(state);

        let result = tree.expand(tree.root(), 5);
        assert!(matches!(result, Err(InvariantError::ExpandTerminal { .. })));
    }

    #[test]
    fn test_backpropagate_flips_sign_per_level() {
        let mut tree = MctsTree::rooted_at(TicTacToe::new());

        // Chain: root -> child -> grandchild
        let child_id = tree.expand(tree.root(), 0).unwrap();
        let grandchild_id = tree.expand(child_id, 1).unwrap();

        tree.backpropagate(grandchild_id, 1.0);

        assert_eq!(tree.get(grandchild_id).visit_count, 1);
        assert_eq!(tree.get(child_id).visit_count, 1);
        assert_eq!(tree.get(tree.root()).visit_count, 1);

        assert!((tree.get(grandchild_id).value_sum - 1.0).abs() < 1e-6);
        assert!((tree.get(child_id).value_sum - (-1.0)).abs() < 1e-6);
        assert!((tree.get(tree.root()).value_sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_select_child_prefers_unvisited() {
        let mut tree = MctsTree::rooted_at(TicTacToe::new());

        let a = tree.expand(tree.root(), 0).unwrap();
        let b = tree.expand(tree.root(), 1).unwrap();

        // Visit `a` with a good value; `b` stays unvisited
        tree.backpropagate(a, 1.0);

        let selected = tree
            .select_child(tree.root(), std::f32::consts::SQRT_2, &mut rng())
            .unwrap();
        assert_eq!(selected, b, "unvisited child must be selected first");
    }

    #[test]
    fn test_select_child_is_deterministic_for_fixed_seed() {
        let mut tree = MctsTree::rooted_at(TicTacToe::new());
        for mv in 0..4 {
            let id = tree.expand(tree.root(), mv).unwrap();
            tree.backpropagate(id, 0.0);
        }

        // All four children are tied; the seeded RNG must break the tie
        // the same way every time
        let picks: Vec<NodeId> = (0..10)
            .map(|_| {
                tree.select_child(tree.root(), std::f32::consts::SQRT_2, &mut rng())
                    .unwrap()
            })
            .collect();
        assert!(picks.iter().all(|&p| p == picks[0]));
    }

    #[test]
    fn test_best_move_is_robust_child() {
        let mut tree = MctsTree::rooted_at(TicTacToe::new());

        let a = tree.expand(tree.root(), 0).unwrap();
        let b = tree.expand(tree.root(), 1).unwrap();

        // `b` has more visits but a worse value; robust child wins on visits
        tree.get_mut(a).visit_count = 10;
        tree.get_mut(a).value_sum = -10.0; // great for the root (negated)
        tree.get_mut(b).visit_count = 30;
        tree.get_mut(b).value_sum = 0.0;

        let (mv, _) = tree.best_move(&mut rng()).unwrap();
        assert_eq!(mv, 1);
    }

    #[test]
    fn test_best_move_breaks_visit_ties_by_value() {
        let mut tree = MctsTree::rooted_at(TicTacToe::new());

        let a = tree.expand(tree.root(), 0).unwrap();
        let b = tree.expand(tree.root(), 1).unwrap();

        tree.get_mut(a).visit_count = 10;
        tree.get_mut(a).value_sum = 5.0; // +0.5 for the opponent
        tree.get_mut(b).visit_count = 10;
        tree.get_mut(b).value_sum = -5.0; // -0.5 for the opponent

        let (mv, _) = tree.best_move(&mut rng()).unwrap();
        assert_eq!(mv, 1, "equal visits should fall back to root-side value");
    }

    #[test]
    fn test_best_move_none_without_children() {
        let tree = MctsTree::rooted_at(TicTacToe::new());
        assert!(tree.best_move(&mut rng()).is_none());
    }

    #[test]
    fn test_tree_stats() {
        let mut tree = MctsTree::rooted_at(TicTacToe::new());
        let child = tree.expand(tree.root(), 0).unwrap();
        tree.expand(child, 1).unwrap();
        tree.backpropagate(child, 0.5);

        let stats = tree.stats();
        assert_eq!(stats.total_nodes, 3);
        assert_eq!(stats.max_depth, 2);
        assert_eq!(stats.root_visits, 1);
    }
}
