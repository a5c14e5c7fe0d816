//! MCTS tree node representation.
//!
//! Each node represents a game state reached by playing a move from the
//! parent. Nodes store the visit statistics used for UCB1 selection and
//! the final move recommendation.

use game_core::GameState;

/// Index into the node arena. Using a newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }
}

/// A node in the MCTS tree.
///
/// Statistics are always stored from the perspective of the player to move
/// at this node's state. A node with Q near +1 is a position the player
/// about to move there expects to win; its parent reads the same number
/// negated.
#[derive(Debug, Clone)]
pub struct MctsNode<S: GameState> {
    /// Parent node index (NONE for the root). A plain back-reference used
    /// only for the upward backpropagation walk; children are owned by the
    /// arena, so there is no ownership cycle.
    pub parent: NodeId,

    /// Move that led to this node from the parent (None for the root)
    pub mv: Option<S::Move>,

    /// Game state at this node
    pub state: S,

    /// Legal moves not yet expanded into children.
    /// `untried` and `children` together partition the state's legal moves.
    pub untried: Vec<S::Move>,

    /// Expanded children as (move, node) pairs
    pub children: Vec<(S::Move, NodeId)>,

    /// Number of times this node has been visited (N)
    pub visit_count: u32,

    /// Sum of values backpropagated through this node (W).
    /// Q = value_sum / visit_count
    pub value_sum: f32,

    /// Whether the state is terminal (game over)
    pub is_terminal: bool,

    /// Exact outcome for the side to move here (only valid if is_terminal)
    pub terminal_value: f32,
}

impl<S: GameState> MctsNode<S> {
    /// Create a new root node with zero visits.
    pub fn new_root(state: S) -> Self {
        Self::new(NodeId::NONE, None, state)
    }

    /// Create a new child node reached by `mv` from `parent`.
    pub fn new_child(parent: NodeId, mv: S::Move, state: S) -> Self {
        Self::new(parent, Some(mv), state)
    }

    fn new(parent: NodeId, mv: Option<S::Move>, state: S) -> Self {
        let untried = state.legal_moves();
        let is_terminal = state.is_terminal();
        let terminal_value = if is_terminal {
            state.outcome(state.to_move()).unwrap_or(0.0)
        } else {
            0.0
        };

        Self {
            parent,
            mv,
            state,
            untried,
            children: Vec::new(),
            visit_count: 0,
            value_sum: 0.0,
            is_terminal,
            terminal_value,
        }
    }

    /// Calculate mean value Q = W / N. Returns 0.0 if never visited.
    #[inline]
    pub fn mean_value(&self) -> f32 {
        if self.visit_count == 0 {
            0.0
        } else {
            self.value_sum / self.visit_count as f32
        }
    }

    /// Whether every legal move has been expanded into a child.
    #[inline]
    pub fn is_fully_expanded(&self) -> bool {
        self.untried.is_empty()
    }

    /// Whether selection stops here (terminal or not fully expanded).
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.is_terminal || !self.is_fully_expanded()
    }

    /// Calculate the UCB1 score for child selection:
    /// UCB1 = Q + C * sqrt(ln(N_parent) / N)
    ///
    /// The stored Q is from this node's own perspective (the player to move
    /// here), so it is negated for the parent doing the selecting: a child
    /// the opponent expects to lose is a child the parent wants to enter.
    ///
    /// An unvisited child has an unbounded exploration term and returns
    /// infinity, so every expanded child is visited at least once before
    /// any sibling is revisited.
    ///
    /// Takes pre-computed ln(parent_visits) to avoid redundant log calls
    /// when comparing multiple children.
    #[inline]
    pub fn ucb1(&self, ln_parent_visits: f32, exploration: f32) -> f32 {
        if self.visit_count == 0 {
            return f32::INFINITY;
        }

        let q = -self.mean_value();
        q + exploration * (ln_parent_visits / self.visit_count as f32).sqrt()
    }
}
