//! Probability-decaying search tree stored in a slab arena.
//!
//! Nodes live in a [`Slab`] and refer to each other by [`NodeId`]. Parents
//! keep their children as an index list; every child records its parent.
//! Pruned nodes are removed from the slab and their slots are reused by the
//! next insertion, so a tree that is grown and pruned level by level stays
//! bounded by the beam width.
//!
//! Each child's prior probability is its parent's prior times the decay
//! rate, so decay always compounds from the node that produced it.

use discourse_types::Item;
use slab::Slab;

/// Index of a node inside a [`BayesianTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// The raw slab index.
    pub const fn index(self) -> usize {
        self.0
    }
}

/// One hypothetical move.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchNode {
    /// Weight of this move in path expectations.
    pub prior_probability: f64,
    /// The item said, or `None` for staying silent (and for the root).
    pub memory: Option<Item>,
    /// Utility of the move in its hypothetical context.
    pub score: f64,
    /// Distance from the root.
    pub depth: usize,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SearchNode {
    /// The producing node, `None` for the root.
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Live children in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arena-backed search tree with a single root.
#[derive(Debug, Clone)]
pub struct BayesianTree {
    nodes: Slab<SearchNode>,
    root: NodeId,
    decay_rate: f64,
}

impl BayesianTree {
    /// Create a tree holding only a root with `root_probability`.
    pub fn new(root_probability: f64, decay_rate: f64) -> Self {
        let mut nodes = Slab::new();
        let root = NodeId(nodes.insert(SearchNode {
            prior_probability: root_probability,
            memory: None,
            score: 0.0,
            depth: 0,
            parent: None,
            children: Vec::new(),
        }));
        Self {
            nodes,
            root,
            decay_rate,
        }
    }

    /// The root node id.
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Per-level probability attenuation.
    pub const fn decay_rate(&self) -> f64 {
        self.decay_rate
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: the root is never removed.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a live node.
    pub fn get(&self, id: NodeId) -> Option<&SearchNode> {
        self.nodes.get(id.0)
    }

    /// Whether `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id.0)
    }

    /// Children of `id` (empty for unknown ids).
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.get(id) {
            Some(node) => &node.children,
            None => &[],
        }
    }

    /// Attach a new child under `parent`. Returns `None` if `parent` is not live.
    pub fn add_child(&mut self, parent: NodeId, memory: Option<Item>, score: f64) -> Option<NodeId> {
        let (parent_prior, parent_depth) = {
            let node = self.nodes.get(parent.0)?;
            (node.prior_probability, node.depth)
        };
        let id = NodeId(self.nodes.insert(SearchNode {
            prior_probability: parent_prior * self.decay_rate,
            memory,
            score,
            depth: parent_depth.saturating_add(1),
            parent: Some(parent),
            children: Vec::new(),
        }));
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.push(id);
        }
        Some(id)
    }

    /// Nodes from just below the root down to `id`, in root-to-node order.
    pub fn path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == self.root {
                break;
            }
            let Some(node) = self.get(node_id) else {
                break;
            };
            path.push(node_id);
            current = node.parent;
        }
        path.reverse();
        path
    }

    /// Items said along the path to `id` (pauses and the root skipped).
    pub fn path_items(&self, id: NodeId) -> Vec<Item> {
        self.path(id)
            .into_iter()
            .filter_map(|node_id| self.get(node_id).and_then(|node| node.memory))
            .collect()
    }

    /// Probability-weighted mean score over the path to `id`.
    ///
    /// The root and pause nodes are left out of both sums. Returns 0 when
    /// nothing on the path carries weight.
    pub fn normalized_expectation(&self, id: NodeId) -> f64 {
        let mut weighted = 0.0;
        let mut weight = 0.0;
        for node_id in self.path(id) {
            let Some(node) = self.get(node_id) else {
                continue;
            };
            if node.memory.is_none() {
                continue;
            }
            weighted += node.prior_probability * node.score;
            weight += node.prior_probability;
        }
        if weight > 0.0 { weighted / weight } else { 0.0 }
    }

    /// Remove the leaf `id`, then every ancestor left childless by the
    /// removal, stopping below the root. Internal nodes and the root are left
    /// untouched.
    pub fn prune_branch(&mut self, id: NodeId) {
        let mut current = id;
        loop {
            if current == self.root {
                return;
            }
            match self.nodes.get(current.0) {
                Some(node) if node.is_leaf() => {}
                _ => return,
            }
            let Some(removed) = self.nodes.try_remove(current.0) else {
                return;
            };
            let Some(parent) = removed.parent else {
                return;
            };
            if let Some(parent_node) = self.nodes.get_mut(parent.0) {
                parent_node.children.retain(|child| *child != current);
            }
            current = parent;
        }
    }

    /// Every node reachable from the root, depth-first.
    pub fn reachable(&self) -> Vec<NodeId> {
        let mut seen = Vec::with_capacity(self.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            seen.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        seen
    }

    /// Number of live nodes at `depth`.
    pub fn count_at_depth(&self, depth: usize) -> usize {
        self.nodes.iter().filter(|(_, node)| node.depth == depth).count()
    }
}
