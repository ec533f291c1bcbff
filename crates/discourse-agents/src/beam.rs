//! Beam-search lookahead over a [`BayesianTree`].
//!
//! The search asks "if I keep the floor for up to `depth` more turns, which
//! first move leads to the best probability-weighted outcome?"
//!
//! # Forward construction
//!
//! Level by level, every current leaf gets one child per candidate item,
//! scored in the context `history ++ items on the leaf's path`, plus one
//! silent child with score 0. Across everything created on that level, the
//! `width` nodes with the highest normalized path expectation become the next
//! leaves; the rest are pruned together with any ancestors they leave
//! childless.
//!
//! # Backward selection
//!
//! A leaf is worth its own expectation. An internal node is worth the larger
//! of its own expectation and its best child's worth; the root starts at 0.
//! The search commits to the root child on the path to the best value.

use std::collections::BTreeSet;

use discourse_core::Scorer;
use discourse_types::{Item, Turn};
use tracing::debug;

use crate::tree::{BayesianTree, NodeId};

/// Shape of one beam search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamConfig {
    /// Levels to look ahead.
    pub depth: usize,
    /// Nodes kept per level.
    pub width: usize,
    /// Per-level probability attenuation.
    pub decay_rate: f64,
    /// Prior probability of the root.
    pub root_probability: f64,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            depth: 1,
            width: 1,
            decay_rate: DEFAULT_DECAY_RATE,
            root_probability: DEFAULT_ROOT_PROBABILITY,
        }
    }
}

/// Default per-level decay.
pub const DEFAULT_DECAY_RATE: f64 = 0.5;

/// Default root prior.
pub const DEFAULT_ROOT_PROBABILITY: f64 = 2.0;

/// Best immediate move found by a search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOutcome {
    /// The item to say now, `None` if staying silent (or nothing) looks best.
    pub item: Option<Item>,
    /// The value of the best path through that move.
    pub score: f64,
}

impl SearchOutcome {
    /// No candidate beats silence.
    pub const fn none() -> Self {
        Self {
            item: None,
            score: 0.0,
        }
    }
}

/// A beam search bound to one player's scorer.
#[derive(Debug, Clone, Copy)]
pub struct BeamSearch<'a> {
    scorer: &'a Scorer,
    config: BeamConfig,
}

impl<'a> BeamSearch<'a> {
    /// Create a search using `scorer` as the node evaluator.
    pub const fn new(scorer: &'a Scorer, config: BeamConfig) -> Self {
        Self { scorer, config }
    }

    /// The search shape.
    pub const fn config(&self) -> BeamConfig {
        self.config
    }

    /// Build the pruned tree and select the best first move.
    pub fn search(&self, candidates: &[Item], history: &[Turn]) -> SearchOutcome {
        let tree = self.build_tree(candidates, history);
        let outcome = select_best(&tree);
        debug!(
            depth = self.config.depth,
            width = self.config.width,
            candidates = candidates.len(),
            nodes = tree.len(),
            score = outcome.score,
            speaks = outcome.item.is_some(),
            "Beam search finished"
        );
        outcome
    }

    /// Forward construction only. Exposed so callers can inspect the beam.
    pub fn build_tree(&self, candidates: &[Item], history: &[Turn]) -> BayesianTree {
        let mut tree = BayesianTree::new(self.config.root_probability, self.config.decay_rate);
        let mut leaves = vec![tree.root()];
        let mut context: Vec<Turn> = history.to_vec();

        for _level in 0..self.config.depth {
            if leaves.is_empty() {
                break;
            }

            let mut created: Vec<NodeId> = Vec::new();
            for &leaf in &leaves {
                context.truncate(history.len());
                context.extend(tree.path_items(leaf).into_iter().map(Some));

                for candidate in candidates {
                    let score = self.scorer.evaluate(candidate, &context);
                    if let Some(child) = tree.add_child(leaf, Some(*candidate), score) {
                        created.push(child);
                    }
                }
                if let Some(silent) = tree.add_child(leaf, None, 0.0) {
                    created.push(silent);
                }
            }

            let kept = top_by_expectation(&tree, &created, self.config.width);
            for &node in &created {
                if !kept.contains(&node) {
                    tree.prune_branch(node);
                }
            }
            leaves = created.into_iter().filter(|node| kept.contains(node)).collect();
        }

        tree
    }
}

/// The `width` best of `created` by normalized expectation. Ties keep the
/// node created first.
fn top_by_expectation(tree: &BayesianTree, created: &[NodeId], width: usize) -> BTreeSet<NodeId> {
    let mut ranked: Vec<(f64, NodeId)> = created
        .iter()
        .map(|&node| (tree.normalized_expectation(node), node))
        .collect();
    // Stable sort: equal expectations stay in creation order.
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.into_iter().take(width).map(|(_, node)| node).collect()
}

/// Backward pass: the root child leading to the best path value.
pub fn select_best(tree: &BayesianTree) -> SearchOutcome {
    let (best_child, score) = best_value(tree, tree.root());
    match best_child.and_then(|child| tree.get(child)) {
        Some(node) => SearchOutcome {
            item: node.memory,
            score,
        },
        None => SearchOutcome::none(),
    }
}

fn best_value(tree: &BayesianTree, node: NodeId) -> (Option<NodeId>, f64) {
    let own = tree.normalized_expectation(node);
    let children = tree.children(node);
    if children.is_empty() {
        return (None, own);
    }

    let mut best_child = None;
    let mut best = own;
    for &child in children {
        let (_, value) = best_value(tree, child);
        if value > best {
            best = value;
            best_child = Some(child);
        }
    }
    (best_child, best)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use discourse_types::{ItemId, PlayerId, Subjects};

    use super::*;

    fn item(tag: u8, importance: f64, subject: u32) -> Item {
        Item {
            id: ItemId::from_random_bytes([tag; 16]),
            player_id: PlayerId::from_random_bytes([0; 16]),
            importance,
            subjects: Subjects::one(subject),
        }
    }

    fn config(depth: usize, width: usize) -> BeamConfig {
        BeamConfig {
            depth,
            width,
            ..BeamConfig::default()
        }
    }

    #[test]
    fn empty_bank_yields_nothing() {
        let scorer = Scorer::new(vec![0, 1, 2], 0.5);
        let outcome = BeamSearch::new(&scorer, config(3, 4)).search(&[], &[]);
        assert_eq!(outcome, SearchOutcome::none());
    }

    #[test]
    fn zero_depth_yields_nothing() {
        let scorer = Scorer::new(vec![0, 1, 2], 0.5);
        let bank = vec![item(1, 1.0, 0)];
        let outcome = BeamSearch::new(&scorer, config(0, 4)).search(&bank, &[]);
        assert_eq!(outcome, SearchOutcome::none());
    }

    #[test]
    fn negative_candidates_stay_silent() {
        // Selfless scorer, no context: every item has coherence -1.
        let scorer = Scorer::new(vec![0, 1, 2], 0.0);
        let bank = vec![item(1, 0.2, 0), item(2, 0.4, 1)];
        let outcome = BeamSearch::new(&scorer, config(1, 3)).search(&bank, &[]);
        assert!(outcome.item.is_none());
        assert!(outcome.score.abs() < 1e-12);
    }

    #[test]
    fn depth_one_picks_highest_utility() {
        let scorer = Scorer::new(vec![0, 1, 2], 0.0);
        let anchor = item(9, 0.0, 2);
        let history = vec![Some(anchor)];
        let bank = vec![item(1, 0.9, 0), item(2, 0.4, 2), item(3, 0.7, 2)];
        // Subject 2 is in context (coherence 0); subject 0 is not (-1).
        let outcome = BeamSearch::new(&scorer, config(1, 4)).search(&bank, &history);
        assert_eq!(outcome.item, Some(item(3, 0.7, 2)));
        assert!((outcome.score - 0.7).abs() < 1e-12);
    }

    #[test]
    fn beam_never_exceeds_width_and_keeps_no_orphans() {
        let scorer = Scorer::new((0..6).collect(), 0.5);
        let bank: Vec<Item> = (0..6)
            .map(|tag| item(tag, f64::from(tag) / 6.0, u32::from(tag % 3)))
            .collect();
        for width in 1..6 {
            let search = BeamSearch::new(&scorer, config(3, width));
            let tree = search.build_tree(&bank, &[None]);
            for depth in 1..=3 {
                assert!(tree.count_at_depth(depth) <= width, "width {width} depth {depth}");
            }
            assert_eq!(tree.reachable().len(), tree.len());
        }
    }

    #[test]
    fn tie_keeps_first_created_node() {
        let scorer = Scorer::new(vec![0, 1], 0.0);
        let twin_a = item(1, 0.5, 0);
        let twin_b = item(2, 0.5, 0);
        let history = vec![Some(item(9, 0.0, 0))];
        let outcome = BeamSearch::new(&scorer, config(1, 1)).search(&[twin_a, twin_b], &history);
        assert_eq!(outcome.item, Some(twin_a));
    }
}
