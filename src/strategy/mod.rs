// Copyright 2016 spatial-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The pluggable `(choose_leaf, overflow)` strategy surface. Two
//! strategies ship: [`guttman`] (quadratic split, no reinsertion) and
//! [`rstar`] (least-overlap subtree choice, perimeter/overlap-driven
//! split, forced reinsertion). A strategy is bound once, at tree
//! construction (`Tree::with_guttman` / `Tree::with_rstar`); there is no
//! per-call override or monkey-patching.

pub mod guttman;
pub mod rstar;

use crate::geometry::Rect;
use crate::node::{Entry, NodeId};
use crate::tree::Tree;
use guttman::GuttmanStrategy;
use rstar::RStarStrategy;

/// Per-top-level-insert scratch tracking which tree levels have already
/// consumed their one forced reinsertion. Levels are counted from the
/// leaves upward (a freshly overflowing leaf is level 0) so the indexing
/// stays valid even if the root splits and the tree grows a new level
/// during the same insert.
#[derive(Debug, Default)]
pub struct InsertScratch {
    reinserted: Vec<bool>,
}

impl InsertScratch {
    pub fn new() -> InsertScratch {
        InsertScratch { reinserted: Vec::new() }
    }

    /// True if level `level` has already performed its one forced
    /// reinsertion during the current top-level insert.
    pub fn already_reinserted(&self, level: usize) -> bool {
        self.reinserted.get(level).copied().unwrap_or(false)
    }

    /// Marks `level` as having consumed its forced reinsertion.
    pub fn mark_reinserted(&mut self, level: usize) {
        if level >= self.reinserted.len() {
            self.reinserted.resize(level + 1, false);
        }
        self.reinserted[level] = true;
    }
}

/// The capability interface a strategy implements: where a new entry
/// goes, and what an overfull node does about it.
pub trait StrategyOps<T> {
    /// Given an internal node `node_id`, picks which child to descend
    /// into next for an entry with bounding rectangle `rect`. The
    /// strategy-specific part of subtree selection; `choose_leaf` and
    /// `choose_subtree_at_level` both drive their descent through this.
    fn next_child(&self, tree: &Tree<T>, node_id: NodeId, rect: &Rect) -> NodeId;

    /// Descends from the root and returns the id of the leaf node a new
    /// entry with bounding rectangle `rect` should be placed into.
    fn choose_leaf(&self, tree: &Tree<T>, rect: &Rect) -> NodeId {
        self.choose_subtree_at_level(tree, rect, 0)
    }

    /// Descends from the root and returns the id of the node at
    /// `target_level` (counted from the leaves upward, leaves being
    /// level 0) that an entry with bounding rectangle `rect` should be
    /// placed into. Used both for ordinary leaf insertion
    /// (`target_level == 0`) and for forced reinsertion of a non-leaf
    /// entry removed from an overfull internal node, which must land
    /// back among entries at its own level rather than always at the
    /// leaves.
    fn choose_subtree_at_level(&self, tree: &Tree<T>, rect: &Rect, target_level: usize) -> NodeId {
        let mut current = tree.root_id();
        loop {
            if tree.node_level(current) == target_level {
                return current;
            }
            current = self.next_child(tree, current, rect);
        }
    }

    /// Splits the overfull node `node_id` in place: one group of entries
    /// stays in `node_id`, the other becomes a freshly-allocated sibling
    /// node whose id is returned. The returned node's `parent` /
    /// `parent_entry_index` are left unset; `Tree::adjust_tree` is the
    /// sole writer of those fields.
    fn split(&self, tree: &mut Tree<T>, node_id: NodeId) -> NodeId;

    /// Whether this strategy ever prefers forced reinsertion over an
    /// immediate split. Only R* does; Guttman always splits.
    fn supports_reinsert(&self) -> bool {
        false
    }

    /// Removes and returns the subset of `node_id`'s entries selected
    /// for forced reinsertion, shrinking `node_id` in place. Only called
    /// when `supports_reinsert` returns true.
    fn reinsert_candidates(&self, tree: &mut Tree<T>, node_id: NodeId) -> Vec<Entry<T>> {
        let _ = (tree, node_id);
        unreachable!("reinsert_candidates called on a strategy that never reinserts")
    }
}

/// A strategy bound to a tree at construction. A closed enum rather than
/// a trait object: the strategy set is fixed (Guttman, R*), dispatch is
/// static, and there is never a reason to swap strategies on a live tree.
pub enum Strategy<T> {
    Guttman(GuttmanStrategy<T>),
    RStar(RStarStrategy<T>),
}

impl<T> Strategy<T> {
    pub fn guttman() -> Strategy<T> {
        Strategy::Guttman(GuttmanStrategy::new())
    }

    pub fn rstar() -> Strategy<T> {
        Strategy::RStar(RStarStrategy::new())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Guttman(_) => "guttman",
            Strategy::RStar(_) => "rstar",
        }
    }
}

impl<T> StrategyOps<T> for Strategy<T> {
    fn next_child(&self, tree: &Tree<T>, node_id: NodeId, rect: &Rect) -> NodeId {
        match self {
            Strategy::Guttman(s) => s.next_child(tree, node_id, rect),
            Strategy::RStar(s) => s.next_child(tree, node_id, rect),
        }
    }

    fn split(&self, tree: &mut Tree<T>, node_id: NodeId) -> NodeId {
        match self {
            Strategy::Guttman(s) => s.split(tree, node_id),
            Strategy::RStar(s) => s.split(tree, node_id),
        }
    }

    fn supports_reinsert(&self) -> bool {
        match self {
            Strategy::Guttman(s) => s.supports_reinsert(),
            Strategy::RStar(s) => s.supports_reinsert(),
        }
    }

    fn reinsert_candidates(&self, tree: &mut Tree<T>, node_id: NodeId) -> Vec<Entry<T>> {
        match self {
            Strategy::Guttman(s) => s.reinsert_candidates(tree, node_id),
            Strategy::RStar(s) => s.reinsert_candidates(tree, node_id),
        }
    }
}
