// Copyright 2016 spatial-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The tree model and the strategy-agnostic machinery shared by every
//! insertion strategy: leaf-choice helpers, `adjust_tree`, overflow
//! dispatch, and the read-side traversal operations.

use crate::error::RTreeError;
use crate::geometry::Rect;
use crate::node::{Entry, EntryHandle, Node, NodeId};
use crate::strategy::{InsertScratch, Strategy, StrategyOps};

/// Owns every node reachable from `root`; configuration `(min_entries,
/// max_entries)`; and the strategy bound at construction.
pub struct Tree<T> {
    nodes: Vec<Node<T>>,
    root: NodeId,
    min_entries: usize,
    max_entries: usize,
    strategy: Option<Strategy<T>>,
    next_id: u64,
}

impl<T> Tree<T> {
    /// Builds an empty tree (a leaf root with zero entries) under the
    /// given strategy. Fails if `min_entries`/`max_entries` don't
    /// satisfy `1 <= min_entries <= ceil(max_entries/2)` and
    /// `max_entries >= 2`.
    pub fn new(min_entries: usize, max_entries: usize, strategy: Strategy<T>) -> Result<Tree<T>, RTreeError> {
        Self::validate_config(min_entries, max_entries)?;
        Ok(Tree {
            nodes: vec![Node::new_leaf()],
            root: 0,
            min_entries,
            max_entries,
            strategy: Some(strategy),
            next_id: 0,
        })
    }

    pub fn with_guttman(min_entries: usize, max_entries: usize) -> Result<Tree<T>, RTreeError> {
        Self::new(min_entries, max_entries, Strategy::guttman())
    }

    pub fn with_rstar(min_entries: usize, max_entries: usize) -> Result<Tree<T>, RTreeError> {
        Self::new(min_entries, max_entries, Strategy::rstar())
    }

    fn validate_config(min_entries: usize, max_entries: usize) -> Result<(), RTreeError> {
        let ceil_half_max = (max_entries + 1) / 2;
        if max_entries < 2 || min_entries < 1 || min_entries > ceil_half_max {
            return Err(RTreeError::InvalidConfiguration { min_entries, max_entries });
        }
        Ok(())
    }

    pub fn min_entries(&self) -> usize {
        self.min_entries
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.as_ref().expect("strategy always present between calls").name()
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.root
    }

    pub fn node(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        &mut self.nodes[id]
    }

    pub fn entry(&self, handle: EntryHandle) -> &Entry<T> {
        &self.nodes[handle.node].entries[handle.index]
    }

    /// Number of leaf entries currently stored.
    pub fn len(&self) -> usize {
        self.get_leaf_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bounding_rect_of(&self, id: NodeId) -> Option<Rect> {
        self.node(id).bounding_rect()
    }

    /// A node's depth counted from the leaves upward: leaves are level
    /// 0, their parent is level 1, and so on. The tree's height-balance
    /// invariant guarantees this is well-defined regardless of which
    /// child is followed down. Used to reinsert a non-leaf entry removed
    /// by forced reinsertion back in at its own level rather than always
    /// at the leaves.
    pub(crate) fn node_level(&self, id: NodeId) -> usize {
        let node = self.node(id);
        if node.is_leaf {
            0
        } else {
            let first_child = node.entries[0].child().expect("internal node always has entries with children");
            1 + self.node_level(first_child)
        }
    }

    pub(crate) fn push_node(&mut self, node: Node<T>) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub(crate) fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Inserts a leaf entry containing `data` and `rect`, maintaining all
    /// structural invariants before returning. Fails only if `rect` is
    /// malformed; on failure the tree is unchanged.
    pub fn insert(&mut self, data: T, rect: Rect) -> Result<EntryHandle, RTreeError> {
        if !(rect.min_x <= rect.max_x && rect.min_y <= rect.max_y) {
            return Err(RTreeError::InvalidRectangle {
                min_x: rect.min_x,
                min_y: rect.min_y,
                max_x: rect.max_x,
                max_y: rect.max_y,
            });
        }
        log::debug!(
            "insert: rect=({}, {}, {}, {}) strategy={}",
            rect.min_x,
            rect.min_y,
            rect.max_x,
            rect.max_y,
            self.strategy_name()
        );
        let mut scratch = InsertScratch::new();
        let strategy = self.strategy.take().expect("strategy always present between calls");
        let leaf_id = strategy.choose_leaf(self, &rect);
        self.strategy = Some(strategy);

        let id = self.next_id();
        let entry = Entry::leaf(id, rect, data);
        self.place_entry(leaf_id, entry, &mut scratch)?;
        Ok(self.find_entry(id).expect("just-inserted entry must be locatable"))
    }

    /// Runs `query(rect)`: a lazy, single-pass, non-restartable iterator
    /// over every leaf entry whose rectangle intersects `rect`.
    pub fn query(&self, rect: Rect) -> Result<QueryIter<'_, T>, RTreeError> {
        if !(rect.min_x <= rect.max_x && rect.min_y <= rect.max_y) {
            return Err(RTreeError::InvalidRectangle {
                min_x: rect.min_x,
                min_y: rect.min_y,
                max_x: rect.max_x,
                max_y: rect.max_y,
            });
        }
        Ok(QueryIter { tree: self, rect, node_stack: vec![self.root], leaf_buffer: Vec::new() })
    }

    /// Level 0 is the root; each subsequent level is the ordered set of
    /// nodes at that depth.
    pub fn get_levels(&self) -> Vec<Vec<NodeId>> {
        let mut levels = Vec::new();
        let mut current = vec![self.root];
        while !current.is_empty() {
            let mut next = Vec::new();
            for &id in &current {
                let node = self.node(id);
                if !node.is_leaf {
                    for e in &node.entries {
                        if let Some(child) = e.child() {
                            next.push(child);
                        }
                    }
                }
            }
            levels.push(current);
            current = next;
        }
        levels
    }

    pub fn get_nodes(&self) -> Vec<NodeId> {
        self.reachable_nodes()
    }

    pub fn get_leaves(&self) -> Vec<NodeId> {
        self.reachable_nodes().into_iter().filter(|&id| self.node(id).is_leaf).collect()
    }

    pub fn get_leaf_entries(&self) -> Vec<EntryHandle> {
        self.get_leaves()
            .into_iter()
            .flat_map(|node| (0..self.node(node).entries.len()).map(move |index| EntryHandle { node, index }))
            .collect()
    }

    fn reachable_nodes(&self) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if !node.is_leaf {
                for e in &node.entries {
                    if let Some(child) = e.child() {
                        stack.push(child);
                    }
                }
            }
            result.push(id);
        }
        result
    }

    fn find_entry(&self, id: u64) -> Option<EntryHandle> {
        for node_id in self.reachable_nodes() {
            let node = self.node(node_id);
            if node.is_leaf {
                if let Some(index) = node.entries.iter().position(|e| e.id == id) {
                    return Some(EntryHandle { node: node_id, index });
                }
            }
        }
        None
    }

    /// Pushes `entry` into `leaf_id` and runs overflow handling or plain
    /// re-tightening, whichever applies. `leaf_id` is always a leaf, so
    /// its level-from-leaf is always 0.
    fn place_entry(&mut self, leaf_id: NodeId, entry: Entry<T>, scratch: &mut InsertScratch) -> Result<(), RTreeError> {
        self.place_entry_at(leaf_id, entry, 0, scratch)
    }

    /// Pushes `entry` into `node_id` at tree level `level` (`node_id`'s
    /// own level-from-leaf) and runs overflow handling or plain
    /// re-tightening, whichever applies. If `entry` is an internal entry,
    /// its child's `parent`/`parent_entry_index` are relinked to
    /// `node_id` and the entry's new index, same as `adjust_tree` does
    /// when attaching a freshly split node.
    fn place_entry_at(&mut self, node_id: NodeId, entry: Entry<T>, level: usize, scratch: &mut InsertScratch) -> Result<(), RTreeError> {
        let child = entry.child();
        let index = self.node(node_id).entries.len();
        self.node_mut(node_id).entries.push(entry);
        if let Some(child_id) = child {
            self.node_mut(child_id).parent = Some(node_id);
            self.node_mut(child_id).parent_entry_index = Some(index);
        }
        if self.node(node_id).entries.len() > self.max_entries {
            self.handle_overflow(node_id, level, scratch)
        } else {
            self.adjust_tree(node_id, None, level, scratch)
        }
    }

    /// Re-tightens `node_id`'s `parent_entry.rect`, if any, to the
    /// node's current bounding rectangle.
    fn retighten_parent_entry(&mut self, node_id: NodeId) {
        if let Some(parent_id) = self.node(node_id).parent {
            let idx = self.node(node_id).parent_entry_index.expect("parent set implies parent_entry_index set");
            let new_rect = self.bounding_rect_of(node_id).expect("non-root node is never empty");
            self.node_mut(parent_id).entries[idx].rect = new_rect;
        }
    }

    /// Walks from `node_id` to the root, re-tightening ancestors'
    /// `parent_entry.rect`. If `split` is supplied, attaches it as a new
    /// sibling of `node_id` in `node_id`'s parent (or grows a new root if
    /// `node_id` has none), cascading into `handle_overflow` if that
    /// attachment itself overflows the parent. `level` is `node_id`'s
    /// level-from-leaf, used only if the cascade reaches an overflow.
    fn adjust_tree(
        &mut self,
        mut node_id: NodeId,
        mut split: Option<NodeId>,
        level: usize,
        scratch: &mut InsertScratch,
    ) -> Result<(), RTreeError> {
        loop {
            self.retighten_parent_entry(node_id);
            match split.take() {
                None => match self.node(node_id).parent {
                    Some(parent_id) => {
                        node_id = parent_id;
                        continue;
                    }
                    None => return Ok(()),
                },
                Some(split_id) => match self.node(node_id).parent {
                    Some(parent_id) => {
                        let split_rect = self.bounding_rect_of(split_id).expect("freshly split node is non-empty");
                        let entry_id = self.next_id();
                        let idx = self.node(parent_id).entries.len();
                        self.node_mut(parent_id).entries.push(Entry::internal(entry_id, split_rect, split_id));
                        self.node_mut(split_id).parent = Some(parent_id);
                        self.node_mut(split_id).parent_entry_index = Some(idx);
                        if self.node(parent_id).entries.len() > self.max_entries {
                            return self.handle_overflow(parent_id, level + 1, scratch);
                        }
                        node_id = parent_id;
                        continue;
                    }
                    None => {
                        let old_root_rect = self.bounding_rect_of(node_id).expect("root is non-empty once it overflows");
                        let split_rect = self.bounding_rect_of(split_id).expect("freshly split node is non-empty");
                        let entry_id_a = self.next_id();
                        let entry_id_b = self.next_id();
                        let new_root = Node::new_internal(vec![
                            Entry::internal(entry_id_a, old_root_rect, node_id),
                            Entry::internal(entry_id_b, split_rect, split_id),
                        ]);
                        let new_root_id = self.push_node(new_root);
                        self.node_mut(node_id).parent = Some(new_root_id);
                        self.node_mut(node_id).parent_entry_index = Some(0);
                        self.node_mut(split_id).parent = Some(new_root_id);
                        self.node_mut(split_id).parent_entry_index = Some(1);
                        self.root = new_root_id;
                        log::debug!("root split: new root {} at height +1", new_root_id);
                        return Ok(());
                    }
                },
            }
        }
    }

    /// Decides between forced reinsertion and a regular split for the
    /// overfull `node_id`, per the strategy's policy and the per-insert,
    /// per-level scratch.
    fn handle_overflow(&mut self, node_id: NodeId, level: usize, scratch: &mut InsertScratch) -> Result<(), RTreeError> {
        let is_root = node_id == self.root;
        let strategy = self.strategy.take().expect("strategy always present between calls");
        if !is_root && strategy.supports_reinsert() && !scratch.already_reinserted(level) {
            scratch.mark_reinserted(level);
            log::trace!("forced reinsertion at node {} level {}", node_id, level);
            let removed = strategy.reinsert_candidates(self, node_id);
            self.strategy = Some(strategy);
            self.retighten_parent_entry(node_id);
            if let Some(parent_id) = self.node(node_id).parent {
                self.adjust_tree(parent_id, None, level + 1, scratch)?;
            }
            for entry in removed {
                self.reinsert_entry(entry, level, scratch)?;
            }
            Ok(())
        } else {
            log::trace!("splitting node {} level {}", node_id, level);
            let new_node_id = strategy.split(self, node_id);
            self.strategy = Some(strategy);
            self.adjust_tree(node_id, Some(new_node_id), level, scratch)
        }
    }

    /// Reinserts a single entry removed by forced reinsertion, starting
    /// from the current root, carrying the same per-insert scratch so
    /// "first overflow per level" bookkeeping spans the whole cascade.
    /// `level` is the entry's own level-from-leaf (the level of the node
    /// it was removed from): a leaf entry reinserts at level 0 same as
    /// any fresh insert, but an internal entry removed from a higher
    /// overfull node must land among entries at that same level, not
    /// always at the leaves, or its child subtree would end up attached
    /// under a leaf node and become unreachable.
    fn reinsert_entry(&mut self, entry: Entry<T>, level: usize, scratch: &mut InsertScratch) -> Result<(), RTreeError> {
        let rect = entry.rect;
        let strategy = self.strategy.take().expect("strategy always present between calls");
        let target = strategy.choose_subtree_at_level(self, &rect, level);
        self.strategy = Some(strategy);
        self.place_entry_at(target, entry, level, scratch)
    }
}

/// Lazy, single-pass traversal over the leaf entries intersecting a
/// query rectangle. Not restartable: build a new `QueryIter` via
/// `Tree::query` to search again.
pub struct QueryIter<'a, T> {
    tree: &'a Tree<T>,
    rect: Rect,
    node_stack: Vec<NodeId>,
    leaf_buffer: Vec<EntryHandle>,
}

impl<'a, T> Iterator for QueryIter<'a, T> {
    type Item = EntryHandle;

    fn next(&mut self) -> Option<EntryHandle> {
        loop {
            if let Some(handle) = self.leaf_buffer.pop() {
                return Some(handle);
            }
            let node_id = self.node_stack.pop()?;
            let node = self.tree.node(node_id);
            if node.is_leaf {
                for (index, e) in node.entries.iter().enumerate() {
                    if e.rect.intersects(&self.rect) {
                        self.leaf_buffer.push(EntryHandle { node: node_id, index });
                    }
                }
            } else {
                for e in &node.entries {
                    if e.rect.intersects(&self.rect) {
                        if let Some(child) = e.child() {
                            self.node_stack.push(child);
                        }
                    }
                }
            }
        }
    }
}

/// Picks the entry whose bounding rectangle requires the smallest area
/// increase to cover `rect`. Tie-break: smallest original area; then
/// first in iteration order.
pub(crate) fn least_area_enlargement<T>(entries: &[Entry<T>], rect: &Rect) -> usize {
    assert!(!entries.is_empty(), "least_area_enlargement requires at least one candidate");
    let mut best = 0;
    let mut best_enlargement = entries[0].rect.enlargement(rect);
    let mut best_area = entries[0].rect.area();
    for (i, e) in entries.iter().enumerate().skip(1) {
        let enlargement = e.rect.enlargement(rect);
        let area = e.rect.area();
        if enlargement < best_enlargement || (enlargement == best_enlargement && area < best_area) {
            best = i;
            best_enlargement = enlargement;
            best_area = area;
        }
    }
    best
}

/// For each candidate entry, the overlap growth incurred by absorbing
/// `rect` into it; picks the smallest, falling back to
/// `least_area_enlargement` over the tied candidates.
pub(crate) fn least_overlap_enlargement<T>(entries: &[Entry<T>], rect: &Rect) -> usize {
    assert!(!entries.is_empty(), "least_overlap_enlargement requires at least one candidate");
    if entries.len() == 1 {
        return 0;
    }
    let delta_overlap = |i: usize| -> f64 {
        let e = &entries[i];
        let enlarged = e.rect.union(rect);
        let mut delta = 0.0;
        for (j, f) in entries.iter().enumerate() {
            if i == j {
                continue;
            }
            delta += enlarged.overlap(&f.rect) - e.rect.overlap(&f.rect);
        }
        delta
    };

    let mut best_delta = delta_overlap(0);
    let mut tied = vec![0usize];
    for i in 1..entries.len() {
        let delta = delta_overlap(i);
        if delta < best_delta {
            best_delta = delta;
            tied.clear();
            tied.push(i);
        } else if delta == best_delta {
            tied.push(i);
        }
    }
    if tied.len() == 1 {
        return tied[0];
    }
    let tied_entries: Vec<&Entry<T>> = tied.iter().map(|&i| &entries[i]).collect();
    let mut best = 0;
    let mut best_enlargement = tied_entries[0].rect.enlargement(rect);
    let mut best_area = tied_entries[0].rect.area();
    for (pos, e) in tied_entries.iter().enumerate().skip(1) {
        let enlargement = e.rect.enlargement(rect);
        let area = e.rect.area();
        if enlargement < best_enlargement || (enlargement == best_enlargement && area < best_area) {
            best = pos;
            best_enlargement = enlargement;
            best_area = area;
        }
    }
    tied[best]
}
