// Copyright 2016 spatial-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Guttman's original quadratic-cost strategy: cheapest-enlargement leaf
//! choice, quadratic seed-picking split, no forced reinsertion.

use std::marker::PhantomData;

use itertools::Itertools;

use crate::geometry::Rect;
use crate::node::{Node, NodeId};
use crate::strategy::StrategyOps;
use crate::tree::{least_area_enlargement, Tree};

pub struct GuttmanStrategy<T> {
    _marker: PhantomData<T>,
}

impl<T> GuttmanStrategy<T> {
    pub fn new() -> GuttmanStrategy<T> {
        GuttmanStrategy { _marker: PhantomData }
    }
}

impl<T> Default for GuttmanStrategy<T> {
    fn default() -> Self {
        GuttmanStrategy::new()
    }
}

impl<T> StrategyOps<T> for GuttmanStrategy<T> {
    fn next_child(&self, tree: &Tree<T>, node_id: NodeId, rect: &Rect) -> NodeId {
        let node = tree.node(node_id);
        let idx = least_area_enlargement(&node.entries, rect);
        node.entries[idx].child().expect("internal entry always has a child")
    }

    /// Classic quadratic split: pick the pair of entries that would waste
    /// the most area if forced together as the two seeds, then assign
    /// every remaining entry to whichever seed group enlarges least,
    /// forcing the rest into whichever group is short of `min_entries`
    /// once the other can no longer be.
    fn split(&self, tree: &mut Tree<T>, node_id: NodeId) -> NodeId {
        let min_entries = tree.min_entries();
        let is_leaf = tree.node(node_id).is_leaf;
        let mut entries = std::mem::take(&mut tree.node_mut(node_id).entries);

        let (seed_a, seed_b) = entries
            .iter()
            .enumerate()
            .tuple_combinations()
            .max_by(|&((_, a1), (_, a2)), &((_, b1), (_, b2))| {
                let waste_a = a1.rect.union(&a2.rect).area() - a1.rect.area() - a2.rect.area();
                let waste_b = b1.rect.union(&b2.rect).area() - b1.rect.area() - b2.rect.area();
                waste_a.partial_cmp(&waste_b).expect("rectangle areas are never NaN")
            })
            .map(|((i, _), (j, _))| (i, j))
            .expect("a node about to split always has at least two entries");

        let seed_b_entry = entries.remove(seed_b);
        let seed_a_entry = entries.remove(seed_a);
        let mut rect_a = seed_a_entry.rect;
        let mut rect_b = seed_b_entry.rect;
        let mut group_a = vec![seed_a_entry];
        let mut group_b = vec![seed_b_entry];

        while !entries.is_empty() {
            if group_a.len() + entries.len() <= min_entries {
                group_a.extend(entries.drain(..));
                break;
            }
            if group_b.len() + entries.len() <= min_entries {
                group_b.extend(entries.drain(..));
                break;
            }
            let candidate = entries.remove(0);
            let enlarge_a = rect_a.enlargement(&candidate.rect);
            let enlarge_b = rect_b.enlargement(&candidate.rect);
            let assign_to_a = if enlarge_a != enlarge_b {
                enlarge_a < enlarge_b
            } else if rect_a.area() != rect_b.area() {
                rect_a.area() < rect_b.area()
            } else {
                group_a.len() <= group_b.len()
            };
            if assign_to_a {
                rect_a = rect_a.union(&candidate.rect);
                group_a.push(candidate);
            } else {
                rect_b = rect_b.union(&candidate.rect);
                group_b.push(candidate);
            }
        }

        tree.node_mut(node_id).entries = group_a;
        tree.push_node(Node { entries: group_b, is_leaf, parent: None, parent_entry_index: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Entry;

    #[test]
    fn choose_leaf_descends_by_least_area_enlargement() {
        let mut tree: Tree<&'static str> = Tree::with_guttman(1, 3).unwrap();
        tree.insert("a", Rect::new(0.0, 0.0, 1.0, 1.0)).unwrap();
        tree.insert("b", Rect::new(10.0, 10.0, 11.0, 11.0)).unwrap();
        let strategy = GuttmanStrategy::new();
        let leaf = strategy.choose_leaf(&tree, &Rect::new(0.5, 0.5, 0.6, 0.6));
        assert!(tree.node(leaf).is_leaf);
    }

    #[test]
    fn split_respects_min_entries_on_both_sides() {
        let mut tree: Tree<()> = Tree::with_guttman(2, 4).unwrap();
        let root = tree.root_id();
        for (i, rect) in [
            Rect::new(0.0, 0.0, 1.0, 1.0),
            Rect::new(10.0, 10.0, 11.0, 11.0),
            Rect::new(20.0, 0.0, 21.0, 1.0),
            Rect::new(0.0, 20.0, 1.0, 21.0),
            Rect::new(5.0, 5.0, 6.0, 6.0),
        ]
        .into_iter()
        .enumerate()
        {
            tree.node_mut(root).entries.push(Entry::leaf(i as u64, rect, ()));
        }
        let strategy = GuttmanStrategy::new();
        let new_id = strategy.split(&mut tree, root);
        assert!(tree.node(root).entries.len() >= 2);
        assert!(tree.node(new_id).entries.len() >= 2);
        assert_eq!(tree.node(root).entries.len() + tree.node(new_id).entries.len(), 5);
    }
}
