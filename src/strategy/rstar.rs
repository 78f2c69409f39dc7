// Copyright 2016 spatial-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The R* strategy: least-overlap-enlargement leaf choice, a
//! perimeter/overlap-driven topological split, and forced reinsertion of
//! the farthest entries on first overflow per level.

use std::marker::PhantomData;

use ordered_float::NotNan;

use crate::geometry::Rect;
use crate::node::{Entry, Node, NodeId};
use crate::strategy::StrategyOps;
use crate::tree::{least_area_enlargement, least_overlap_enlargement, Tree};

pub struct RStarStrategy<T> {
    _marker: PhantomData<T>,
}

impl<T> RStarStrategy<T> {
    pub fn new() -> RStarStrategy<T> {
        RStarStrategy { _marker: PhantomData }
    }
}

impl<T> Default for RStarStrategy<T> {
    fn default() -> Self {
        RStarStrategy::new()
    }
}

impl<T> StrategyOps<T> for RStarStrategy<T> {
    /// Chooses, at every level but the one directly above the leaves,
    /// the child with least area enlargement; at the level directly
    /// above the leaves, the child with least overlap enlargement
    /// (falling back to area on ties).
    fn next_child(&self, tree: &Tree<T>, node_id: NodeId, rect: &Rect) -> NodeId {
        let node = tree.node(node_id);
        let first_child = node.entries[0].child().expect("internal entry always has a child");
        let children_are_leaves = tree.node(first_child).is_leaf;
        let idx = if children_are_leaves {
            least_overlap_enlargement(&node.entries, rect)
        } else {
            least_area_enlargement(&node.entries, rect)
        };
        node.entries[idx].child().expect("internal entry always has a child")
    }

    fn split(&self, tree: &mut Tree<T>, node_id: NodeId) -> NodeId {
        let m = tree.min_entries();
        let max_m = tree.max_entries();
        let is_leaf = tree.node(node_id).is_leaf;
        let entries = std::mem::take(&mut tree.node_mut(node_id).entries);
        let rects: Vec<Rect> = entries.iter().map(|e| e.rect).collect();

        let stat = RStarStat::compute(&rects, m, max_m);
        let axis = choose_split_axis(&stat, &rects);
        let axis_distributions = stat.axis_unique_distributions(axis);
        let chosen = &axis_distributions[choose_split_index(&axis_distributions, &rects)];

        let mut slots: Vec<Option<Entry<T>>> = entries.into_iter().map(Some).collect();
        let group_a: Vec<Entry<T>> = chosen.g1.iter().map(|&i| slots[i].take().unwrap()).collect();
        let group_b: Vec<Entry<T>> = chosen.g2.iter().map(|&i| slots[i].take().unwrap()).collect();

        tree.node_mut(node_id).entries = group_a;
        tree.push_node(Node { entries: group_b, is_leaf, parent: None, parent_entry_index: None })
    }

    fn supports_reinsert(&self) -> bool {
        true
    }

    /// Removes the `p = ceil(0.3 * (max_entries + 1))` entries whose
    /// centroid is farthest from the node's own centroid, for the
    /// caller to reinsert from the root.
    ///
    /// The centroid is computed over the node's entries as they stood
    /// *before* the entry that pushed it into overflow was added, not
    /// over all `M+1` entries: the overflowing entry is always the last
    /// one appended (`place_entry_at` pushes then checks overflow), so
    /// excluding it here matches the covering rectangle the original
    /// node presented to its parent right up until this overflow.
    fn reinsert_candidates(&self, tree: &mut Tree<T>, node_id: NodeId) -> Vec<Entry<T>> {
        let max_m = tree.max_entries();
        let p = ((0.3 * (max_m as f64 + 1.0)).ceil() as usize).max(1);

        let entries = std::mem::take(&mut tree.node_mut(node_id).entries);
        let prior = &entries[..entries.len() - 1];
        let center = Rect::bounding(prior.iter().map(|e| e.rect)).centroid();

        let mut order: Vec<usize> = (0..entries.len()).collect();
        order.sort_by(|&a, &b| {
            let da = dist_sq(entries[a].rect.centroid(), center);
            let db = dist_sq(entries[b].rect.centroid(), center);
            db.partial_cmp(&da).expect("centroid distances are never NaN")
        });

        let p = p.min(order.len());
        let mut slots: Vec<Option<Entry<T>>> = entries.into_iter().map(Some).collect();
        let removed: Vec<Entry<T>> = order[..p].iter().map(|&i| slots[i].take().unwrap()).collect();
        let kept: Vec<Entry<T>> = order[p..].iter().map(|&i| slots[i].take().unwrap()).collect();
        tree.node_mut(node_id).entries = kept;
        removed
    }
}

fn dist_sq(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    dx * dx + dy * dy
}

#[derive(Debug, Clone, PartialEq)]
struct Division {
    g1: Vec<usize>,
    g2: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

/// The four sort orders (min_x, max_x, min_y, max_y) of an overfull
/// node's entries, and the divisions they induce.
struct RStarStat {
    min_x_divisions: Vec<Division>,
    max_x_divisions: Vec<Division>,
    min_y_divisions: Vec<Division>,
    max_y_divisions: Vec<Division>,
}

impl RStarStat {
    fn compute(rects: &[Rect], m: usize, max_m: usize) -> RStarStat {
        let order_min_x = sort_order(rects, |r| (r.min_x, r.max_x));
        let order_max_x = sort_order(rects, |r| (r.max_x, r.min_x));
        let order_min_y = sort_order(rects, |r| (r.min_y, r.max_y));
        let order_max_y = sort_order(rects, |r| (r.max_y, r.min_y));
        RStarStat {
            min_x_divisions: divisions_for_order(&order_min_x, m, max_m),
            max_x_divisions: divisions_for_order(&order_max_x, m, max_m),
            min_y_divisions: divisions_for_order(&order_min_y, m, max_m),
            max_y_divisions: divisions_for_order(&order_max_y, m, max_m),
        }
    }

    fn axis_divisions(&self, axis: Axis) -> (&[Division], &[Division]) {
        match axis {
            Axis::X => (&self.min_x_divisions, &self.max_x_divisions),
            Axis::Y => (&self.min_y_divisions, &self.max_y_divisions),
        }
    }

    /// Sum of `perimeter(bbox(G1)) + perimeter(bbox(G2))` over every
    /// division induced by either sort order on `axis`, divisions
    /// un-deduplicated.
    fn axis_perimeter(&self, rects: &[Rect], axis: Axis) -> f64 {
        let (d1, d2) = self.axis_divisions(axis);
        d1.iter().chain(d2.iter()).map(|d| division_perimeter(d, rects)).sum()
    }

    /// The divisions induced by `axis`'s two sort orders, de-duplicated
    /// by group membership while preserving first-seen order.
    fn axis_unique_distributions(&self, axis: Axis) -> Vec<Division> {
        let (d1, d2) = self.axis_divisions(axis);
        let mut seen: Vec<Division> = Vec::new();
        for d in d1.iter().chain(d2.iter()) {
            if !seen.contains(d) {
                seen.push(d.clone());
            }
        }
        seen
    }
}

fn division_perimeter(d: &Division, rects: &[Rect]) -> f64 {
    let bbox1 = Rect::bounding(d.g1.iter().map(|&i| rects[i]));
    let bbox2 = Rect::bounding(d.g2.iter().map(|&i| rects[i]));
    bbox1.perimeter() + bbox2.perimeter()
}

fn sort_order(rects: &[Rect], key: impl Fn(&Rect) -> (f64, f64)) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..rects.len()).collect();
    idx.sort_by_key(|&i| {
        let (primary, secondary) = key(&rects[i]);
        (
            NotNan::new(primary).expect("rectangle bounds are never NaN"),
            NotNan::new(secondary).expect("rectangle bounds are never NaN"),
        )
    });
    idx
}

/// Every valid split position `i` with `m <= i <= k - m`, for an ordered
/// list of `k` entries.
pub(crate) fn get_possible_divisions(k: usize, m: usize, max_m: usize) -> Vec<usize> {
    debug_assert!(m <= max_m && max_m <= k, "invalid division bounds: m={} max_m={} k={}", m, max_m, k);
    if k < 2 * m {
        return Vec::new();
    }
    (m..=(k - m)).collect()
}

fn divisions_for_order(order: &[usize], m: usize, max_m: usize) -> Vec<Division> {
    get_possible_divisions(order.len(), m, max_m)
        .into_iter()
        .map(|i| {
            let mut g1 = order[..i].to_vec();
            let mut g2 = order[i..].to_vec();
            g1.sort_unstable();
            g2.sort_unstable();
            Division { g1, g2 }
        })
        .collect()
}

/// The axis with the smaller total perimeter sum; ties favor `x`.
fn choose_split_axis(stat: &RStarStat, rects: &[Rect]) -> Axis {
    let perimeter_x = stat.axis_perimeter(rects, Axis::X);
    let perimeter_y = stat.axis_perimeter(rects, Axis::Y);
    if perimeter_x <= perimeter_y {
        Axis::X
    } else {
        Axis::Y
    }
}

/// Index, within `distributions`, of the division with least overlap
/// between its two groups' bounding rectangles; ties favor the smaller
/// combined area, then the earliest index.
fn choose_split_index(distributions: &[Division], rects: &[Rect]) -> usize {
    let mut best = 0;
    let mut best_overlap = f64::INFINITY;
    let mut best_area_sum = f64::INFINITY;
    for (i, d) in distributions.iter().enumerate() {
        let bbox1 = Rect::bounding(d.g1.iter().map(|&idx| rects[idx]));
        let bbox2 = Rect::bounding(d.g2.iter().map(|&idx| rects[idx]));
        let overlap = bbox1.overlap(&bbox2);
        let area_sum = bbox1.area() + bbox2.area();
        if overlap < best_overlap || (overlap == best_overlap && area_sum < best_area_sum) {
            best = i;
            best_overlap = overlap;
            best_area_sum = area_sum;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn possible_divisions_match_m_and_k_bounds() {
        assert_eq!(get_possible_divisions(4, 1, 3), vec![1, 2, 3]);
        assert_eq!(get_possible_divisions(5, 2, 4), vec![2, 3]);
        assert_eq!(get_possible_divisions(5, 1, 4), vec![1, 2, 3, 4]);
    }

    #[test]
    fn split_axis_prefers_smaller_perimeter_sum() {
        let rects = vec![
            Rect::new(0.0, 0.0, 7.0, 2.0),
            Rect::new(1.0, 1.0, 2.0, 3.0),
            Rect::new(2.0, 2.0, 8.0, 4.0),
        ];
        let stat = RStarStat::compute(&rects, 1, 2);
        assert_eq!(stat.axis_perimeter(&rects, Axis::X), 140.0);
        assert_eq!(stat.axis_perimeter(&rects, Axis::Y), 148.0);
        assert_eq!(choose_split_axis(&stat, &rects), Axis::X);
    }

    #[test]
    fn split_groups_entries_by_least_overlap() {
        let rects = vec![
            Rect::new(0.0, 0.0, 7.0, 2.0),
            Rect::new(1.0, 1.0, 2.0, 3.0),
            Rect::new(2.0, 2.0, 8.0, 4.0),
        ];
        let stat = RStarStat::compute(&rects, 1, 2);
        let distributions = stat.axis_unique_distributions(Axis::X);
        let idx = choose_split_index(&distributions, &rects);
        let chosen = &distributions[idx];
        assert_eq!(chosen.g1, vec![1]);
        assert_eq!(chosen.g2, vec![0, 2]);
    }

    #[test]
    fn split_axis_picks_y_when_its_perimeter_sum_is_smaller() {
        let rects = vec![
            Rect::new(0.0, 0.0, 1.0, 1.0),
            Rect::new(1.0, 0.0, 2.0, 1.0),
            Rect::new(2.0, 0.0, 3.0, 1.0),
            Rect::new(1.0, 7.0, 2.0, 8.0),
        ];
        let stat = RStarStat::compute(&rects, 1, 3);
        assert_eq!(choose_split_axis(&stat, &rects), Axis::Y);
    }

    #[test]
    fn split_index_tie_breaks_on_smaller_combined_area() {
        let rects = vec![
            Rect::new(0.0, 0.0, 2.0, 1.0),
            Rect::new(1.0, 0.0, 3.0, 2.0),
            Rect::new(2.0, 2.0, 4.0, 3.0),
            Rect::new(9.0, 9.0, 10.0, 10.0),
        ];
        let stat = RStarStat::compute(&rects, 1, 3);
        let distributions = stat.axis_unique_distributions(choose_split_axis(&stat, &rects));
        assert_eq!(choose_split_index(&distributions, &rects), 2);
    }

    /// Pinned scenario: splitting a leaf root directly through the strategy
    /// trait leaves the original node holding the smaller optimal group and
    /// returns a sibling holding the rest, without touching parent linkage.
    #[test]
    fn split_leaves_smaller_group_in_place_and_returns_sibling() {
        let mut tree: Tree<&'static str> = Tree::with_rstar(1, 2).unwrap();
        let root = tree.root_id();
        tree.node_mut(root).entries = vec![
            Entry::leaf(0, Rect::new(0.0, 0.0, 7.0, 2.0), "a"),
            Entry::leaf(1, Rect::new(1.0, 1.0, 2.0, 3.0), "b"),
            Entry::leaf(2, Rect::new(2.0, 2.0, 8.0, 4.0), "c"),
        ];

        let strategy = RStarStrategy::new();
        let split_id = strategy.split(&mut tree, root);

        assert_eq!(tree.node(root).entries.len(), 1);
        assert_eq!(*tree.node(root).entries[0].data().unwrap(), "b");
        assert_eq!(tree.bounding_rect_of(root).unwrap(), Rect::new(1.0, 1.0, 2.0, 3.0));
        assert!(tree.node(root).is_leaf);

        assert_eq!(tree.node(split_id).entries.len(), 2);
        assert_eq!(tree.bounding_rect_of(split_id).unwrap(), Rect::new(0.0, 0.0, 8.0, 4.0));
        let split_data: std::collections::HashSet<_> = tree.node(split_id).entries.iter().map(|e| *e.data().unwrap()).collect();
        assert_eq!(split_data, ["a", "c"].into_iter().collect());
        assert!(tree.node(split_id).parent.is_none(), "adjust_tree, not split, wires parent linkage");
    }

    #[test]
    fn forced_reinsertion_removes_farthest_entries() {
        let mut tree: Tree<&'static str> = Tree::with_rstar(1, 3).unwrap();
        let root = tree.root_id();
        for (i, (label, rect)) in [
            ("center", Rect::new(4.0, 4.0, 5.0, 5.0)),
            ("near", Rect::new(4.5, 4.5, 5.5, 5.5)),
            ("far", Rect::new(0.0, 0.0, 0.1, 0.1)),
            ("farther", Rect::new(9.0, 9.0, 9.1, 9.1)),
        ]
        .into_iter()
        .enumerate()
        {
            tree.node_mut(root).entries.push(Entry::leaf(i as u64, rect, label));
        }
        let strategy = RStarStrategy::new();
        let removed = strategy.reinsert_candidates(&mut tree, root);
        let removed_labels: Vec<&str> = removed.iter().map(|e| *e.data().unwrap()).collect();
        assert!(removed_labels.contains(&"farther"));
    }
}
