// Copyright 2016 spatial-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The node/entry data model: a sum-typed `Entry` (leaf vs. internal) and
//! a `Node` that owns an ordered, order-insignificant sequence of them.
//!
//! Nodes live in the tree's arena (`Tree::nodes`) and refer to each other
//! by `NodeId` rather than by owning pointers, which is what lets a node
//! carry a non-owning `parent` back-reference without an ownership cycle.

use crate::geometry::Rect;

/// Index into `Tree::nodes`. Never reused within a tree's lifetime: nodes
/// are appended by insert/split and never removed (deletion is out of
/// scope), so a `NodeId` stays valid for as long as the tree lives.
pub type NodeId = usize;

/// The payload of an `Entry`: opaque data on a leaf entry, or an owning
/// reference to the child node on an internal entry. Sum-typed rather
/// than two structs sharing null fields.
#[derive(Debug, Clone)]
pub enum EntryKind<T> {
    Leaf(T),
    Internal(NodeId),
}

/// An element stored inside a `Node`: a bounding rectangle plus either
/// opaque leaf data or a child node reference.
///
/// `id` is a tree-unique, monotonically-assigned tag used only so
/// `Tree::insert` can relocate the entry it just created after it has
/// potentially moved nodes under a split or forced reinsertion; it
/// carries no other meaning and entries are otherwise compared by
/// content, not identity.
#[derive(Debug, Clone)]
pub struct Entry<T> {
    pub rect: Rect,
    pub kind: EntryKind<T>,
    pub(crate) id: u64,
}

impl<T> Entry<T> {
    pub fn leaf(id: u64, rect: Rect, data: T) -> Entry<T> {
        Entry { rect, kind: EntryKind::Leaf(data), id }
    }

    pub fn internal(id: u64, rect: Rect, child: NodeId) -> Entry<T> {
        Entry { rect, kind: EntryKind::Internal(child), id }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, EntryKind::Leaf(_))
    }

    pub fn data(&self) -> Option<&T> {
        match &self.kind {
            EntryKind::Leaf(data) => Some(data),
            EntryKind::Internal(_) => None,
        }
    }

    pub fn child(&self) -> Option<NodeId> {
        match &self.kind {
            EntryKind::Leaf(_) => None,
            EntryKind::Internal(id) => Some(*id),
        }
    }
}

/// A container of entries at a fixed depth in the tree.
///
/// Entry order inside a node is not semantically significant; every
/// algorithm here treats `entries` as an unordered multiset except where
/// a split explicitly documents it preserves a sort order.
#[derive(Debug, Clone)]
pub struct Node<T> {
    pub entries: Vec<Entry<T>>,
    pub is_leaf: bool,
    /// Absent at the root. Non-owning: `parent` points into the same
    /// arena the tree owns, it does not extend the node's lifetime.
    pub parent: Option<NodeId>,
    /// Index, within `parent`'s `entries`, of the internal entry whose
    /// `child` is this node. Kept in lock-step with `parent` so that
    /// `node.parent_entry.child == node` and
    /// `node.parent_entry ∈ node.parent.entries` both hold whenever
    /// `parent` is `Some`.
    pub parent_entry_index: Option<usize>,
}

impl<T> Node<T> {
    pub fn new_leaf() -> Node<T> {
        Node { entries: Vec::new(), is_leaf: true, parent: None, parent_entry_index: None }
    }

    pub fn new_internal(entries: Vec<Entry<T>>) -> Node<T> {
        Node { entries, is_leaf: false, parent: None, parent_entry_index: None }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Bounding rectangle of the node: the union of its entries'
    /// rectangles, computed on demand. `None` for an empty node (only
    /// possible for an empty root).
    pub fn bounding_rect(&self) -> Option<Rect> {
        let mut entries = self.entries.iter();
        let mut bbox = entries.next()?.rect;
        for e in entries {
            bbox = bbox.union(&e.rect);
        }
        Some(bbox)
    }
}

/// A stable reference to a leaf entry returned by `Tree::insert`, and the
/// handle type used for all `Entry` introspection, since entries live in
/// arena-owned nodes rather than being returned by value or reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHandle {
    pub node: NodeId,
    pub index: usize,
}
