// Copyright 2016 spatial-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A 2-D R-tree with two pluggable insertion strategies: Guttman's
//! original quadratic-cost algorithm and R* (Beckmann, Kriegel,
//! Schneider, Seeger).
//!
//! ```
//! use spatial::{Rect, RTree};
//!
//! let mut tree: RTree<&'static str> = RTree::with_rstar(2, 4).unwrap();
//! tree.insert("downtown", Rect::new(0.0, 0.0, 2.0, 2.0)).unwrap();
//! let hits: Vec<_> = tree.query(Rect::new(1.0, 1.0, 3.0, 3.0)).unwrap().collect();
//! assert_eq!(hits.len(), 1);
//! ```

mod error;
mod geometry;
mod node;
mod strategy;
mod tree;

pub use error::RTreeError;
pub use geometry::Rect;
pub use node::{Entry, EntryHandle, EntryKind, Node, NodeId};
pub use strategy::guttman::GuttmanStrategy;
pub use strategy::rstar::RStarStrategy;
pub use strategy::{Strategy, StrategyOps};
pub use tree::{QueryIter, Tree as RTree};
