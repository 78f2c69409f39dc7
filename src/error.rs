// Copyright 2016 spatial-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Error kinds reported by the tree's public API.

use thiserror::Error;

/// Failure modes of the R-tree's public operations.
///
/// `LogicInvariantViolation` should be unreachable in a correct build; it
/// exists so internal consistency checks have somewhere to report to
/// instead of panicking directly, and is only ever raised by
/// `cfg(debug_assertions)` assertions.
#[derive(Debug, Error, PartialEq)]
pub enum RTreeError {
    #[error("invalid rectangle: min ({min_x}, {min_y}) exceeds max ({max_x}, {max_y}) on some axis")]
    InvalidRectangle {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },

    #[error("invalid configuration: min_entries ({min_entries}) and max_entries ({max_entries}) must satisfy 1 <= min_entries <= ceil(max_entries/2) and max_entries >= 2")]
    InvalidConfiguration { min_entries: usize, max_entries: usize },

    #[error("internal invariant violated: {0}")]
    LogicInvariantViolation(String),
}
