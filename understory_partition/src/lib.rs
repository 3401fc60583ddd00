// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_partition --heading-base-level=0

//! Understory Partition: two-dimensional partitioning of objects by point.
//!
//! Understory Partition answers "which objects lie inside this rectangle or
//! circle" without scanning every stored object. It is meant for interactive
//! workloads such as hit-testing or visibility culling where many objects move
//! every frame.
//!
//! - Objects are caller-supplied identities (`Copy + Eq + Hash`), each placed at
//!   a point read through a [`Locate`] extractor.
//! - Points are bucketed in a uniform [`Grid`] of square cells; a query touches
//!   only the cells overlapping its region and then applies the exact test.
//! - [`SpacePartition::add`] inserts an object or re-indexes it after a move;
//!   [`SpacePartition::remove`] drops it.
//! - [`SpacePartition::visit_inside_rect`] and
//!   [`SpacePartition::visit_within_radius`] call back once per match and stop
//!   as soon as the callback returns `false`.
//!
//! It is generic over the scalar type `T` (`f32`, `f64`, `i64`) and does not
//! depend on any geometry crate; enable the `kurbo` feature for conversions
//! from `kurbo::Point` and `kurbo::Rect`.
//!
//! # Example
//!
//! ```rust
//! use understory_partition::{PartitionConfig, Point2D, Rect2D, SpacePartition};
//!
//! let points = [Point2D::new(5.0, 5.0), Point2D::new(25.0, 25.0)];
//! let config = PartitionConfig::new(10.0).unwrap();
//! let mut part = SpacePartition::new(config, |i: &usize| points[*i]);
//! part.add(0);
//! part.add(1);
//!
//! // Only the first object is inside the first cell.
//! let mut hits = Vec::new();
//! part.visit_inside_rect(Rect2D::new(0.0, 0.0, 10.0, 10.0), |o| {
//!     hits.push(o);
//!     true
//! });
//! assert_eq!(hits, [0]);
//!
//! // Both are within 30 units of (5, 5).
//! assert_eq!(part.count_within_radius(30.0, Point2D::new(5.0, 5.0)), 2);
//!
//! // Stop after the first match.
//! let mut calls = 0;
//! part.visit_within_radius(30.0, Point2D::new(5.0, 5.0), |_| {
//!     calls += 1;
//!     false
//! });
//! assert_eq!(calls, 1);
//! ```
//!
//! ## Keeping up with moves
//!
//! With the default [`Manual`] source, call [`SpacePartition::add`] again after
//! moving an object. To have moves picked up from notifications instead, build
//! the partition with [`SpacePartition::observing`] and a [`ChangeSource`]
//! such as [`ChangeQueue`], report moves through its [`ChangeNotifier`], and
//! call [`SpacePartition::sync`] before querying:
//!
//! ```rust
//! use std::cell::Cell;
//! use understory_partition::{ChangeQueue, PartitionConfig, Point2D, SpacePartition};
//!
//! let xs = [Cell::new(1_i64), Cell::new(2)];
//! let queue = ChangeQueue::new();
//! let notifier = queue.notifier();
//! let config = PartitionConfig::new(16).unwrap();
//! let locate = |i: &usize| Point2D::new(xs[*i].get(), 0);
//! let mut part = SpacePartition::observing(config, locate, queue);
//! part.add(0);
//! part.add(1);
//!
//! // The host moves object 1 and reports it.
//! xs[1].set(100);
//! notifier.notify(1);
//! assert_eq!(part.sync(), 1);
//! assert_eq!(part.position(1), Some(Point2D::new(100, 0)));
//!
//! // Removal unsubscribes: later reports are dropped.
//! part.remove(1);
//! assert!(!notifier.notify(1));
//! ```
//!
//! ## Choosing a cell size
//!
//! The cell size is the main tuning knob and has no default. A query visits
//! every cell its bounding rectangle overlaps, so cells much smaller than the
//! typical query mean many empty probes, and cells much larger mean many
//! candidates rejected by the exact test. A size close to the usual query
//! rectangle side or circle diameter is a good start.
//!
//! ### Float semantics
//!
//! This crate assumes no NaNs for floating-point coordinates. Debug builds may assert.
//! Coordinates far outside the `i32` range of cells saturate into the border cells.

#![no_std]

extern crate alloc;

mod config;
mod extract;
pub mod grid;
mod observe;
mod partition;
mod types;

pub use config::{ConfigError, PartitionConfig};
pub use extract::{Explicit, Locate};
pub use grid::{CellCoord, CellRange, Grid, GridScalar};
pub use observe::{ChangeNotifier, ChangeQueue, ChangeSource, Manual};
pub use partition::{
    Added, SpacePartition, SpacePartitionF32, SpacePartitionF64, SpacePartitionI64,
};
pub use types::{Point2D, Rect2D, RectEdges, Scalar, ScalarAcc};

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn two_objects_rect_and_circle() {
        let points = [Point2D::new(5.0, 5.0), Point2D::new(25.0, 25.0)];
        let mut part = SpacePartition::new(PartitionConfig::new(10.0).unwrap(), |i: &usize| {
            points[*i]
        });
        part.add(0);
        part.add(1);

        let mut hits: Vec<_> = part
            .query_inside_rect(Rect2D::new(0.0, 0.0, 10.0, 10.0))
            .map(|(o, _)| o)
            .collect();
        assert_eq!(hits, [0]);

        hits = part
            .query_within_radius(30.0, Point2D::new(5.0, 5.0))
            .map(|(o, _)| o)
            .collect();
        hits.sort_unstable();
        assert_eq!(hits, [0, 1]);
    }

    #[test]
    fn remove_then_query_is_empty() {
        let mut part = SpacePartition::explicit(PartitionConfig::new(8_i64).unwrap());
        part.add_at(1_u32, Point2D::new(3, 3));
        assert!(part.remove(1));
        assert!(!part.remove(1));
        assert_eq!(part.count_inside_rect(Rect2D::new(0, 0, 8, 8)), 0);
        assert_eq!(part.bucket_count(), 0);
    }
}
