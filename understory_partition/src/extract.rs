// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Position extraction for stored objects.

use crate::types::Point2D;

/// Maps an object identity to its current point.
///
/// The partition calls this on every [`add`][crate::SpacePartition::add] and
/// on every change notification. Implementations must not fail for an object
/// that is, or is about to be, stored, and must not reach back into the
/// partition.
///
/// Any `Fn(&O) -> Point2D<T>` closure is a `Locate`:
///
/// ```rust
/// use understory_partition::{Locate, Point2D};
///
/// let centers = [Point2D::new(1.0, 2.0), Point2D::new(3.0, 4.0)];
/// let locate = |i: &usize| centers[*i];
/// let second: usize = 1;
/// assert_eq!(locate.locate(&second), Point2D::new(3.0, 4.0));
/// ```
pub trait Locate<O, T> {
    /// The current point of `object`.
    fn locate(&self, object: &O) -> Point2D<T>;
}

impl<O, T, F> Locate<O, T> for F
where
    F: Fn(&O) -> Point2D<T>,
{
    #[inline]
    fn locate(&self, object: &O) -> Point2D<T> {
        self(object)
    }
}

/// Marker for partitions that have no extractor.
///
/// Built by [`SpacePartition::explicit`][crate::SpacePartition::explicit].
/// `Explicit` does not implement [`Locate`], so such a partition only accepts
/// positions through [`add_at`][crate::SpacePartition::add_at].
///
/// ```rust
/// use understory_partition::{PartitionConfig, Point2D, SpacePartition};
///
/// let mut part = SpacePartition::explicit(PartitionConfig::new(4_i64).unwrap());
/// part.add_at(7_u32, Point2D::new(9, 2));
/// assert_eq!(part.count_within_radius(1, Point2D::new(9, 3)), 1);
/// ```
///
/// There is nothing to re-read a position from, so `add` does not compile:
///
/// ```compile_fail
/// use understory_partition::{PartitionConfig, SpacePartition};
///
/// let mut part = SpacePartition::explicit(PartitionConfig::new(4_i64).unwrap());
/// part.add(7_u32);
/// ```
#[derive(Copy, Clone, Debug, Default)]
pub struct Explicit;
