// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public `SpacePartition` API: identity bookkeeping, update protocol and range queries.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;
use core::ops::ControlFlow;

use hashbrown::HashMap;

use crate::config::PartitionConfig;
use crate::extract::{Explicit, Locate};
use crate::grid::{CellCoord, Grid, GridScalar};
use crate::observe::{ChangeSource, Manual};
use crate::types::{Point2D, Rect2D};

/// What an [`add`][SpacePartition::add] did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Added {
    /// The object was not stored before.
    Inserted,
    /// The object was stored and changed cell.
    Moved,
    /// The object was stored and stayed in its cell; only its position was refreshed.
    Refreshed,
}

#[derive(Copy, Clone, Debug)]
struct Entry<T> {
    position: Point2D<T>,
    cell: CellCoord,
}

/// Two-dimensional partition of objects by point.
///
/// Objects are identified by a caller-supplied `O` (an entity id, an arena
/// index, a generational key) and positioned by the `X` extractor. The
/// partition never owns or dereferences the objects themselves; removing an
/// object before its identity becomes invalid is the caller's job.
///
/// `S` selects how moves are picked up. With [`Manual`] (the default) the
/// caller calls [`add`][Self::add] again after moving an object. With an
/// observing source, see [`observing`][Self::observing] and [`sync`][Self::sync].
/// Notifications are only applied by `sync` or
/// [`notify_changed`][Self::notify_changed]: queries never apply them, so a
/// query made between a move being reported and the next `sync` still sees
/// the object at its previously recorded position.
///
/// Queries borrow the partition immutably, so a query callback cannot add or
/// remove objects.
pub struct SpacePartition<T: GridScalar, O, X, S = Manual> {
    config: PartitionConfig<T>,
    grid: Grid<T, O>,
    entries: HashMap<O, Entry<T>>,
    locate: X,
    source: S,
}

impl<T: GridScalar, O, X, S> Debug for SpacePartition<T, O, X, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpacePartition")
            .field("config", &self.config)
            .field("grid", &self.grid)
            .field("len", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl<T, O, X> SpacePartition<T, O, X, Manual>
where
    T: GridScalar,
    O: Copy + Eq + Hash + Debug,
    X: Locate<O, T>,
{
    /// Create an empty partition that re-indexes only on explicit [`add`][Self::add].
    pub fn new(config: PartitionConfig<T>, locate: X) -> Self {
        Self::with_parts(config, locate, Manual)
    }
}

impl<T, O> SpacePartition<T, O, Explicit, Manual>
where
    T: GridScalar,
    O: Copy + Eq + Hash + Debug,
{
    /// Create an empty partition whose positions are always passed to
    /// [`add_at`][Self::add_at].
    ///
    /// Such a partition has no extractor, so [`add`][SpacePartition::add],
    /// [`sync`][SpacePartition::sync] and
    /// [`notify_changed`][SpacePartition::notify_changed] are not available on
    /// it.
    pub fn explicit(config: PartitionConfig<T>) -> Self {
        Self::with_parts(config, Explicit, Manual)
    }
}

impl<T, O, X, S> SpacePartition<T, O, X, S>
where
    T: GridScalar,
    O: Copy + Eq + Hash + Debug,
    X: Locate<O, T>,
    S: ChangeSource<O>,
{
    /// Create an empty partition that subscribes added objects with `source`.
    ///
    /// Call [`sync`][Self::sync] to apply the changes the source has collected.
    pub fn observing(config: PartitionConfig<T>, locate: X, source: S) -> Self {
        Self::with_parts(config, locate, source)
    }

    /// Insert `object`, or bring its bucket up to date with its current position.
    ///
    /// Calling this again at an unchanged position changes nothing.
    pub fn add(&mut self, object: O) -> Added {
        let position = self.locate.locate(&object);
        self.add_at(object, position)
    }

    /// Re-index `object` after its position changed.
    ///
    /// Objects that are not stored are ignored and yield `None`; a late
    /// notification must not resurrect a removed object.
    pub fn notify_changed(&mut self, object: O) -> Option<Added> {
        if !self.entries.contains_key(&object) {
            log::debug!("partition: change for unknown object {object:?} ignored");
            return None;
        }
        Some(self.add(object))
    }

    /// Apply every change the source has collected. Returns how many objects moved cell.
    pub fn sync(&mut self) -> usize {
        let mut changed = Vec::new();
        self.source.drain(|o| changed.push(o));
        let mut moved = 0;
        for object in changed {
            if self.notify_changed(object) == Some(Added::Moved) {
                moved += 1;
            }
        }
        if moved > 0 {
            log::trace!("partition: sync moved {moved} objects");
        }
        moved
    }
}

impl<T, O, X, S> SpacePartition<T, O, X, S>
where
    T: GridScalar,
    O: Copy + Eq + Hash + Debug,
    S: ChangeSource<O>,
{
    fn with_parts(config: PartitionConfig<T>, locate: X, source: S) -> Self {
        let (origin_x, origin_y) = config.origin();
        Self {
            config,
            grid: Grid::with_origin(config.cell_size(), origin_x, origin_y),
            entries: HashMap::new(),
            locate,
            source,
        }
    }

    /// The options this partition was built with.
    pub fn config(&self) -> &PartitionConfig<T> {
        &self.config
    }

    /// Side length of a grid cell.
    pub fn cell_size(&self) -> T {
        self.config.cell_size()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no objects are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of non-empty grid cells.
    pub fn bucket_count(&self) -> usize {
        self.grid.bucket_count()
    }

    /// Whether `object` is stored.
    pub fn contains(&self, object: O) -> bool {
        self.entries.contains_key(&object)
    }

    /// The position recorded for `object` at its last add or sync.
    pub fn position(&self, object: O) -> Option<Point2D<T>> {
        self.entries.get(&object).map(|e| e.position)
    }

    /// The cell `object` is currently bucketed in.
    pub fn cell(&self, object: O) -> Option<CellCoord> {
        self.entries.get(&object).map(|e| e.cell)
    }

    /// Iterate stored objects with their recorded positions, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (O, Point2D<T>)> + '_ {
        self.entries.iter().map(|(&o, e)| (o, e.position))
    }

    /// The change source.
    pub fn change_source(&self) -> &S {
        &self.source
    }

    /// The change source, mutably.
    pub fn change_source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Reserve space for at least `n` more objects.
    pub fn reserve(&mut self, n: usize) {
        self.entries.reserve(n);
    }

    /// Insert `object` at `position`, or move it there.
    ///
    /// Follows the same protocol as [`add`][Self::add], with the position
    /// supplied by the caller instead of the extractor.
    pub fn add_at(&mut self, object: O, position: Point2D<T>) -> Added {
        let cell = self.grid.cell_of(position);
        let added = match self.entries.get_mut(&object) {
            None => {
                self.grid.insert(object, cell);
                self.entries.insert(object, Entry { position, cell });
                self.source.subscribe(object);
                log::trace!("partition: insert {object:?} into cell {cell:?}");
                Added::Inserted
            }
            Some(entry) if entry.cell == cell => {
                entry.position = position;
                Added::Refreshed
            }
            Some(entry) => {
                let old = entry.cell;
                entry.position = position;
                entry.cell = cell;
                let erased = self.grid.erase(object, old);
                debug_assert!(erased, "{object:?} missing from its cell {old:?}");
                self.grid.insert(object, cell);
                log::trace!("partition: move {object:?} from cell {old:?} to {cell:?}");
                Added::Moved
            }
        };
        self.debug_check(object);
        added
    }

    /// Remove `object`. Returns whether it was stored.
    pub fn remove(&mut self, object: O) -> bool {
        let Some(entry) = self.entries.remove(&object) else {
            return false;
        };
        let erased = self.grid.erase(object, entry.cell);
        debug_assert!(erased, "{object:?} missing from its cell {:?}", entry.cell);
        self.source.unsubscribe(object);
        log::trace!("partition: remove {object:?} from cell {:?}", entry.cell);
        debug_assert!(
            !self.grid.bucket(entry.cell).contains(&object),
            "{object:?} still bucketed after removal"
        );
        true
    }

    /// Remove every object, unsubscribing each from the change source.
    pub fn clear(&mut self) {
        for &object in self.entries.keys() {
            self.source.unsubscribe(object);
        }
        if !self.entries.is_empty() {
            log::debug!("partition: clear {} objects", self.entries.len());
        }
        self.entries.clear();
        self.grid.clear();
    }

    /// Visit objects whose position lies in `rect` until `f` returns `false`.
    ///
    /// Containment follows the configured [`RectEdges`][crate::RectEdges]
    /// rule. The order is unspecified. Returns `false` if `f` stopped the
    /// enumeration, `true` if every match was visited.
    pub fn visit_inside_rect<F: FnMut(O) -> bool>(&self, rect: Rect2D<T>, mut f: F) -> bool {
        self.matches_inside_rect(rect, |object, _| flow(f(object)))
    }

    /// Visit objects within `radius` of `center`, boundary included, until `f` returns `false`.
    ///
    /// A negative radius matches nothing. Returns `false` if `f` stopped the
    /// enumeration, `true` otherwise.
    pub fn visit_within_radius<F: FnMut(O) -> bool>(
        &self,
        radius: T,
        center: Point2D<T>,
        mut f: F,
    ) -> bool {
        self.matches_within_radius(radius, center, |object, _| flow(f(object)))
    }

    /// Objects inside `rect` with their positions.
    pub fn query_inside_rect(&self, rect: Rect2D<T>) -> impl Iterator<Item = (O, Point2D<T>)> {
        let mut out = Vec::new();
        self.matches_inside_rect(rect, |object, p| {
            out.push((object, p));
            ControlFlow::Continue(())
        });
        out.into_iter()
    }

    /// Objects within `radius` of `center` with their positions.
    pub fn query_within_radius(
        &self,
        radius: T,
        center: Point2D<T>,
    ) -> impl Iterator<Item = (O, Point2D<T>)> {
        let mut out = Vec::new();
        self.matches_within_radius(radius, center, |object, p| {
            out.push((object, p));
            ControlFlow::Continue(())
        });
        out.into_iter()
    }

    /// Any one object inside `rect`.
    pub fn first_inside_rect(&self, rect: Rect2D<T>) -> Option<O> {
        let mut found = None;
        self.visit_inside_rect(rect, |o| {
            found = Some(o);
            false
        });
        found
    }

    /// Any one object within `radius` of `center`.
    pub fn first_within_radius(&self, radius: T, center: Point2D<T>) -> Option<O> {
        let mut found = None;
        self.visit_within_radius(radius, center, |o| {
            found = Some(o);
            false
        });
        found
    }

    /// Number of objects inside `rect`.
    pub fn count_inside_rect(&self, rect: Rect2D<T>) -> usize {
        let mut n = 0;
        self.visit_inside_rect(rect, |_| {
            n += 1;
            true
        });
        n
    }

    /// Number of objects within `radius` of `center`.
    pub fn count_within_radius(&self, radius: T, center: Point2D<T>) -> usize {
        let mut n = 0;
        self.visit_within_radius(radius, center, |_| {
            n += 1;
            true
        });
        n
    }

    fn matches_inside_rect<F>(&self, rect: Rect2D<T>, mut f: F) -> bool
    where
        F: FnMut(O, Point2D<T>) -> ControlFlow<()>,
    {
        if rect.is_inverted() {
            return true;
        }
        let edges = self.config.edges();
        self.visit_candidates(&rect, |object, p| {
            if edges.contains(&rect, p) {
                f(object, p)
            } else {
                ControlFlow::Continue(())
            }
        })
    }

    fn matches_within_radius<F>(&self, radius: T, center: Point2D<T>, mut f: F) -> bool
    where
        F: FnMut(O, Point2D<T>) -> ControlFlow<()>,
    {
        if radius < T::zero() {
            return true;
        }
        let limit = T::sum_of_squares(T::abs_diff(radius, T::zero()), Default::default());
        self.visit_candidates(&Rect2D::around(center, radius), |object, p| {
            if p.distance_squared(center) <= limit {
                f(object, p)
            } else {
                ControlFlow::Continue(())
            }
        })
    }

    fn visit_candidates<F>(&self, bounds: &Rect2D<T>, mut f: F) -> bool
    where
        F: FnMut(O, Point2D<T>) -> ControlFlow<()>,
    {
        let range = self.grid.cells_overlapping(bounds);
        self.grid
            .visit_candidates(range, |object| {
                let entry = self.entries.get(&object);
                debug_assert!(entry.is_some(), "{object:?} bucketed without an entry");
                entry.map_or(ControlFlow::Continue(()), |e| f(object, e.position))
            })
            .is_continue()
    }

    /// Check the entry/bucket agreement for one object in debug builds.
    #[inline]
    fn debug_check(&self, object: O) {
        if cfg!(debug_assertions)
            && let Some(entry) = self.entries.get(&object)
        {
            debug_assert_eq!(
                entry.cell,
                self.grid.cell_of(entry.position),
                "{object:?} is filed under a stale cell"
            );
            let copies = self
                .grid
                .bucket(entry.cell)
                .iter()
                .filter(|&&o| o == object)
                .count();
            debug_assert_eq!(copies, 1, "{object:?} appears {copies} times in its bucket");
        }
    }

    /// Walk the whole partition and assert the entry/bucket invariant.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let mut bucketed = 0;
        for (cell, bucket) in self.grid.buckets() {
            assert!(!bucket.is_empty(), "empty bucket retained at {cell:?}");
            for object in bucket {
                let entry = self
                    .entries
                    .get(object)
                    .unwrap_or_else(|| panic!("{object:?} bucketed without an entry"));
                assert_eq!(entry.cell, cell, "{object:?} bucketed in the wrong cell");
                assert_eq!(entry.cell, self.grid.cell_of(entry.position));
            }
            bucketed += bucket.len();
        }
        assert_eq!(bucketed, self.entries.len(), "bucket and entry counts differ");
    }
}

impl<T, O, X, S> Extend<O> for SpacePartition<T, O, X, S>
where
    T: GridScalar,
    O: Copy + Eq + Hash + Debug,
    X: Locate<O, T>,
    S: ChangeSource<O>,
{
    fn extend<I: IntoIterator<Item = O>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for object in iter {
            self.add(object);
        }
    }
}

#[inline]
fn flow(keep_going: bool) -> ControlFlow<()> {
    if keep_going {
        ControlFlow::Continue(())
    } else {
        ControlFlow::Break(())
    }
}

/// Partition over `f32` coordinates.
pub type SpacePartitionF32<O, X, S = Manual> = SpacePartition<f32, O, X, S>;
/// Partition over `f64` coordinates.
pub type SpacePartitionF64<O, X, S = Manual> = SpacePartition<f64, O, X, S>;
/// Partition over `i64` coordinates.
pub type SpacePartitionI64<O, X, S = Manual> = SpacePartition<i64, O, X, S>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::ChangeQueue;
    use crate::types::RectEdges;
    use alloc::vec;
    use core::cell::Cell;

    /// Host-side positions the extractor reads through.
    struct World {
        points: Vec<Cell<Point2D<f64>>>,
    }

    impl World {
        fn new(points: &[(f64, f64)]) -> Self {
            Self {
                points: points.iter().map(|&p| Cell::new(p.into())).collect(),
            }
        }

        fn locate(&self) -> impl Fn(&usize) -> Point2D<f64> + '_ {
            move |i: &usize| self.points[*i].get()
        }

        fn set(&self, i: usize, x: f64, y: f64) {
            self.points[i].set(Point2D::new(x, y));
        }
    }

    fn config(cell_size: f64) -> PartitionConfig<f64> {
        PartitionConfig::new(cell_size).unwrap()
    }

    fn sorted(mut v: Vec<usize>) -> Vec<usize> {
        v.sort_unstable();
        v
    }

    fn in_rect<X: Locate<usize, f64>, S: ChangeSource<usize>>(
        part: &SpacePartition<f64, usize, X, S>,
        rect: Rect2D<f64>,
    ) -> Vec<usize> {
        let mut out = Vec::new();
        part.visit_inside_rect(rect, |o| {
            out.push(o);
            true
        });
        sorted(out)
    }

    fn in_circle<X: Locate<usize, f64>, S: ChangeSource<usize>>(
        part: &SpacePartition<f64, usize, X, S>,
        radius: f64,
        center: Point2D<f64>,
    ) -> Vec<usize> {
        let mut out = Vec::new();
        part.visit_within_radius(radius, center, |o| {
            out.push(o);
            true
        });
        sorted(out)
    }

    #[test]
    fn scenario_two_objects() {
        let world = World::new(&[(5.0, 5.0), (25.0, 25.0)]);
        let mut part = SpacePartition::new(config(10.0), world.locate());
        assert_eq!(part.add(0), Added::Inserted);
        assert_eq!(part.add(1), Added::Inserted);

        assert_eq!(in_rect(&part, Rect2D::new(0.0, 0.0, 10.0, 10.0)), vec![0]);
        assert_eq!(in_circle(&part, 30.0, Point2D::new(5.0, 5.0)), vec![0, 1]);
        part.assert_consistent();
    }

    #[test]
    fn add_then_query_round_trips() {
        let world = World::new(&[(-3.5, 17.25)]);
        let mut part = SpacePartition::new(config(4.0), world.locate());
        part.add(0);
        assert_eq!(in_rect(&part, Rect2D::new(-4.0, 17.0, -3.0, 18.0)), vec![0]);
        assert_eq!(part.position(0), Some(Point2D::new(-3.5, 17.25)));
        assert_eq!(part.cell(0), Some(CellCoord::new(-1, 4)));
    }

    #[test]
    fn re_add_at_same_position_is_idempotent() {
        let world = World::new(&[(1.0, 1.0), (2.0, 2.0)]);
        let mut part = SpacePartition::new(config(10.0), world.locate());
        part.add(0);
        part.add(1);
        let before = in_rect(&part, Rect2D::new(0.0, 0.0, 5.0, 5.0));

        assert_eq!(part.add(0), Added::Refreshed);
        assert_eq!(part.add(0), Added::Refreshed);
        assert_eq!(part.len(), 2);
        assert_eq!(part.bucket_count(), 1);
        assert_eq!(in_rect(&part, Rect2D::new(0.0, 0.0, 5.0, 5.0)), before);
        part.assert_consistent();
    }

    #[test]
    fn move_within_cell_refreshes_position() {
        let world = World::new(&[(1.0, 1.0)]);
        let mut part = SpacePartition::new(config(10.0), world.locate());
        part.add(0);
        world.set(0, 8.0, 8.0);
        assert_eq!(part.add(0), Added::Refreshed);
        assert!(in_rect(&part, Rect2D::new(0.0, 0.0, 2.0, 2.0)).is_empty());
        assert_eq!(in_rect(&part, Rect2D::new(7.0, 7.0, 9.0, 9.0)), vec![0]);
    }

    #[test]
    fn move_across_cells_migrates_bucket() {
        let world = World::new(&[(5.0, 5.0)]);
        let mut part = SpacePartition::new(config(10.0), world.locate());
        let r1 = Rect2D::new(0.0, 0.0, 9.0, 9.0);
        let r2 = Rect2D::new(40.0, 40.0, 60.0, 60.0);
        part.add(0);
        assert_eq!(in_rect(&part, r1), vec![0]);
        assert!(in_rect(&part, r2).is_empty());

        world.set(0, 50.0, 50.0);
        assert_eq!(part.add(0), Added::Moved);
        assert!(in_rect(&part, r1).is_empty());
        assert_eq!(in_rect(&part, r2), vec![0]);
        assert_eq!(part.bucket_count(), 1, "old bucket is dropped");
        part.assert_consistent();
    }

    #[test]
    fn stale_without_re_add() {
        let world = World::new(&[(5.0, 5.0)]);
        let mut part = SpacePartition::new(config(10.0), world.locate());
        part.add(0);
        world.set(0, 50.0, 50.0);
        // Manual mode: nothing happens until the caller re-adds.
        assert_eq!(in_rect(&part, Rect2D::new(0.0, 0.0, 9.0, 9.0)), vec![0]);
        assert_eq!(part.sync(), 0);
        assert_eq!(in_rect(&part, Rect2D::new(0.0, 0.0, 9.0, 9.0)), vec![0]);
    }

    #[test]
    fn remove_reports_presence_once() {
        let world = World::new(&[(5.0, 5.0), (6.0, 6.0)]);
        let mut part = SpacePartition::new(config(10.0), world.locate());
        part.add(0);
        part.add(1);
        assert!(part.remove(0));
        assert!(!part.remove(0));
        assert!(!part.contains(0));
        assert_eq!(in_rect(&part, Rect2D::new(0.0, 0.0, 10.0, 10.0)), vec![1]);
        assert_eq!(in_circle(&part, 100.0, Point2D::new(0.0, 0.0)), vec![1]);
        assert!(!part.remove(42), "never-added objects are not found");
        part.assert_consistent();
    }

    #[test]
    fn early_stop_invokes_callback_once() {
        let world = World::new(&[(1.0, 1.0), (2.0, 2.0), (30.0, 30.0)]);
        let mut part = SpacePartition::new(config(10.0), world.locate());
        part.extend([0, 1, 2]);

        let mut calls = 0;
        let completed = part.visit_inside_rect(Rect2D::new(0.0, 0.0, 100.0, 100.0), |_| {
            calls += 1;
            false
        });
        assert!(!completed);
        assert_eq!(calls, 1);

        calls = 0;
        let completed = part.visit_within_radius(100.0, Point2D::new(0.0, 0.0), |_| {
            calls += 1;
            false
        });
        assert!(!completed);
        assert_eq!(calls, 1);

        let completed = part.visit_inside_rect(Rect2D::new(0.0, 0.0, 100.0, 100.0), |_| true);
        assert!(completed);
    }

    #[test]
    fn circle_boundary_is_inclusive() {
        let world = World::new(&[(3.0, 4.0), (3.0, 4.0 + 1e-9)]);
        let mut part = SpacePartition::new(config(2.0), world.locate());
        part.extend([0, 1]);
        assert_eq!(in_circle(&part, 5.0, Point2D::new(0.0, 0.0)), vec![0]);
    }

    #[test]
    fn circle_excludes_bounding_square_corners() {
        let world = World::new(&[(9.0, 9.0), (0.0, 10.0)]);
        let mut part = SpacePartition::new(config(5.0), world.locate());
        part.extend([0, 1]);
        assert_eq!(in_circle(&part, 10.0, Point2D::new(0.0, 0.0)), vec![1]);
    }

    #[test]
    fn zero_area_regions_match_exact_points() {
        let world = World::new(&[(5.0, 5.0), (5.0, 6.0)]);
        let mut part = SpacePartition::new(config(10.0), world.locate());
        part.extend([0, 1]);
        assert_eq!(in_rect(&part, Rect2D::new(5.0, 5.0, 5.0, 5.0)), vec![0]);
        assert_eq!(in_circle(&part, 0.0, Point2D::new(5.0, 6.0)), vec![1]);
        assert!(in_circle(&part, 0.0, Point2D::new(5.0, 5.5)).is_empty());
    }

    #[test]
    fn empty_and_degenerate_queries() {
        let world = World::new(&[(5.0, 5.0)]);
        let mut part = SpacePartition::new(config(10.0), world.locate());
        assert!(in_rect(&part, Rect2D::new(0.0, 0.0, 10.0, 10.0)).is_empty());

        part.add(0);
        assert!(in_circle(&part, -1.0, Point2D::new(5.0, 5.0)).is_empty());
        assert!(in_rect(&part, Rect2D::new(10.0, 0.0, 0.0, 10.0)).is_empty());
        assert_eq!(part.first_inside_rect(Rect2D::new(50.0, 50.0, 60.0, 60.0)), None);
    }

    #[test]
    fn half_open_edges_exclude_max_edge() {
        let world = World::new(&[(10.0, 5.0), (0.0, 0.0)]);
        let cfg = config(10.0).with_edges(RectEdges::HalfOpen);
        let mut part = SpacePartition::new(cfg, world.locate());
        part.extend([0, 1]);
        assert_eq!(in_rect(&part, Rect2D::new(0.0, 0.0, 10.0, 10.0)), vec![1]);

        let mut closed = SpacePartition::new(config(10.0), world.locate());
        closed.extend([0, 1]);
        assert_eq!(in_rect(&closed, Rect2D::new(0.0, 0.0, 10.0, 10.0)), vec![0, 1]);
    }

    #[test]
    fn huge_rect_finds_everything() {
        let world = World::new(&[(-1e6, 3.0), (0.5, 0.5), (1e6, -1e6)]);
        let mut part = SpacePartition::new(config(1.0), world.locate());
        part.extend([0, 1, 2]);
        let all = Rect2D::new(-1e12, -1e12, 1e12, 1e12);
        assert_eq!(in_rect(&part, all), vec![0, 1, 2]);
        assert_eq!(part.count_inside_rect(Rect2D::new(-1e12, -1e12, 0.0, 1e12)), 1);
    }

    #[test]
    fn query_helpers_agree_with_visitors() {
        let world = World::new(&[(1.0, 1.0), (4.0, 4.0), (12.0, 3.0), (-7.0, -7.0)]);
        let mut part = SpacePartition::new(config(5.0), world.locate());
        part.extend(0..4);

        let rect = Rect2D::new(0.0, 0.0, 12.0, 12.0);
        let queried = sorted(part.query_inside_rect(rect).map(|(o, _)| o).collect());
        assert_eq!(queried, in_rect(&part, rect));
        assert_eq!(part.count_inside_rect(rect), queried.len());
        assert!(part.first_inside_rect(rect).is_some());

        let center = Point2D::new(0.0, 0.0);
        let near: Vec<_> = part.query_within_radius(6.0, center).collect();
        assert_eq!(near.len(), part.count_within_radius(6.0, center));
        for (o, p) in near {
            assert_eq!(part.position(o), Some(p));
        }
        assert!(part.first_within_radius(1.0, center).is_none());
    }

    #[test]
    fn invariant_holds_under_churn() {
        let n: u32 = 64;
        let world = World {
            points: (0..n)
                .map(|i| Cell::new(Point2D::new(f64::from(i) * 3.0 - 90.0, f64::from(i % 7) * 11.0)))
                .collect(),
        };
        let mut part = SpacePartition::new(config(7.5), world.locate());
        part.extend(0..n as usize);
        part.assert_consistent();

        for round in 0..5_u32 {
            for i in 0..n as usize {
                let p = world.points[i].get();
                let dx = if (i as u32 + round) % 2 == 0 { 13.0 } else { -4.0 };
                world.set(i, p.x + dx, p.y - f64::from(round));
                part.add(i);
            }
            for i in (round as usize..n as usize).step_by(9) {
                part.remove(i);
            }
            part.assert_consistent();
            for (o, p) in part.iter() {
                let expected = CellCoord::new(
                    GridScalar::cell_coord(p.x, 0.0, 7.5),
                    GridScalar::cell_coord(p.y, 0.0, 7.5),
                );
                assert_eq!(part.cell(o), Some(expected), "{o} filed under a stale cell");
            }
        }
    }

    #[test]
    fn observing_applies_notifications_on_sync() {
        let world = World::new(&[(1.0, 1.0), (2.0, 2.0)]);
        let queue = ChangeQueue::new();
        let notifier = queue.notifier();
        let mut part = SpacePartition::observing(config(10.0), world.locate(), queue);
        part.extend([0, 1]);
        assert!(part.change_source().is_subscribed(0));
        assert_eq!(part.change_source().subscribed_len(), 2);

        world.set(0, 55.0, 55.0);
        world.set(1, 3.0, 3.0);
        assert!(notifier.notify(0));
        assert!(notifier.notify(1));
        assert_eq!(part.sync(), 1, "only object 0 changed cell");
        assert_eq!(in_rect(&part, Rect2D::new(50.0, 50.0, 60.0, 60.0)), vec![0]);
        assert_eq!(part.position(1), Some(Point2D::new(3.0, 3.0)));
        assert_eq!(part.change_source().pending_len(), 0);
        part.assert_consistent();
    }

    #[test]
    fn removal_tears_down_subscription() {
        let world = World::new(&[(1.0, 1.0), (2.0, 2.0)]);
        let queue = ChangeQueue::new();
        let notifier = queue.notifier();
        let mut part = SpacePartition::observing(config(10.0), world.locate(), queue);
        part.extend([0, 1]);

        notifier.notify(0);
        assert!(part.remove(0));
        assert!(!part.change_source().is_subscribed(0));
        assert!(!notifier.notify(0));

        world.set(0, 80.0, 80.0);
        assert_eq!(part.sync(), 0);
        assert!(!part.contains(0), "a stale notification must not re-insert");

        part.clear();
        assert!(part.is_empty());
        assert_eq!(part.bucket_count(), 0);
        assert_eq!(part.change_source().subscribed_len(), 0);
        part.assert_consistent();
    }

    #[test]
    fn notify_changed_ignores_unknown_objects() {
        let world = World::new(&[(1.0, 1.0), (2.0, 2.0)]);
        let mut part = SpacePartition::new(config(10.0), world.locate());
        part.add(0);
        assert_eq!(part.notify_changed(1), None);
        assert!(!part.contains(1));
        world.set(0, -15.0, 0.0);
        assert_eq!(part.notify_changed(0), Some(Added::Moved));
    }

    #[test]
    fn integer_coordinates() {
        let mut part = SpacePartition::explicit(PartitionConfig::new(16_i64).unwrap());
        part.add_at('a', Point2D::new(-1, -1));
        part.add_at('b', Point2D::new(15, 15));
        part.add_at('c', Point2D::new(16, 0));
        assert_eq!(part.cell('a'), Some(CellCoord::new(-1, -1)));
        assert_eq!(part.count_inside_rect(Rect2D::new(0, 0, 15, 15)), 1);
        assert_eq!(part.count_within_radius(16, Point2D::new(0, 0)), 2);
        assert_eq!(part.add_at('a', Point2D::new(-1, -1)), Added::Refreshed);
        assert_eq!(part.add_at('a', Point2D::new(0, 0)), Added::Moved);
        part.assert_consistent();
    }

    #[test]
    fn integer_circle_spanning_the_whole_plane() {
        let mut part = SpacePartition::explicit(PartitionConfig::new(1_i64).unwrap());
        part.add_at(0_u8, Point2D::new(i64::MIN, i64::MIN));
        part.add_at(1_u8, Point2D::new(0, 0));
        part.add_at(2_u8, Point2D::new(i64::MAX, 0));
        let origin = Point2D::new(0, 0);
        // The bounding square saturates to every cell; the corner point is
        // still farther than the radius.
        assert_eq!(part.count_within_radius(i64::MAX, origin), 2);
        assert_eq!(
            sorted_u8(part.query_within_radius(i64::MAX, origin).map(|(o, _)| o).collect()),
            vec![1, 2]
        );
        // Straight above the corner, exactly one radius away.
        assert_eq!(
            part.first_within_radius(i64::MAX, Point2D::new(i64::MIN, -1)),
            Some(0)
        );
    }

    fn sorted_u8(mut v: Vec<u8>) -> Vec<u8> {
        v.sort_unstable();
        v
    }

    #[test]
    fn queries_before_sync_see_recorded_positions() {
        let world = World::new(&[(1.0, 1.0)]);
        let queue = ChangeQueue::new();
        let notifier = queue.notifier();
        let mut part = SpacePartition::observing(config(10.0), world.locate(), queue);
        part.add(0);

        world.set(0, 55.0, 55.0);
        notifier.notify(0);
        assert_eq!(in_rect(&part, Rect2D::new(0.0, 0.0, 9.0, 9.0)), vec![0]);
        assert_eq!(part.position(0), Some(Point2D::new(1.0, 1.0)));

        assert_eq!(part.sync(), 1);
        assert!(in_rect(&part, Rect2D::new(0.0, 0.0, 9.0, 9.0)).is_empty());
        assert_eq!(in_rect(&part, Rect2D::new(50.0, 50.0, 60.0, 60.0)), vec![0]);
    }

    #[test]
    fn offset_origin() {
        let cfg = PartitionConfig::new(10.0_f32)
            .and_then(|c| c.with_origin(5.0, 5.0))
            .unwrap();
        let mut part = SpacePartition::explicit(cfg);
        part.add_at(1_u8, Point2D::new(4.0, 4.0));
        part.add_at(2_u8, Point2D::new(5.0, 5.0));
        assert_eq!(part.cell(1), Some(CellCoord::new(-1, -1)));
        assert_eq!(part.cell(2), Some(CellCoord::new(0, 0)));
        assert_eq!(part.count_within_radius(2.0, Point2D::new(4.5, 4.5)), 2);
    }
}
