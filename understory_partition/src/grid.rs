// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uniform grid of point buckets.
//!
//! The grid maps each fixed-size square cell to the bucket of identities whose
//! point currently falls in that cell. It knows nothing about positions beyond
//! the cell coordinate it is handed; the exact geometric test belongs to
//! [`SpacePartition`][crate::SpacePartition].

use core::fmt::Debug;
use core::hash::Hash;
use core::ops::ControlFlow;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::types::{Point2D, Rect2D, Scalar};

/// Scalar types supported by the grid.
///
/// This is kept separate from [`Scalar`] so that cell mapping can use
/// type-specific logic (e.g., Euclidean division for integers).
pub trait GridScalar: Scalar {
    /// Map a scalar coordinate to a grid coordinate along one axis.
    ///
    /// The result is `floor((value - origin) / cell_size)`, saturated to the
    /// `i32` range. Implementations must be monotonic in `value` for fixed
    /// `origin` and `cell_size`.
    fn cell_coord(value: Self, origin: Self, cell_size: Self) -> i32;
}

macro_rules! float_grid_scalar {
    ($t:ty) => {
        impl GridScalar for $t {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "Cell coordinates are i32; `as` saturates out-of-range values."
            )]
            #[inline]
            fn cell_coord(value: Self, origin: Self, cell_size: Self) -> i32 {
                debug_assert!(cell_size > 0.0, "grid cell_size must be strictly positive");
                let t = (value - origin) / cell_size;
                let coord = t as i32;
                // The cast truncated toward zero; step down for negative fractions.
                if t < 0.0 && (coord as Self) > t {
                    coord.saturating_sub(1)
                } else {
                    coord
                }
            }
        }
    };
}

float_grid_scalar!(f32);
float_grid_scalar!(f64);

impl GridScalar for i64 {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Range is checked before the cast."
    )]
    #[inline]
    fn cell_coord(value: Self, origin: Self, cell_size: Self) -> i32 {
        debug_assert!(cell_size > 0, "grid cell_size must be strictly positive");
        // Widen so that `value - origin` cannot overflow; div_euclid floors for
        // a positive divisor.
        let coord = (i128::from(value) - i128::from(origin)).div_euclid(i128::from(cell_size));
        coord.clamp(i128::from(i32::MIN), i128::from(i32::MAX)) as i32
    }
}

/// Integer coordinate of a grid cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl CellCoord {
    /// Create a cell coordinate.
    #[inline(always)]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Inclusive rectangular range of cell coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CellRange {
    /// Lowest column.
    pub min_x: i32,
    /// Lowest row.
    pub min_y: i32,
    /// Highest column, inclusive.
    pub max_x: i32,
    /// Highest row, inclusive.
    pub max_y: i32,
}

impl CellRange {
    /// Whether `cell` lies inside the range.
    #[inline]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.min_x <= cell.x && cell.x <= self.max_x && self.min_y <= cell.y && cell.y <= self.max_y
    }

    /// Number of cells covered by the range.
    ///
    /// Computed in `u64` since a range may span the entire `i32` plane.
    #[inline]
    pub fn len(&self) -> u64 {
        let w = (i64::from(self.max_x) - i64::from(self.min_x) + 1).unsigned_abs();
        let h = (i64::from(self.max_y) - i64::from(self.min_y) + 1).unsigned_abs();
        w.saturating_mul(h)
    }

    /// Always false: a range covers at least one cell.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate the cells of the range in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = CellCoord> + use<> {
        let Self {
            min_x,
            min_y,
            max_x,
            max_y,
        } = *self;
        (min_y..=max_y).flat_map(move |y| (min_x..=max_x).map(move |x| CellCoord::new(x, y)))
    }
}

/// Objects in one cell.
///
/// Most cells hold a handful of points, so the first few live inline.
type Bucket<O> = SmallVec<[O; 8]>;

/// Uniform grid with a fixed cell size.
pub struct Grid<T: GridScalar, O> {
    cell_size: T,
    origin_x: T,
    origin_y: T,
    cells: HashMap<CellCoord, Bucket<O>>,
}

impl<T: GridScalar, O> Debug for Grid<T, O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let occupants: usize = self.cells.values().map(|b| b.len()).sum();
        f.debug_struct("Grid")
            .field("cell_size", &self.cell_size)
            .field("origin_x", &self.origin_x)
            .field("origin_y", &self.origin_y)
            .field("buckets", &self.cells.len())
            .field("occupants", &occupants)
            .finish_non_exhaustive()
    }
}

impl<T: GridScalar, O: Copy + Eq + Hash> Grid<T, O> {
    /// Create a new grid with the given cell size and origin at (0, 0).
    pub fn new(cell_size: T) -> Self {
        Self::with_origin(cell_size, T::zero(), T::zero())
    }

    /// Create a new grid with the given cell size and origin.
    pub fn with_origin(cell_size: T, origin_x: T, origin_y: T) -> Self {
        debug_assert!(cell_size > T::zero(), "cell_size must be strictly positive");
        Self {
            cell_size,
            origin_x,
            origin_y,
            cells: HashMap::new(),
        }
    }

    /// Side length of a cell.
    pub fn cell_size(&self) -> T {
        self.cell_size
    }

    /// The cell containing `p`.
    #[inline]
    pub fn cell_of(&self, p: Point2D<T>) -> CellCoord {
        CellCoord::new(
            T::cell_coord(p.x, self.origin_x, self.cell_size),
            T::cell_coord(p.y, self.origin_y, self.cell_size),
        )
    }

    /// Add `id` to the bucket of `cell`, creating the bucket if needed.
    ///
    /// The caller guarantees `id` is not already in any bucket.
    pub fn insert(&mut self, id: O, cell: CellCoord) {
        self.cells.entry(cell).or_default().push(id);
    }

    /// Remove `id` from the bucket of `cell`. Returns whether it was there.
    ///
    /// A bucket left empty is dropped so sparse grids stay compact under churn.
    pub fn erase(&mut self, id: O, cell: CellCoord) -> bool {
        let Some(bucket) = self.cells.get_mut(&cell) else {
            return false;
        };
        let Some(pos) = bucket.iter().position(|&o| o == id) else {
            return false;
        };
        bucket.swap_remove(pos);
        if bucket.is_empty() {
            self.cells.remove(&cell);
        }
        true
    }

    /// The range of cells that `rect` touches.
    pub fn cells_overlapping(&self, rect: &Rect2D<T>) -> CellRange {
        let (min_x, max_x) = self.axis_range(rect.min_x, rect.max_x, self.origin_x);
        let (min_y, max_y) = self.axis_range(rect.min_y, rect.max_y, self.origin_y);
        CellRange {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    fn axis_range(&self, min: T, max: T, origin: T) -> (i32, i32) {
        let c0 = T::cell_coord(min, origin, self.cell_size);
        let c1 = T::cell_coord(max, origin, self.cell_size);
        if c0 <= c1 { (c0, c1) } else { (c1, c0) }
    }

    /// Identities in the bucket of `cell`; empty when the cell has no bucket.
    pub fn bucket(&self, cell: CellCoord) -> &[O] {
        self.cells.get(&cell).map(|b| b.as_slice()).unwrap_or_default()
    }

    /// Number of non-empty buckets.
    pub fn bucket_count(&self) -> usize {
        self.cells.len()
    }

    /// Iterate all buckets with their cell.
    pub fn buckets(&self) -> impl Iterator<Item = (CellCoord, &[O])> + '_ {
        self.cells.iter().map(|(&c, b)| (c, b.as_slice()))
    }

    /// Drop every bucket.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Visit every identity bucketed in `range` until `f` breaks.
    ///
    /// When the range covers more cells than there are buckets, the bucket
    /// map is scanned instead of probing each cell, so a huge query rectangle
    /// costs no more than a full walk.
    pub fn visit_candidates<F>(&self, range: CellRange, mut f: F) -> ControlFlow<()>
    where
        F: FnMut(O) -> ControlFlow<()>,
    {
        if range.len() > self.cells.len() as u64 {
            for (cell, bucket) in &self.cells {
                if !range.contains(*cell) {
                    continue;
                }
                for &id in bucket {
                    f(id)?;
                }
            }
        } else {
            for cell in range.iter() {
                if let Some(bucket) = self.cells.get(&cell) {
                    for &id in bucket {
                        f(id)?;
                    }
                }
            }
        }
        ControlFlow::Continue(())
    }
}

/// Grid over `f32` coordinates.
pub type GridF32<O> = Grid<f32, O>;
/// Grid over `f64` coordinates.
pub type GridF64<O> = Grid<f64, O>;
/// Grid over `i64` coordinates.
pub type GridI64<O> = Grid<i64, O>;
