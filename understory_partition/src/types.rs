// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive geometry types and helpers.

use core::fmt::Debug;

/// A point in 2D.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point2D<T> {
    /// Horizontal coordinate.
    pub x: T,
    /// Vertical coordinate.
    pub y: T,
}

impl<T> Point2D<T> {
    /// Create a new point.
    #[inline(always)]
    pub const fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}

impl<T: Scalar> Point2D<T> {
    /// Squared Euclidean distance to `other`, computed in the widened accumulator.
    ///
    /// Comparing squared distances avoids a square root per candidate and keeps
    /// integer coordinates exact. For integers a sum too large for the
    /// accumulator saturates, which still compares greater than any squared
    /// `i64` radius.
    #[inline]
    pub fn distance_squared(self, other: Self) -> T::Acc {
        T::sum_of_squares(T::abs_diff(self.x, other.x), T::abs_diff(self.y, other.y))
    }
}

impl<T> From<(T, T)> for Point2D<T> {
    #[inline]
    fn from((x, y): (T, T)) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in 2D, stored as min/max corners.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rect2D<T> {
    /// Minimum x (left)
    pub min_x: T,
    /// Minimum y (top)
    pub min_y: T,
    /// Maximum x (right)
    pub max_x: T,
    /// Maximum y (bottom)
    pub max_y: T,
}

impl<T> Rect2D<T> {
    /// Create a new rectangle from min/max corners.
    #[inline(always)]
    pub const fn new(min_x: T, min_y: T, max_x: T, max_y: T) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}

impl<T: Copy + PartialOrd> Rect2D<T> {
    /// Whether the point lies inside the rectangle, edges included.
    #[inline]
    pub fn contains_point(&self, p: Point2D<T>) -> bool {
        self.min_x <= p.x && self.min_y <= p.y && p.x <= self.max_x && p.y <= self.max_y
    }

    /// Whether the point lies inside the rectangle, with the max edges excluded.
    ///
    /// This is the containment rule of `kurbo::Rect::contains`: a point on the
    /// right or bottom edge is outside.
    #[inline]
    pub fn contains_point_half_open(&self, p: Point2D<T>) -> bool {
        self.min_x <= p.x && self.min_y <= p.y && p.x < self.max_x && p.y < self.max_y
    }

    /// Whether min exceeds max along either axis. Assumes no NaN.
    ///
    /// Inverted rectangles contain no points under either edge rule.
    #[inline]
    pub fn is_inverted(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }
}

impl<T: Scalar> Rect2D<T> {
    /// Create a rectangle from its min corner and size, as in `CGRect`.
    ///
    /// ```rust
    /// use understory_partition::Rect2D;
    ///
    /// let viewport = Rect2D::from_xywh(10.0, 20.0, 300.0, 200.0);
    /// assert_eq!(viewport, Rect2D::new(10.0, 20.0, 310.0, 220.0));
    /// ```
    #[inline]
    pub fn from_xywh(x: T, y: T, w: T, h: T) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: T::add(x, w),
            max_y: T::add(y, h),
        }
    }

    /// The square bounding a circle of `radius` around `center`.
    #[inline]
    pub fn around(center: Point2D<T>, radius: T) -> Self {
        Self {
            min_x: T::sub(center.x, radius),
            min_y: T::sub(center.y, radius),
            max_x: T::add(center.x, radius),
            max_y: T::add(center.y, radius),
        }
    }
}

/// Which rectangle edges count as inside for rectangle queries.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RectEdges {
    /// All four edges are inside. A zero-area rectangle matches points exactly on it.
    #[default]
    Closed,
    /// The max-x and max-y edges are outside, as with `CGRectContainsPoint` or
    /// `kurbo::Rect::contains`. A zero-area rectangle matches nothing.
    HalfOpen,
}

impl RectEdges {
    /// Apply this edge rule to a containment test.
    #[inline]
    pub fn contains<T: Copy + PartialOrd>(self, rect: &Rect2D<T>, p: Point2D<T>) -> bool {
        match self {
            Self::Closed => rect.contains_point(p),
            Self::HalfOpen => rect.contains_point_half_open(p),
        }
    }
}

/// Numeric scalar abstraction for coordinates.
///
/// The associated accumulator is a widened type (f32→f64, i64→u128) in which
/// squared distances are computed.
pub trait Scalar: Copy + PartialOrd + Debug {
    /// Widened accumulator type for squared distances. `Default` is zero.
    type Acc: Copy + PartialOrd + Default + Debug;

    /// Add two scalar values.
    fn add(a: Self, b: Self) -> Self;

    /// Subtract two scalar values: a - b.
    fn sub(a: Self, b: Self) -> Self;

    /// Zero value for the scalar type.
    fn zero() -> Self;

    /// Whether the value is finite (always true for integers).
    fn is_finite(v: Self) -> bool;

    /// `|a - b|`, exact in the accumulator type.
    fn abs_diff(a: Self, b: Self) -> Self::Acc;

    /// `a * a + b * b` for non-negative accumulators.
    fn sum_of_squares(a: Self::Acc, b: Self::Acc) -> Self::Acc;
}

impl Scalar for f32 {
    type Acc = f64;

    #[inline]
    fn add(a: Self, b: Self) -> Self {
        a + b
    }

    #[inline]
    fn sub(a: Self, b: Self) -> Self {
        a - b
    }

    #[inline(always)]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn is_finite(v: Self) -> bool {
        v.is_finite()
    }

    #[inline]
    fn abs_diff(a: Self, b: Self) -> Self::Acc {
        let d = f64::from(a) - f64::from(b);
        if d < 0.0 { -d } else { d }
    }

    #[inline]
    fn sum_of_squares(a: Self::Acc, b: Self::Acc) -> Self::Acc {
        a * a + b * b
    }
}

impl Scalar for f64 {
    type Acc = Self;

    #[inline]
    fn add(a: Self, b: Self) -> Self {
        a + b
    }

    #[inline]
    fn sub(a: Self, b: Self) -> Self {
        a - b
    }

    #[inline(always)]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn is_finite(v: Self) -> bool {
        v.is_finite()
    }

    #[inline]
    fn abs_diff(a: Self, b: Self) -> Self::Acc {
        let d = a - b;
        if d < 0.0 { -d } else { d }
    }

    #[inline]
    fn sum_of_squares(a: Self::Acc, b: Self::Acc) -> Self::Acc {
        a * a + b * b
    }
}

impl Scalar for i64 {
    type Acc = u128;

    #[inline]
    fn add(a: Self, b: Self) -> Self {
        a.saturating_add(b)
    }

    #[inline]
    fn sub(a: Self, b: Self) -> Self {
        a.saturating_sub(b)
    }

    #[inline(always)]
    fn zero() -> Self {
        0
    }

    #[inline(always)]
    fn is_finite(_v: Self) -> bool {
        true
    }

    #[inline]
    fn abs_diff(a: Self, b: Self) -> Self::Acc {
        u128::from(a.abs_diff(b))
    }

    /// Each square fits in `u128`; their sum may not, so it saturates.
    #[inline]
    fn sum_of_squares(a: Self::Acc, b: Self::Acc) -> Self::Acc {
        a.saturating_mul(a).saturating_add(b.saturating_mul(b))
    }
}

/// Helper alias for the widened accumulator type `Scalar::Acc` associated with a `T: Scalar`.
pub type ScalarAcc<T> = <T as Scalar>::Acc;

#[cfg(feature = "kurbo")]
mod kurbo_interop {
    use super::{Point2D, Rect2D};

    impl From<kurbo::Point> for Point2D<f64> {
        #[inline]
        fn from(p: kurbo::Point) -> Self {
            Self::new(p.x, p.y)
        }
    }

    impl From<Point2D<f64>> for kurbo::Point {
        #[inline]
        fn from(p: Point2D<f64>) -> Self {
            Self::new(p.x, p.y)
        }
    }

    impl From<kurbo::Rect> for Rect2D<f64> {
        #[inline]
        fn from(r: kurbo::Rect) -> Self {
            // kurbo allows x1 < x0; normalize so queries see min <= max.
            let r = r.abs();
            Self::new(r.x0, r.y0, r.x1, r.y1)
        }
    }

    impl From<Rect2D<f64>> for kurbo::Rect {
        #[inline]
        fn from(r: Rect2D<f64>) -> Self {
            Self::new(r.min_x, r.min_y, r.max_x, r.max_y)
        }
    }
}
