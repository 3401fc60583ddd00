// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Construction options for a partition.

use core::fmt;

use crate::types::{RectEdges, Scalar};

/// Why a [`PartitionConfig`] was rejected.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The cell size was zero or negative.
    NonPositiveCellSize,
    /// The cell size was NaN or infinite.
    NonFiniteCellSize,
    /// An origin coordinate was NaN or infinite.
    NonFiniteOrigin,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveCellSize => f.write_str("cell size must be strictly positive"),
            Self::NonFiniteCellSize => f.write_str("cell size must be finite"),
            Self::NonFiniteOrigin => f.write_str("grid origin must be finite"),
        }
    }
}

impl core::error::Error for ConfigError {}

/// Validated construction options.
///
/// The cell size has no default: pick it close to the typical query
/// rectangle side or circle diameter, since it dominates query cost.
///
/// ```rust
/// use understory_partition::{ConfigError, PartitionConfig, RectEdges};
///
/// let config = PartitionConfig::new(32.0_f32)?
///     .with_origin(-8.0, -8.0)?
///     .with_edges(RectEdges::HalfOpen);
/// assert_eq!(config.cell_size(), 32.0);
///
/// assert_eq!(
///     PartitionConfig::new(0.0_f32).unwrap_err(),
///     ConfigError::NonPositiveCellSize
/// );
/// # Ok::<(), ConfigError>(())
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PartitionConfig<T> {
    cell_size: T,
    origin_x: T,
    origin_y: T,
    edges: RectEdges,
}

impl<T: Scalar> PartitionConfig<T> {
    /// Options with the given cell size, origin at (0, 0) and closed rectangle edges.
    pub fn new(cell_size: T) -> Result<Self, ConfigError> {
        if !T::is_finite(cell_size) {
            return Err(ConfigError::NonFiniteCellSize);
        }
        if cell_size <= T::zero() {
            return Err(ConfigError::NonPositiveCellSize);
        }
        Ok(Self {
            cell_size,
            origin_x: T::zero(),
            origin_y: T::zero(),
            edges: RectEdges::default(),
        })
    }

    /// Anchor the grid at `(origin_x, origin_y)` instead of (0, 0).
    pub fn with_origin(self, origin_x: T, origin_y: T) -> Result<Self, ConfigError> {
        if !T::is_finite(origin_x) || !T::is_finite(origin_y) {
            return Err(ConfigError::NonFiniteOrigin);
        }
        Ok(Self {
            origin_x,
            origin_y,
            ..self
        })
    }

    /// Set the edge rule used by rectangle queries.
    pub fn with_edges(self, edges: RectEdges) -> Self {
        Self { edges, ..self }
    }

    /// Side length of a grid cell.
    pub fn cell_size(&self) -> T {
        self.cell_size
    }

    /// Grid origin.
    pub fn origin(&self) -> (T, T) {
        (self.origin_x, self.origin_y)
    }

    /// Edge rule for rectangle queries.
    pub fn edges(&self) -> RectEdges {
        self.edges
    }
}
