//! Index sizing and file layout constants.
//!
//! # Occupancy Grid
//!
//! ```text
//! ┌──────────────────────── node cube ────────────────────────┐
//! │                                                           │
//! │   GRID_SIZE³ logical cells, one accepted point per cell   │
//! │                                                           │
//! │   cell id = z * GRID_SIZE² + y * GRID_SIZE + x            │
//! │                                                           │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! A point whose cell is already claimed is pushed one level deeper. The
//! deepest level (`max_depth`) keeps no grid and accepts everything.

/// Default occupancy grid resolution per axis inside each node.
pub const DEFAULT_GRID_SIZE: u32 = 128;

/// Smallest accepted occupancy grid resolution.
pub const MIN_GRID_SIZE: u32 = 3;

/// Largest accepted occupancy grid resolution (1024³ = 2^30 cell ids fit u32).
pub const MAX_GRID_SIZE: u32 = 1024;

/// Target number of points held by a deepest-level node under an even
/// spatial distribution.
pub const DEFAULT_MAX_POINTS_PER_NODE: usize = 10_000;

/// Deepest subdivision the key arithmetic supports (`2^depth` fits i32).
pub const MAX_SUPPORTED_DEPTH: i32 = 30;

/// Projected size (pixels) above which a visible node is expanded.
pub const DEFAULT_MIN_SCREEN_SIZE: f64 = 200.0;

/// Default number of point indices a query may emit per frame.
pub const DEFAULT_POINT_BUDGET: usize = 1_000_000;

/// Point count above which the root extent is reduced in parallel.
pub const PARALLEL_EXTENT_THRESHOLD: usize = 1 << 16;

/// Persisted index signature.
pub const FORMAT_SIGNATURE: [u8; 4] = *b"EPTO";

/// Persisted index major version.
pub const FORMAT_VERSION_MAJOR: i32 = 1;

/// Persisted index minor version.
pub const FORMAT_VERSION_MINOR: i32 = 0;

/// Linearize an occupancy cell coordinate.
#[inline(always)]
pub const fn cell_to_id(x: u32, y: u32, z: u32, grid_size: u32) -> u32 {
  z * grid_size * grid_size + y * grid_size + x
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
