//! IndexConfig - construction parameters.

use crate::constants::{
  DEFAULT_GRID_SIZE, DEFAULT_MAX_POINTS_PER_NODE, MAX_GRID_SIZE, MIN_GRID_SIZE,
};
use crate::error::IndexError;

/// Construction parameters for a [`SpatialIndex`](super::SpatialIndex).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IndexConfig {
  /// Occupancy grid resolution per axis inside each non-leaf node.
  /// Each such node accepts at most `grid_size³` points.
  pub grid_size: u32,

  /// Target point count for a deepest-level node; drives `max_depth`.
  pub max_points_per_node: usize,
}

impl IndexConfig {
  /// Check that every value is usable.
  pub fn validate(&self) -> Result<(), IndexError> {
    if !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&self.grid_size) {
      return Err(IndexError::InvalidConfig(format!(
        "grid_size must be in {}..={}, got {}",
        MIN_GRID_SIZE, MAX_GRID_SIZE, self.grid_size
      )));
    }
    if self.max_points_per_node == 0 {
      return Err(IndexError::InvalidConfig(
        "max_points_per_node must be positive".to_string(),
      ));
    }
    Ok(())
  }

  /// Number of occupancy cells in one node.
  #[inline]
  pub fn cells_per_node(&self) -> u64 {
    let g = self.grid_size as u64;
    g * g * g
  }
}

impl Default for IndexConfig {
  fn default() -> Self {
    Self {
      grid_size: DEFAULT_GRID_SIZE,
      max_points_per_node: DEFAULT_MAX_POINTS_PER_NODE,
    }
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
