//! SpatialKey - immutable value type addressing one octree cell.
//!
//! Depth 0 is the root cube. Each deeper level halves the cell size, so a
//! key at depth `d` has grid coordinates in `0..2^d` on every axis.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Address of a cubic octree cell: `(depth, x, y, z)`.
///
/// Grid coordinates are at the key's own depth. A key is valid when every
/// field is non-negative.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SpatialKey {
  /// Subdivision depth (0 = root).
  pub depth: i32,
  /// Grid X position at this depth.
  pub x: i32,
  /// Grid Y position at this depth.
  pub y: i32,
  /// Grid Z position at this depth.
  pub z: i32,
}

impl SpatialKey {
  /// Placeholder key that addresses nothing.
  pub const INVALID: Self = Self {
    depth: -1,
    x: -1,
    y: -1,
    z: -1,
  };

  /// Create a key at the given depth and grid position.
  pub const fn new(depth: i32, x: i32, y: i32, z: i32) -> Self {
    Self { depth, x, y, z }
  }

  /// The key of the root cube.
  pub const fn root() -> Self {
    Self::new(0, 0, 0, 0)
  }

  /// True when all fields are non-negative.
  #[inline]
  pub fn is_valid(&self) -> bool {
    self.depth >= 0 && self.x >= 0 && self.y >= 0 && self.z >= 0
  }

  /// True when the grid position lies inside `0..2^depth` on every axis.
  pub fn is_within_depth(&self) -> bool {
    if !self.is_valid() || self.depth > crate::constants::MAX_SUPPORTED_DEPTH {
      return false;
    }
    let cells = 1i64 << self.depth;
    (self.x as i64) < cells && (self.y as i64) < cells && (self.z as i64) < cells
  }

  /// The 8 keys one level deeper.
  ///
  /// Direction bits: bit 0 → x + 1, bit 1 → y + 1, bit 2 → z + 1. The
  /// order is the order nodes are visited during a visibility query.
  pub fn get_children(&self) -> [Self; 8] {
    std::array::from_fn(|direction| {
      let dx = (direction & 1) as i32;
      let dy = ((direction >> 1) & 1) as i32;
      let dz = ((direction >> 2) & 1) as i32;
      Self {
        depth: self.depth + 1,
        x: self.x * 2 + dx,
        y: self.y * 2 + dy,
        z: self.z * 2 + dz,
      }
    })
  }

  /// Parent key one level shallower.
  ///
  /// Returns None for the root and for invalid keys.
  pub fn get_parent(&self) -> Option<Self> {
    if !self.is_valid() || self.depth == 0 {
      return None;
    }
    Some(Self {
      depth: self.depth - 1,
      x: self.x >> 1,
      y: self.y >> 1,
      z: self.z >> 1,
    })
  }
}

impl Default for SpatialKey {
  fn default() -> Self {
    Self::INVALID
  }
}

/// Packs `(depth, x)` and `(y, z)` into two words and mixes them with a shift.
impl Hash for SpatialKey {
  fn hash<H: Hasher>(&self, state: &mut H) {
    let k1 = ((self.depth as u32 as u64) << 32) | self.x as u32 as u64;
    let k2 = ((self.y as u32 as u64) << 32) | self.z as u32 as u64;
    (k1 ^ (k2 << 1)).hash(state);
  }
}

/// Lexicographic on `(x, y, z, depth)`.
impl Ord for SpatialKey {
  fn cmp(&self, other: &Self) -> Ordering {
    (self.x, self.y, self.z, self.depth).cmp(&(other.x, other.y, other.z, other.depth))
  }
}

impl PartialOrd for SpatialKey {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

#[cfg(test)]
#[path = "key_test.rs"]
mod key_test;
