//! Node - the payload stored for one occupied octree cell.

use std::collections::HashSet;

use super::NodeBounds;

/// Points held at one octree cell plus build-time occupancy bookkeeping.
///
/// Owned by the [`SpatialIndex`](super::SpatialIndex) registry.
#[derive(Clone, Debug)]
pub struct Node {
  /// Cube bounds derived from the key when the node was created.
  pub bounds: NodeBounds,

  /// Point indices in insertion order.
  points: Vec<u32>,

  /// Claimed occupancy cells. Stays empty at `max_depth` and after loading
  /// from storage.
  occupancy: HashSet<u32>,
}

impl Node {
  /// Create an empty node with fixed bounds.
  pub fn new(bounds: NodeBounds) -> Self {
    Self {
      bounds,
      points: Vec::new(),
      occupancy: HashSet::new(),
    }
  }

  /// Create a node holding an already-known point list (used when reading).
  pub(crate) fn with_points(bounds: NodeBounds, points: Vec<u32>) -> Self {
    Self {
      bounds,
      points,
      occupancy: HashSet::new(),
    }
  }

  /// Whether an occupancy cell is already claimed.
  #[inline]
  pub fn is_occupied(&self, cell: u32) -> bool {
    self.occupancy.contains(&cell)
  }

  /// Append a point. `cell` is None at the deepest level, where no
  /// occupancy is recorded.
  #[inline]
  pub fn insert(&mut self, index: u32, cell: Option<u32>) {
    self.points.push(index);
    if let Some(cell) = cell {
      self.occupancy.insert(cell);
    }
  }

  /// Point indices in insertion order.
  #[inline]
  pub fn points(&self) -> &[u32] {
    &self.points
  }

  /// Number of points held.
  #[inline]
  pub fn npoints(&self) -> usize {
    self.points.len()
  }

  /// Number of claimed occupancy cells.
  #[inline]
  pub fn occupancy_len(&self) -> usize {
    self.occupancy.len()
  }

  /// Claimed occupancy cells (unordered).
  pub fn occupancy(&self) -> impl Iterator<Item = u32> + '_ {
    self.occupancy.iter().copied()
  }
}
