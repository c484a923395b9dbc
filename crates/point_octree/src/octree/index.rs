//! SpatialIndex - adaptive octree over a point set.
//!
//! # Acceptance Algorithm
//!
//! Each point walks down from the root. At every depth above `max_depth` it
//! is accepted only if its occupancy cell inside that node is still free
//! (first writer wins); otherwise it retries one level deeper. The deepest
//! level accepts unconditionally, so every point lands in exactly one node.
//!
//! ```text
//! depth 0   ██░░░░  one point per occupancy cell, coarse even sample
//! depth 1   ██████░░  collisions from above, finer sample
//!   ...
//! max_depth ████████  everything left
//! ```

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use glam::DVec3;
use web_time::Instant;

use super::{DAabb3, IndexConfig, Node, NodeBounds, SpatialKey};
use crate::constants::{cell_to_id, MAX_SUPPORTED_DEPTH};
use crate::error::IndexError;
use crate::points::PointSource;

/// Largest number of points an index can address (32-bit point indices).
pub const MAX_POINTS: usize = u32::MAX as usize;

/// Derive the deepest subdivision level from the point count.
///
/// Starting from the largest dimension, every step halves the target cell
/// size and halves `npoints` once per axis whose extent still reaches that
/// size, until `npoints` drops to `max_points_per_node` or below. For a cube
/// every step divides by 8.
pub fn compute_max_depth(extent: DVec3, npoints: usize, max_points_per_node: usize) -> i32 {
  let mut size = extent.max_element();
  let mut npts = npoints;
  let mut depth = 0;

  while npts > max_points_per_node && depth < MAX_SUPPORTED_DEPTH {
    if extent.x >= size {
      npts /= 2;
    }
    if extent.y >= size {
      npts /= 2;
    }
    if extent.z >= size {
      npts /= 2;
    }
    size /= 2.0;
    depth += 1;
  }

  depth
}

/// Map an offset along one axis to a clamped grid coordinate in `0..cells`.
///
/// Degenerate resolutions (zero-size cubes) map everything to 0.
#[inline]
fn grid_coord(offset: f64, resolution: f64, cells: i64) -> i64 {
  if !(resolution > 0.0) {
    return 0;
  }
  let v = (offset / resolution).floor();
  if v.is_nan() {
    return 0;
  }
  (v as i64).clamp(0, cells - 1)
}

/// Node and point counts of an index, overall and per depth.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexSummary {
  /// Number of nodes in the registry.
  pub nodes: usize,
  /// Number of point indices across all nodes.
  pub points: usize,
  /// Deepest level the index may create.
  pub max_depth: i32,
  /// Node count at each depth (index = depth).
  pub nodes_per_depth: Vec<usize>,
  /// Point count at each depth (index = depth).
  pub points_per_depth: Vec<usize>,
}

/// Octree level-of-detail index keyed by [`SpatialKey`].
///
/// Stores point indices only; coordinates are read from a [`PointSource`]
/// during insertion.
#[derive(Clone, Debug)]
pub struct SpatialIndex {
  /// Root cube.
  root: DAabb3,
  /// Deepest subdivision level.
  max_depth: i32,
  /// Construction parameters.
  config: IndexConfig,
  /// Occupied cells.
  registry: HashMap<SpatialKey, Node>,
  /// Number of points inserted (or read).
  npoints: usize,
  /// Set when read from storage: occupancy was not restored.
  query_only: bool,
}

impl SpatialIndex {
  /// Build an index over every point of `points`.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "index::build"))]
  pub fn build<P: PointSource + ?Sized>(points: &P, config: IndexConfig) -> Result<Self, IndexError> {
    let n = points.len();
    if n > MAX_POINTS {
      return Err(IndexError::CapacityExceeded {
        points: n,
        max: MAX_POINTS,
      });
    }
    config.validate()?;

    let start = Instant::now();

    let extent = {
      #[cfg(feature = "tracing")]
      let _span = tracing::info_span!("compute_extent").entered();
      DAabb3::from_points(points).unwrap_or(DAabb3::new(DVec3::ZERO, DVec3::ZERO))
    };

    let mut index = Self::new(extent, n, config)?;

    {
      #[cfg(feature = "tracing")]
      let _span = tracing::info_span!("insert_points").entered();
      for i in 0..n {
        index.insert(points, i)?;
      }
    }

    let secs = start.elapsed().as_secs_f64();
    log::info!(
      "Indexation: {:.1} seconds ({:.1}M pts/s)",
      secs,
      n as f64 / secs.max(f64::EPSILON) / 1_000_000.0
    );
    log::debug!(
      "Index built: {} points in {} nodes, max depth {}",
      n,
      index.len(),
      index.max_depth
    );

    Ok(index)
  }

  /// Create an empty index whose root cube encloses `extent`, sized for
  /// `expected_points`. Points are then added with [`insert`](Self::insert).
  pub fn new(extent: DAabb3, expected_points: usize, config: IndexConfig) -> Result<Self, IndexError> {
    if expected_points > MAX_POINTS {
      return Err(IndexError::CapacityExceeded {
        points: expected_points,
        max: MAX_POINTS,
      });
    }
    config.validate()?;

    let root = extent.to_cube();
    let max_depth = compute_max_depth(root.size(), expected_points, config.max_points_per_node);

    Ok(Self {
      root,
      max_depth,
      config,
      registry: HashMap::new(),
      npoints: 0,
      query_only: false,
    })
  }

  /// Assemble an index from a read registry. Occupancy is not restored, so
  /// the result refuses further insertion.
  pub(crate) fn from_registry(root: DAabb3, registry: HashMap<SpatialKey, Node>) -> Self {
    let max_depth = registry.keys().map(|k| k.depth).max().unwrap_or(0);
    let npoints = registry.values().map(Node::npoints).sum();
    Self {
      root,
      max_depth,
      config: IndexConfig::default(),
      registry,
      npoints,
      query_only: true,
    }
  }

  /// Insert point `index` of `points`, returning the key of the node that
  /// accepted it.
  ///
  /// The point must lie inside the root cube; points outside are clamped to
  /// the border cells.
  pub fn insert<P: PointSource + ?Sized>(
    &mut self,
    points: &P,
    index: usize,
  ) -> Result<SpatialKey, IndexError> {
    if self.query_only {
      return Err(IndexError::QueryOnly);
    }
    let idx = u32::try_from(index).map_err(|_| IndexError::CapacityExceeded {
      points: index.saturating_add(1),
      max: MAX_POINTS,
    })?;

    let p = points.position(index);
    let root = self.root;
    let mut depth = 0;

    loop {
      let key = self.get_key(p, depth);
      let cell = if depth == self.max_depth {
        None
      } else {
        Some(self.cell_in(p, &NodeBounds::in_root(&root, &key)))
      };

      let node = match self.registry.entry(key) {
        Entry::Occupied(e) => e.into_mut(),
        Entry::Vacant(e) => e.insert(Node::new(NodeBounds::in_root(&root, &key))),
      };

      let accepted = cell.map_or(true, |c| !node.is_occupied(c));
      if accepted {
        node.insert(idx, cell);
        self.npoints += 1;
        return Ok(key);
      }

      depth += 1;
    }
  }

  /// Key of the cell containing `p` at `depth`, clamped to the grid.
  ///
  /// `depth` itself is clamped to `0..=MAX_SUPPORTED_DEPTH`.
  pub fn get_key(&self, p: DVec3, depth: i32) -> SpatialKey {
    let depth = depth.clamp(0, MAX_SUPPORTED_DEPTH);
    let cells = 1i64 << depth;
    let res = self.root.size().x / cells as f64;
    let o = p - self.root.min;
    SpatialKey::new(
      depth,
      grid_coord(o.x, res, cells) as i32,
      grid_coord(o.y, res, cells) as i32,
      grid_coord(o.z, res, cells) as i32,
    )
  }

  /// Occupancy cell id of `p` inside the node at `key`, or `None` when the
  /// key addresses no cell.
  pub fn get_cell(&self, p: DVec3, key: &SpatialKey) -> Option<u32> {
    self.node_bounds(key).map(|bounds| self.cell_in(p, &bounds))
  }

  fn cell_in(&self, p: DVec3, bounds: &NodeBounds) -> u32 {
    let g = self.config.grid_size;
    let res = bounds.half_size * 2.0 / g as f64;
    let o = p - bounds.min();

    let x = grid_coord(o.x, res, g as i64) as u32;
    let y = grid_coord(o.y, res, g as i64) as u32;
    let z = grid_coord(o.z, res, g as i64) as u32;
    let id = cell_to_id(x, y, z, g);
    debug_assert!(
      (id as u64) < self.config.cells_per_node(),
      "occupancy cell out of range"
    );
    id
  }

  /// Cube bounds of any key, whether or not a node exists there.
  ///
  /// `None` for the invalid key, depths past `MAX_SUPPORTED_DEPTH`, and
  /// grid positions outside `0..2^depth`.
  pub fn node_bounds(&self, key: &SpatialKey) -> Option<NodeBounds> {
    NodeBounds::of_key(&self.root, key)
  }

  /// Node at `key`, if occupied.
  #[inline]
  pub fn get(&self, key: &SpatialKey) -> Option<&Node> {
    self.registry.get(key)
  }

  /// Whether a node exists at `key`.
  #[inline]
  pub fn contains_key(&self, key: &SpatialKey) -> bool {
    self.registry.contains_key(key)
  }

  /// All nodes, in registry order.
  pub fn nodes(&self) -> impl Iterator<Item = (&SpatialKey, &Node)> {
    self.registry.iter()
  }

  /// All keys, in registry order.
  pub fn keys(&self) -> impl Iterator<Item = &SpatialKey> {
    self.registry.keys()
  }

  /// Number of nodes.
  #[inline]
  pub fn len(&self) -> usize {
    self.registry.len()
  }

  /// True when no node exists.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.registry.is_empty()
  }

  /// Number of point indices held.
  #[inline]
  pub fn npoints(&self) -> usize {
    self.npoints
  }

  /// Deepest subdivision level.
  #[inline]
  pub fn max_depth(&self) -> i32 {
    self.max_depth
  }

  /// Root cube.
  #[inline]
  pub fn bounds(&self) -> DAabb3 {
    self.root
  }

  /// Construction parameters.
  #[inline]
  pub fn config(&self) -> &IndexConfig {
    &self.config
  }

  /// True when read from storage; such an index only answers queries.
  #[inline]
  pub fn is_query_only(&self) -> bool {
    self.query_only
  }

  /// Node and point counts per depth.
  pub fn summary(&self) -> IndexSummary {
    let levels = (self.max_depth.max(0) + 1) as usize;
    let mut summary = IndexSummary {
      nodes: self.registry.len(),
      points: self.npoints,
      max_depth: self.max_depth,
      nodes_per_depth: vec![0; levels],
      points_per_depth: vec![0; levels],
    };
    for (key, node) in &self.registry {
      let d = key.depth as usize;
      if d >= summary.nodes_per_depth.len() {
        summary.nodes_per_depth.resize(d + 1, 0);
        summary.points_per_depth.resize(d + 1, 0);
      }
      summary.nodes_per_depth[d] += 1;
      summary.points_per_depth[d] += node.npoints();
    }
    summary
  }
}

#[cfg(test)]
#[path = "index_test.rs"]
mod index_test;
