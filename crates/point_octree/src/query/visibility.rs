//! Budget-bounded, screen-size driven retrieval of point indices.
//!
//! # Traversal
//!
//! Depth-first from the root key. A node is dropped when it is missing from
//! the index or outside the view volume. A visible node whose projected size
//! exceeds `min_screen_size` joins the visible set and its children are
//! visited; smaller nodes are represented by their ancestors' points.
//!
//! ```text
//! screen_size = (viewport_height / 2) · diagonal / (tan(fov / 2) · distance)
//! ```
//!
//! The visible set is then ranked by screen size (largest first) and whole
//! nodes are emitted until the running count exceeds the point budget.

use smallvec::SmallVec;

use super::ViewCamera;
use crate::constants::{DEFAULT_MIN_SCREEN_SIZE, DEFAULT_POINT_BUDGET};
use crate::error::IndexError;
use crate::octree::{NodeBounds, SpatialIndex, SpatialKey};

/// Per-query parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct QueryConfig {
  /// Point count after which no further node is emitted. The node that
  /// crosses it is emitted whole.
  pub point_budget: usize,

  /// Projected size (pixels) a visible node must exceed to be kept and
  /// expanded.
  pub min_screen_size: f64,
}

impl QueryConfig {
  /// Check that every value is usable.
  pub fn validate(&self) -> Result<(), IndexError> {
    if !self.min_screen_size.is_finite() || self.min_screen_size < 0.0 {
      return Err(IndexError::InvalidConfig(format!(
        "min_screen_size must be finite and non-negative, got {}",
        self.min_screen_size
      )));
    }
    Ok(())
  }
}

impl Default for QueryConfig {
  fn default() -> Self {
    Self {
      point_budget: DEFAULT_POINT_BUDGET,
      min_screen_size: DEFAULT_MIN_SCREEN_SIZE,
    }
  }
}

/// A node kept by the last traversal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibleNode {
  /// Node address.
  pub key: SpatialKey,
  /// Node cube.
  pub bounds: NodeBounds,
  /// Projected size in pixels for the camera of that traversal.
  pub screen_size: f64,
  /// Number of point indices the node holds.
  pub point_count: usize,
}

/// Counters from the last traversal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueryStats {
  /// Nodes reached (present in the index).
  pub nodes_tested: usize,
  /// Nodes rejected by the camera.
  pub nodes_culled: usize,
  /// Visible nodes at or below the screen-size threshold.
  pub nodes_too_small: usize,
  /// Nodes in the visible set.
  pub nodes_visible: usize,
  /// Point indices emitted by the last [`VisibilityQuery::query`].
  pub points_emitted: usize,
}

/// Projected on-screen size of a cube in pixels.
///
/// A camera at the cube center sees it as infinitely large.
pub fn screen_size<C: ViewCamera + ?Sized>(camera: &C, bounds: &NodeBounds) -> f64 {
  let distance = bounds.center.distance(camera.position());
  if !(distance > 0.0) {
    return f64::INFINITY;
  }
  let slope = (camera.field_of_view() * 0.5).tan();
  let half_height = camera.viewport_height() as f64 * 0.5;
  half_height * (bounds.diagonal() / (slope * distance))
}

/// Reusable visibility query.
///
/// Keeps its buffers between calls, so one instance per view avoids
/// per-frame allocation.
#[derive(Clone, Debug, Default)]
pub struct VisibilityQuery {
  config: QueryConfig,
  visible: Vec<VisibleNode>,
  output: Vec<u32>,
  stack: SmallVec<[SpatialKey; 64]>,
  stats: QueryStats,
}

impl VisibilityQuery {
  /// Create a query with validated parameters.
  pub fn new(config: QueryConfig) -> Result<Self, IndexError> {
    config.validate()?;
    Ok(Self {
      config,
      ..Default::default()
    })
  }

  /// Current parameters.
  pub fn config(&self) -> &QueryConfig {
    &self.config
  }

  /// Change the point budget for subsequent queries.
  pub fn set_point_budget(&mut self, budget: usize) {
    self.config.point_budget = budget;
  }

  /// Walk `index` for `camera` and rebuild the ranked visible set.
  #[cfg_attr(
    feature = "tracing",
    tracing::instrument(skip_all, name = "query::traverse_and_collect")
  )]
  pub fn traverse_and_collect<C: ViewCamera + ?Sized>(&mut self, index: &SpatialIndex, camera: &C) {
    self.visible.clear();
    self.stack.clear();
    self.stats = QueryStats::default();

    let root = SpatialKey::root();
    if index.contains_key(&root) {
      self.stack.push(root);
    }

    while let Some(key) = self.stack.pop() {
      let Some(node) = index.get(&key) else {
        continue;
      };
      self.stats.nodes_tested += 1;

      if !camera.is_visible(node.bounds.center, node.bounds.half_size) {
        self.stats.nodes_culled += 1;
        continue;
      }

      let size = screen_size(camera, &node.bounds);
      if !(size > self.config.min_screen_size) {
        self.stats.nodes_too_small += 1;
        continue;
      }

      self.visible.push(VisibleNode {
        key,
        bounds: node.bounds,
        screen_size: size,
        point_count: node.npoints(),
      });

      // Reversed so children pop in direction order 0..7.
      for child in key.get_children().into_iter().rev() {
        if index.contains_key(&child) {
          self.stack.push(child);
        }
      }
    }

    self
      .visible
      .sort_by(|a, b| b.screen_size.total_cmp(&a.screen_size));
    self.stats.nodes_visible = self.visible.len();
  }

  /// Emit point indices of the current visible set, whole nodes in rank
  /// order, stopping once the running count exceeds the budget.
  ///
  /// Call [`traverse_and_collect`](Self::traverse_and_collect) first.
  pub fn query_rendered_point(&mut self, index: &SpatialIndex) -> &[u32] {
    self.output.clear();
    for visible in &self.visible {
      if let Some(node) = index.get(&visible.key) {
        self.output.extend_from_slice(node.points());
      }
      if self.output.len() > self.config.point_budget {
        break;
      }
    }
    self.stats.points_emitted = self.output.len();
    &self.output
  }

  /// Traverse and emit in one call.
  pub fn query<C: ViewCamera + ?Sized>(&mut self, index: &SpatialIndex, camera: &C) -> &[u32] {
    self.traverse_and_collect(index, camera);
    let points = self.query_rendered_point(index);
    log::trace!("Query emitted {} points", points.len());
    points
  }

  /// Visible set of the last traversal, largest screen size first.
  pub fn visible_nodes(&self) -> &[VisibleNode] {
    &self.visible
  }

  /// Point indices emitted by the last query.
  pub fn output(&self) -> &[u32] {
    &self.output
  }

  /// Counters of the last traversal and query.
  pub fn stats(&self) -> QueryStats {
    self.stats
  }
}

/// One-shot query with the default screen-size threshold
/// ([`DEFAULT_MIN_SCREEN_SIZE`](crate::constants::DEFAULT_MIN_SCREEN_SIZE) px).
///
/// Use [`query_with_config`] for another threshold, or keep a
/// [`VisibilityQuery`] from [`VisibilityQuery::new`] to reuse its buffers
/// across frames.
pub fn query<C: ViewCamera + ?Sized>(index: &SpatialIndex, camera: &C, budget: usize) -> Vec<u32> {
  let mut q = VisibilityQuery {
    config: QueryConfig {
      point_budget: budget,
      ..Default::default()
    },
    ..Default::default()
  };
  q.query(index, camera).to_vec()
}

/// One-shot query with both budget and threshold taken from `config`.
pub fn query_with_config<C: ViewCamera + ?Sized>(
  index: &SpatialIndex,
  camera: &C,
  config: &QueryConfig,
) -> Result<Vec<u32>, IndexError> {
  let mut q = VisibilityQuery::new(config.clone())?;
  Ok(q.query(index, camera).to_vec())
}

#[cfg(test)]
#[path = "visibility_test.rs"]
mod visibility_test;
