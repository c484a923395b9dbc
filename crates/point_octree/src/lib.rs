//! point_octree - Adaptive octree level-of-detail index for huge point clouds
//!
//! This crate indexes tens to billions of 3D points into an implicit octree
//! whose nodes each hold an evenly spread sample of the points in their
//! cube. Coarse nodes near the root summarize the whole cloud; deeper nodes
//! add detail. A viewpoint-driven query walks the tree, keeps what is both
//! visible and large on screen, and returns a point list bounded by a
//! per-frame budget.
//!
//! # Features
//!
//! - **One-pass construction**: occupancy-grid acceptance, first writer
//!   wins, collisions pushed one level deeper
//! - **Compact persistence**: versioned little-endian binary layout
//! - **Budgeted queries**: frustum culling, projected-size expansion, whole
//!   nodes ranked by screen size
//! - **Background loading**: build or read on rayon's pool, poll per frame
//!
//! # Example
//!
//! ```ignore
//! use point_octree::{IndexConfig, PerspectiveCamera, PointColumns, SpatialIndex, VisibilityQuery};
//!
//! let points = PointColumns::new(&x, &y, &z)?;
//! let index = SpatialIndex::build(&points, IndexConfig::default())?;
//! point_octree::serialize::save(&index, "cloud.epto")?;
//!
//! let camera = PerspectiveCamera::new(eye, target, 1280, 720);
//! let mut query = VisibilityQuery::default();
//! for &i in query.query(&index, &camera) {
//!     // draw point i
//! }
//! ```

pub mod constants;
pub mod error;
pub mod points;

// Re-export commonly used items
pub use constants::{
  cell_to_id, DEFAULT_GRID_SIZE, DEFAULT_MAX_POINTS_PER_NODE, DEFAULT_MIN_SCREEN_SIZE,
  DEFAULT_POINT_BUDGET,
};
pub use error::IndexError;
pub use points::{PointCloud, PointColumns, PointSource};

// Octree index: keys, nodes, construction
pub mod octree;
pub use octree::{DAabb3, IndexConfig, IndexSummary, Node, NodeBounds, SpatialIndex, SpatialKey};

// Binary persistence
pub mod serialize;

// Camera-driven retrieval
pub mod query;
pub use query::{
  PerspectiveCamera, QueryConfig, QueryStats, ViewCamera, VisibilityQuery, VisibleNode,
};

// Per-point colors for rendering backends
pub mod quantile;
pub mod render;
pub use render::{emit_rendered_points, ColorMapper, RenderedPoint, ScalarRamp};

// Background build/load
pub mod loader;
pub use loader::{IndexLoader, PendingIndex};
