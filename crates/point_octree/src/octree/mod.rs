//! Octree module: keys, nodes, and the adaptive point index.
//!
//! The tree is implicit. Nodes live in a hash map keyed by [`SpatialKey`];
//! parent/child relationships are computed from key coordinates, and a
//! missing key simply means that region holds no points.
//!
//! # Depth Convention
//!
//! Depth 0 = root cube (coarsest), higher depth = finer.
//!
//! ```text
//! Node side = root side / 2^depth
//! ```
//!
//! # Module Structure
//!
//! - [`key`]: `SpatialKey` - immutable address of an octree cell
//! - [`bounds`]: `DAabb3` root extent and `NodeBounds` cube descriptor
//! - [`node`]: `Node` - point indices plus build-time occupancy
//! - [`config`]: `IndexConfig` - grid size and per-node point cap
//! - [`index`]: `SpatialIndex` - construction and lookup

pub mod bounds;
pub mod config;
pub mod index;
pub mod key;
pub mod node;

// Re-exports
pub use bounds::{DAabb3, NodeBounds};
pub use config::IndexConfig;
pub use index::{compute_max_depth, IndexSummary, SpatialIndex, MAX_POINTS};
pub use key::SpatialKey;
pub use node::Node;
