//! Viewpoint-driven retrieval of points from a [`SpatialIndex`](crate::SpatialIndex).
//!
//! - [`camera`]: `ViewCamera` trait, `Frustum`, `PerspectiveCamera`
//! - [`visibility`]: `VisibilityQuery` - traversal, ranking, budget cutoff

pub mod camera;
pub mod visibility;

pub use camera::{Frustum, PerspectiveCamera, ViewCamera};
pub use visibility::{query, query_with_config, screen_size, QueryConfig, QueryStats, VisibilityQuery, VisibleNode};
