//! Axis-aligned bounds with double precision for huge survey coordinates.

use glam::DVec3;
use rayon::prelude::*;

use super::SpatialKey;
use crate::constants::PARALLEL_EXTENT_THRESHOLD;
use crate::points::PointSource;

/// Extent of a point cloud in world coordinates.
///
/// The index root is always a cube (see [`DAabb3::to_cube`]).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DAabb3 {
	/// Lowest coordinate on each axis.
	pub min: DVec3,
	/// Highest coordinate on each axis.
	pub max: DVec3,
}

impl DAabb3 {
	/// Empty box: folding any point into it yields that point.
	pub const EMPTY: Self = Self {
		min: DVec3::splat(f64::INFINITY),
		max: DVec3::splat(f64::NEG_INFINITY),
	};

	/// Box spanning `min` to `max`, both corners inclusive.
	pub fn new(min: DVec3, max: DVec3) -> Self {
		debug_assert!(min.cmple(max).all(), "inverted box: {min} > {max}");
		Self { min, max }
	}

	/// Exact extent of all points, or None when there are none.
	///
	/// Large inputs are reduced in parallel on rayon's pool.
	pub fn from_points<P: PointSource + ?Sized>(points: &P) -> Option<Self> {
		let n = points.len();
		if n == 0 {
			return None;
		}

		let aabb = if n >= PARALLEL_EXTENT_THRESHOLD {
			(0..n)
				.into_par_iter()
				.fold(|| Self::EMPTY, |acc, i| acc.encapsulate(points.position(i)))
				.reduce(|| Self::EMPTY, |a, b| a.union(&b))
		} else {
			(0..n).fold(Self::EMPTY, |acc, i| acc.encapsulate(points.position(i)))
		};
		Some(aabb)
	}

	/// Grow to include a point.
	#[inline]
	pub fn encapsulate(self, p: DVec3) -> Self {
		Self {
			min: self.min.min(p),
			max: self.max.max(p),
		}
	}

	/// Smallest box containing both.
	#[inline]
	pub fn union(&self, other: &DAabb3) -> Self {
		Self {
			min: self.min.min(other.min),
			max: self.max.max(other.max),
		}
	}

	/// Cube sharing this box's center, with side equal to the largest
	/// dimension.
	pub fn to_cube(&self) -> Self {
		let half = DVec3::splat(self.size().max_element() * 0.5);
		let center = self.center();
		Self {
			min: center - half,
			max: center + half,
		}
	}

	/// Side lengths per axis.
	#[inline]
	pub fn size(&self) -> DVec3 {
		self.max - self.min
	}

	/// Midpoint of the box.
	#[inline]
	pub fn center(&self) -> DVec3 {
		(self.min + self.max) * 0.5
	}
}

/// Cubic bounds of one node: center plus half the side length.
///
/// Fixed when the node is created and never updated as points arrive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeBounds {
	/// Cube center.
	pub center: DVec3,
	/// Half the cube side.
	pub half_size: f64,
}

impl NodeBounds {
	/// Create from center and half side.
	pub fn new(center: DVec3, half_size: f64) -> Self {
		Self { center, half_size }
	}

	/// Bounds of the cell at `key` inside the cubic `root`.
	///
	/// Returns `None` for keys that address no cell: the invalid key, depths
	/// past
	/// [`MAX_SUPPORTED_DEPTH`](crate::constants::MAX_SUPPORTED_DEPTH), or coordinates outside the grid.
	pub fn of_key(root: &DAabb3, key: &SpatialKey) -> Option<Self> {
		key.is_within_depth().then(|| Self::in_root(root, key))
	}

	/// [`of_key`](Self::of_key) for keys already known to address a cell.
	pub(crate) fn in_root(root: &DAabb3, key: &SpatialKey) -> Self {
		debug_assert!(key.is_within_depth(), "key {key:?} addresses no cell");
		let res = root.size().x / (1u64 << key.depth) as f64;
		let min = root.min + DVec3::new(key.x as f64, key.y as f64, key.z as f64) * res;
		Self::new(min + DVec3::splat(res * 0.5), res * 0.5)
	}

	/// Minimum corner.
	#[inline]
	pub fn min(&self) -> DVec3 {
		self.center - DVec3::splat(self.half_size)
	}

	/// Full space diagonal of the cube (`2·h·√3`).
	#[inline]
	pub fn diagonal(&self) -> f64 {
		self.half_size * 2.0 * 3f64.sqrt()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::constants::MAX_SUPPORTED_DEPTH;
	use crate::points::PointCloud;

	#[test]
	fn test_empty_folds_to_first_point() {
		let p = DVec3::new(3.0, -1.0, 7.5);
		let aabb = DAabb3::EMPTY.encapsulate(p);
		assert_eq!(aabb, DAabb3::new(p, p));
		assert_eq!(aabb.size(), DVec3::ZERO);
	}

	#[test]
	fn test_union_of_disjoint_boxes() {
		let a = DAabb3::new(DVec3::ZERO, DVec3::ONE);
		let b = DAabb3::new(DVec3::new(4.0, -2.0, 0.5), DVec3::new(5.0, -1.0, 0.75));
		let u = a.union(&b);
		assert_eq!(u.min, DVec3::new(0.0, -2.0, 0.0));
		assert_eq!(u.max, DVec3::new(5.0, 1.0, 1.0));
		assert_eq!(u, b.union(&a));
	}

	#[test]
	fn test_from_points_exact_extent() {
		let cloud: PointCloud = [
			DVec3::new(1.0, 5.0, -2.0),
			DVec3::new(-3.0, 2.0, 4.0),
			DVec3::new(0.0, 0.0, 0.0),
		]
		.into_iter()
		.collect();

		let aabb = DAabb3::from_points(&cloud).unwrap();
		assert_eq!(aabb.min, DVec3::new(-3.0, 0.0, -2.0));
		assert_eq!(aabb.max, DVec3::new(1.0, 5.0, 4.0));
	}

	#[test]
	fn test_from_points_empty() {
		assert!(DAabb3::from_points(&PointCloud::default()).is_none());
	}

	/// The parallel reduction must agree with the sequential fold.
	#[test]
	fn test_from_points_parallel_matches_sequential() {
		let n = PARALLEL_EXTENT_THRESHOLD + 17;
		let cloud: PointCloud = (0..n)
			.map(|i| {
				let t = i as f64;
				DVec3::new(t.sin() * 50.0, (t * 0.5).cos() * 20.0, t * 0.001)
			})
			.collect();

		let parallel = DAabb3::from_points(&cloud).unwrap();
		let sequential = (0..n).fold(DAabb3::EMPTY, |acc, i| acc.encapsulate(cloud.position(i)));
		assert_eq!(parallel, sequential);
	}

	#[test]
	fn test_to_cube_uses_largest_dimension() {
		let aabb = DAabb3::new(DVec3::new(0.0, 0.0, 0.0), DVec3::new(10.0, 4.0, 2.0));
		let cube = aabb.to_cube();
		assert_eq!(cube.center(), DVec3::new(5.0, 2.0, 1.0));
		assert_eq!(cube.size(), DVec3::splat(10.0));
		assert!(cube.min.cmple(aabb.min).all());
		assert!(cube.max.cmpge(aabb.max).all());
	}

	#[test]
	fn test_node_bounds_diagonal() {
		let b = NodeBounds::new(DVec3::ZERO, 1.0);
		assert!((b.diagonal() - 2.0 * 3f64.sqrt()).abs() < 1e-12);
		assert_eq!(b.min(), DVec3::splat(-1.0));
	}

	#[test]
	fn test_of_key_subdivides_root() {
		let root = DAabb3::new(DVec3::ZERO, DVec3::splat(8.0));

		let whole = NodeBounds::of_key(&root, &SpatialKey::root()).unwrap();
		assert_eq!(whole.center, DVec3::splat(4.0));
		assert_eq!(whole.half_size, 4.0);

		let corner = NodeBounds::of_key(&root, &SpatialKey::new(2, 3, 0, 1)).unwrap();
		assert_eq!(corner.half_size, 1.0);
		assert_eq!(corner.center, DVec3::new(7.0, 1.0, 3.0));
	}

	#[test]
	fn test_of_key_rejects_keys_outside_grid() {
		let root = DAabb3::new(DVec3::ZERO, DVec3::splat(8.0));
		for key in [
			SpatialKey::INVALID,
			SpatialKey::new(1, 2, 0, 0),
			SpatialKey::new(2, 0, -1, 0),
			SpatialKey::new(MAX_SUPPORTED_DEPTH + 1, 0, 0, 0),
			SpatialKey::new(64, 0, 0, 0),
		] {
			assert_eq!(NodeBounds::of_key(&root, &key), None, "{:?}", key);
		}

		let deepest = SpatialKey::new(MAX_SUPPORTED_DEPTH, (1 << MAX_SUPPORTED_DEPTH) - 1, 0, 0);
		let cell = NodeBounds::of_key(&root, &deepest).unwrap();
		assert!(cell.center.x < 8.0 && cell.half_size > 0.0);
	}
}
