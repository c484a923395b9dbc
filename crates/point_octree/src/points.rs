//! Point sources consumed by index construction.
//!
//! The index never stores coordinates. It reads them through [`PointSource`]
//! while inserting and afterwards refers to points only by index.

use glam::DVec3;

use crate::error::IndexError;

/// Random-access, read-only point coordinates.
///
/// `Sync` so the root extent can be reduced across rayon workers.
pub trait PointSource: Sync {
  /// Number of points.
  fn len(&self) -> usize;

  /// Position of point `index`. Panics if out of range.
  fn position(&self, index: usize) -> DVec3;

  /// True when there are no points.
  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Three borrowed, equal-length coordinate columns.
#[derive(Clone, Copy, Debug)]
pub struct PointColumns<'a> {
  x: &'a [f64],
  y: &'a [f64],
  z: &'a [f64],
}

impl<'a> PointColumns<'a> {
  /// Wrap three coordinate columns, checking that their lengths agree.
  pub fn new(x: &'a [f64], y: &'a [f64], z: &'a [f64]) -> Result<Self, IndexError> {
    if x.len() != y.len() || x.len() != z.len() {
      return Err(IndexError::MismatchedColumns {
        x: x.len(),
        y: y.len(),
        z: z.len(),
      });
    }
    Ok(Self { x, y, z })
  }

  /// The x column.
  pub fn x(&self) -> &'a [f64] {
    self.x
  }

  /// The y column.
  pub fn y(&self) -> &'a [f64] {
    self.y
  }

  /// The z column.
  pub fn z(&self) -> &'a [f64] {
    self.z
  }
}

impl PointSource for PointColumns<'_> {
  #[inline]
  fn len(&self) -> usize {
    self.x.len()
  }

  #[inline]
  fn position(&self, index: usize) -> DVec3 {
    DVec3::new(self.x[index], self.y[index], self.z[index])
  }
}

/// Owned coordinate columns.
///
/// Use this when the index is built on another thread (see
/// [`crate::loader::IndexLoader`]) and the points must be `'static`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointCloud {
  x: Vec<f64>,
  y: Vec<f64>,
  z: Vec<f64>,
}

impl PointCloud {
  /// Take ownership of three coordinate columns.
  pub fn new(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Result<Self, IndexError> {
    PointColumns::new(&x, &y, &z)?;
    Ok(Self { x, y, z })
  }

  /// Borrow as columns.
  pub fn columns(&self) -> PointColumns<'_> {
    PointColumns {
      x: &self.x,
      y: &self.y,
      z: &self.z,
    }
  }

  /// Append one point.
  pub fn push(&mut self, p: DVec3) {
    self.x.push(p.x);
    self.y.push(p.y);
    self.z.push(p.z);
  }
}

impl FromIterator<DVec3> for PointCloud {
  fn from_iter<I: IntoIterator<Item = DVec3>>(iter: I) -> Self {
    let mut cloud = PointCloud::default();
    for p in iter {
      cloud.push(p);
    }
    cloud
  }
}

impl PointSource for PointCloud {
  #[inline]
  fn len(&self) -> usize {
    self.x.len()
  }

  #[inline]
  fn position(&self, index: usize) -> DVec3 {
    DVec3::new(self.x[index], self.y[index], self.z[index])
  }
}

impl PointSource for [DVec3] {
  #[inline]
  fn len(&self) -> usize {
    <[DVec3]>::len(self)
  }

  #[inline]
  fn position(&self, index: usize) -> DVec3 {
    self[index]
  }
}

impl PointSource for Vec<DVec3> {
  #[inline]
  fn len(&self) -> usize {
    Vec::len(self)
  }

  #[inline]
  fn position(&self, index: usize) -> DVec3 {
    self[index]
  }
}
