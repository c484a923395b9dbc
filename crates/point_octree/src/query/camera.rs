//! Viewpoint collaborator for visibility queries.
//!
//! A query needs four things from a camera: a cube-versus-view-volume test,
//! the eye position, and the viewport height with vertical field of view to
//! turn world size into pixels. [`ViewCamera`] captures exactly that;
//! [`PerspectiveCamera`] is a ready-made implementation.

use glam::{DMat4, DVec3, DVec4};

/// Camera state consumed by [`VisibilityQuery`](super::VisibilityQuery).
pub trait ViewCamera {
  /// Whether the cube at `center` with half side `half_size` intersects the
  /// view volume. Conservative answers (true for cubes just outside) are
  /// acceptable.
  fn is_visible(&self, center: DVec3, half_size: f64) -> bool;

  /// Eye position in world space.
  fn position(&self) -> DVec3;

  /// Viewport height in pixels.
  fn viewport_height(&self) -> u32;

  /// Vertical field of view in radians.
  fn field_of_view(&self) -> f64;
}

impl<T: ViewCamera + ?Sized> ViewCamera for &T {
  fn is_visible(&self, center: DVec3, half_size: f64) -> bool {
    (**self).is_visible(center, half_size)
  }

  fn position(&self) -> DVec3 {
    (**self).position()
  }

  fn viewport_height(&self) -> u32 {
    (**self).viewport_height()
  }

  fn field_of_view(&self) -> f64 {
    (**self).field_of_view()
  }
}

/// Six clip planes `(n, d)` with `n·p + d >= 0` on the inside.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
  planes: [DVec4; 6],
}

impl Frustum {
  /// Extract the planes of a view-projection matrix (clip z in `-w..w`).
  ///
  /// Order: left, right, bottom, top, near, far.
  pub fn from_view_projection(m: &DMat4) -> Self {
    let (r0, r1, r2, r3) = (m.row(0), m.row(1), m.row(2), m.row(3));
    let planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r3 + r2, r3 - r2].map(|p| {
      let len = p.truncate().length();
      if len > 0.0 {
        p / len
      } else {
        p
      }
    });
    Self { planes }
  }

  /// Planes in left, right, bottom, top, near, far order.
  pub fn planes(&self) -> &[DVec4; 6] {
    &self.planes
  }

  /// Cube test against every plane using the corner furthest along the
  /// plane normal. False only when the cube is wholly outside some plane.
  pub fn contains_cube(&self, center: DVec3, half_size: f64) -> bool {
    self.planes.iter().all(|plane| {
      let n = plane.truncate();
      let corner = center + DVec3::splat(half_size) * n.signum();
      n.dot(corner) + plane.w >= 0.0
    })
  }

  /// Point test.
  pub fn contains_point(&self, p: DVec3) -> bool {
    self.contains_cube(p, 0.0)
  }
}

/// Pinhole camera looking from `eye` towards `target`.
#[derive(Clone, Debug)]
pub struct PerspectiveCamera {
  eye: DVec3,
  target: DVec3,
  up: DVec3,
  /// Vertical field of view, radians.
  fov_y: f64,
  viewport: (u32, u32),
  near: f64,
  far: f64,
  frustum: Frustum,
}

impl PerspectiveCamera {
  /// Default vertical field of view (70°).
  pub const DEFAULT_FOV_Y: f64 = 70.0 * std::f64::consts::PI / 180.0;

  /// Camera at `eye` looking at `target`, Z up, default field of view and
  /// clip range `0.1..1e7`.
  pub fn new(eye: DVec3, target: DVec3, viewport_width: u32, viewport_height: u32) -> Self {
    let mut camera = Self {
      eye,
      target,
      up: DVec3::Z,
      fov_y: Self::DEFAULT_FOV_Y,
      viewport: (viewport_width, viewport_height),
      near: 0.1,
      far: 1e7,
      frustum: Frustum::from_view_projection(&DMat4::IDENTITY),
    };
    camera.update_frustum();
    camera
  }

  /// Replace the vertical field of view (radians).
  pub fn with_fov(mut self, fov_y: f64) -> Self {
    self.fov_y = fov_y;
    self.update_frustum();
    self
  }

  /// Replace the near and far clip distances.
  pub fn with_clip(mut self, near: f64, far: f64) -> Self {
    self.near = near;
    self.far = far;
    self.update_frustum();
    self
  }

  /// Replace the up vector.
  pub fn with_up(mut self, up: DVec3) -> Self {
    self.up = up;
    self.update_frustum();
    self
  }

  /// Move the camera.
  pub fn look_at(&mut self, eye: DVec3, target: DVec3) {
    self.eye = eye;
    self.target = target;
    self.update_frustum();
  }

  /// Change the viewport size in pixels.
  pub fn resize(&mut self, width: u32, height: u32) {
    self.viewport = (width, height);
    self.update_frustum();
  }

  /// Point the camera looks at.
  pub fn target(&self) -> DVec3 {
    self.target
  }

  /// Viewport width and height in pixels.
  pub fn viewport(&self) -> (u32, u32) {
    self.viewport
  }

  /// Current clip planes.
  pub fn frustum(&self) -> &Frustum {
    &self.frustum
  }

  /// Projection times view, OpenGL clip convention.
  pub fn view_projection(&self) -> DMat4 {
    let (w, h) = self.viewport;
    let aspect = w.max(1) as f64 / h.max(1) as f64;
    let proj = DMat4::perspective_rh_gl(self.fov_y, aspect, self.near, self.far);
    let view = DMat4::look_at_rh(self.eye, self.target, self.up);
    proj * view
  }

  fn update_frustum(&mut self) {
    self.frustum = Frustum::from_view_projection(&self.view_projection());
  }
}

impl ViewCamera for PerspectiveCamera {
  fn is_visible(&self, center: DVec3, half_size: f64) -> bool {
    self.frustum.contains_cube(center, half_size)
  }

  fn position(&self) -> DVec3 {
    self.eye
  }

  fn viewport_height(&self) -> u32 {
    self.viewport.1
  }

  fn field_of_view(&self) -> f64 {
    self.fov_y
  }
}
