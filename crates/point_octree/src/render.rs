//! Turning query output into colored points for a rendering backend.
//!
//! The index only returns point indices. A [`ColorMapper`] picks a color per
//! index from whatever attribute the host shows: elevation or intensity
//! through a [`ScalarRamp`], classification through [`ClassPalette`], or
//! stored RGB through any closure.

use crate::error::IndexError;
use crate::quantile::P2Quantile;

/// One point ready to draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderedPoint {
  /// Index into the host's point columns.
  pub index: u32,
  /// 8-bit RGB.
  pub color: [u8; 3],
}

/// Per-point color lookup.
pub trait ColorMapper {
  /// Color of point `index`.
  fn color_for(&self, index: u32) -> [u8; 3];
}

impl<F: Fn(u32) -> [u8; 3]> ColorMapper for F {
  fn color_for(&self, index: u32) -> [u8; 3] {
    self(index)
  }
}

/// Color for indices a mapper has no value for.
pub const MISSING_COLOR: [u8; 3] = [128, 128, 128];

/// Pair each index with its color, keeping query order.
pub fn emit_rendered_points<M: ColorMapper + ?Sized>(indices: &[u32], mapper: &M) -> Vec<RenderedPoint> {
  indices
    .iter()
    .map(|&index| RenderedPoint {
      index,
      color: mapper.color_for(index),
    })
    .collect()
}

/// Blue → cyan → green → yellow → red.
const RAMP_STOPS: [[u8; 3]; 5] = [
  [0, 0, 255],
  [0, 255, 255],
  [0, 255, 0],
  [255, 255, 0],
  [255, 0, 0],
];

/// Height-style ramp color for `t` in `0..=1` (clamped).
pub fn ramp_color(t: f64) -> [u8; 3] {
  let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
  let segments = (RAMP_STOPS.len() - 1) as f64;
  let x = t * segments;
  let i = (x.floor() as usize).min(RAMP_STOPS.len() - 2);
  let f = x - i as f64;
  let (a, b) = (RAMP_STOPS[i], RAMP_STOPS[i + 1]);
  std::array::from_fn(|c| (a[c] as f64 + (b[c] as f64 - a[c] as f64) * f).round() as u8)
}

/// Maps a per-point scalar column through [`ramp_color`] between two
/// bounds. Values outside the bounds saturate.
#[derive(Clone, Debug)]
pub struct ScalarRamp<'a> {
  values: &'a [f64],
  low: f64,
  high: f64,
}

impl<'a> ScalarRamp<'a> {
  /// Ramp between the `low_q` and `high_q` quantiles of `values`, estimated
  /// in one pass. Outliers beyond those quantiles do not stretch the ramp.
  pub fn from_values(values: &'a [f64], low_q: f64, high_q: f64) -> Result<Self, IndexError> {
    if !(0.0..=1.0).contains(&low_q) || !(0.0..=1.0).contains(&high_q) || low_q >= high_q {
      return Err(IndexError::InvalidConfig(format!(
        "ramp quantiles must satisfy 0 <= low < high <= 1, got {} and {}",
        low_q, high_q
      )));
    }

    let mut lo = P2Quantile::new(low_q);
    let mut hi = P2Quantile::new(high_q);
    for &v in values.iter().filter(|v| v.is_finite()) {
      lo.add(v);
      hi.add(v);
    }
    let low = lo.quantile().unwrap_or(0.0);
    let high = hi.quantile().unwrap_or(low).max(low);
    log::debug!("Scalar ramp range {}..{}", low, high);

    Ok(Self { values, low, high })
  }

  /// Ramp between explicit bounds (swapped if reversed).
  pub fn with_range(values: &'a [f64], low: f64, high: f64) -> Self {
    Self {
      values,
      low: low.min(high),
      high: low.max(high),
    }
  }

  /// Lower and upper bound.
  pub fn range(&self) -> (f64, f64) {
    (self.low, self.high)
  }

  /// Position of `value` on the ramp, `0..=1`. A zero-width range maps
  /// everything to the middle.
  pub fn normalized(&self, value: f64) -> f64 {
    let span = self.high - self.low;
    if !(span > 0.0) {
      return 0.5;
    }
    ((value - self.low) / span).clamp(0.0, 1.0)
  }
}

impl ColorMapper for ScalarRamp<'_> {
  fn color_for(&self, index: u32) -> [u8; 3] {
    match self.values.get(index as usize) {
      Some(&v) if !v.is_nan() => ramp_color(self.normalized(v)),
      _ => MISSING_COLOR,
    }
  }
}

/// Fixed colors for the standard LAS classification codes.
#[derive(Clone, Debug)]
pub struct ClassPalette<'a> {
  classes: &'a [u8],
}

impl<'a> ClassPalette<'a> {
  /// Palette over a per-point classification column.
  pub fn new(classes: &'a [u8]) -> Self {
    Self { classes }
  }

  /// Color of one class code.
  pub fn class_color(class: u8) -> [u8; 3] {
    match class {
      2 => [160, 120, 60],    // ground
      3 => [120, 200, 100],   // low vegetation
      4 => [60, 170, 60],     // medium vegetation
      5 => [20, 110, 20],     // high vegetation
      6 => [220, 60, 50],     // building
      7 => [255, 0, 255],     // noise
      9 => [40, 90, 230],     // water
      17 => [230, 200, 40],   // bridge deck
      18 => [255, 0, 255],    // high noise
      _ => [200, 200, 200],
    }
  }
}

impl ColorMapper for ClassPalette<'_> {
  fn color_for(&self, index: u32) -> [u8; 3] {
    self
      .classes
      .get(index as usize)
      .map_or(MISSING_COLOR, |&c| Self::class_color(c))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_closure_mapper_keeps_order() {
    let mapper = |i: u32| [i as u8, 0, 0];
    let out = emit_rendered_points(&[3, 1, 2], &mapper);
    assert_eq!(
      out,
      vec![
        RenderedPoint { index: 3, color: [3, 0, 0] },
        RenderedPoint { index: 1, color: [1, 0, 0] },
        RenderedPoint { index: 2, color: [2, 0, 0] },
      ]
    );
  }

  #[test]
  fn test_ramp_endpoints_and_midpoint() {
    assert_eq!(ramp_color(0.0), [0, 0, 255]);
    assert_eq!(ramp_color(0.5), [0, 255, 0]);
    assert_eq!(ramp_color(1.0), [255, 0, 0]);
    assert_eq!(ramp_color(-3.0), [0, 0, 255]);
    assert_eq!(ramp_color(7.0), [255, 0, 0]);
  }

  #[test]
  fn test_scalar_ramp_saturates_outside_range() {
    let values = [0.0, 5.0, 10.0, -100.0, 100.0];
    let ramp = ScalarRamp::with_range(&values, 0.0, 10.0);
    assert_eq!(ramp.color_for(0), [0, 0, 255]);
    assert_eq!(ramp.color_for(1), [0, 255, 0]);
    assert_eq!(ramp.color_for(2), [255, 0, 0]);
    assert_eq!(ramp.color_for(3), [0, 0, 255]);
    assert_eq!(ramp.color_for(4), [255, 0, 0]);
    assert_eq!(ramp.color_for(99), MISSING_COLOR);
  }

  #[test]
  fn test_scalar_ramp_quantiles_ignore_outliers() {
    let mut values: Vec<f64> = (0..10_000).map(|i| (i % 100) as f64).collect();
    values.push(1e9);
    values.push(-1e9);
    let ramp = ScalarRamp::from_values(&values, 0.02, 0.98).unwrap();
    let (low, high) = ramp.range();
    assert!(low > -10.0 && low < 10.0, "low = {}", low);
    assert!(high > 90.0 && high < 110.0, "high = {}", high);
  }

  #[test]
  fn test_scalar_ramp_rejects_bad_quantiles() {
    let values = [1.0];
    assert!(ScalarRamp::from_values(&values, 0.9, 0.1).is_err());
    assert!(ScalarRamp::from_values(&values, -0.1, 0.5).is_err());
    assert!(ScalarRamp::from_values(&values, 0.5, 0.5).is_err());
  }

  #[test]
  fn test_flat_ramp_maps_to_middle() {
    let values = [4.0; 10];
    let ramp = ScalarRamp::from_values(&values, 0.05, 0.95).unwrap();
    assert_eq!(ramp.range(), (4.0, 4.0));
    assert_eq!(ramp.color_for(0), ramp_color(0.5));
  }

  #[test]
  fn test_class_palette() {
    let classes = [2u8, 6, 42];
    let palette = ClassPalette::new(&classes);
    let out = emit_rendered_points(&[0, 1, 2, 3], &palette);
    assert_eq!(out[0].color, ClassPalette::class_color(2));
    assert_eq!(out[1].color, [220, 60, 50]);
    assert_eq!(out[2].color, [200, 200, 200]);
    assert_eq!(out[3].color, MISSING_COLOR);
  }
}
