//! Streaming quantile estimation with the P² algorithm (Jain & Chlamtac).
//!
//! Five markers track the minimum, the target quantile, the maximum, and
//! two midpoints. Memory is constant, so a ramp range can be estimated over
//! billions of values in one pass.

/// One-pass estimator of a single quantile.
#[derive(Clone, Debug)]
pub struct P2Quantile {
  p: f64,
  count: usize,
  heights: [f64; 5],
  positions: [f64; 5],
  desired: [f64; 5],
  increments: [f64; 5],
}

impl P2Quantile {
  /// Estimator for quantile `p`, clamped to `0..=1`.
  pub fn new(p: f64) -> Self {
    let p = if p.is_nan() { 0.5 } else { p.clamp(0.0, 1.0) };
    Self {
      p,
      count: 0,
      heights: [0.0; 5],
      positions: [1.0, 2.0, 3.0, 4.0, 5.0],
      desired: [1.0, 1.0 + 2.0 * p, 1.0 + 4.0 * p, 3.0 + 2.0 * p, 5.0],
      increments: [0.0, p / 2.0, p, (1.0 + p) / 2.0, 1.0],
    }
  }

  /// Target quantile.
  pub fn p(&self) -> f64 {
    self.p
  }

  /// Number of observations taken (NaN values are skipped).
  pub fn count(&self) -> usize {
    self.count
  }

  /// Add one observation.
  pub fn add(&mut self, x: f64) {
    if x.is_nan() {
      return;
    }

    if self.count < 5 {
      self.heights[self.count] = x;
      self.count += 1;
      if self.count == 5 {
        self.heights.sort_by(f64::total_cmp);
      }
      return;
    }
    self.count += 1;

    let h = &mut self.heights;
    let k = if x < h[0] {
      h[0] = x;
      0
    } else if x >= h[4] {
      h[4] = x;
      3
    } else {
      (0..4).rfind(|&i| h[i] <= x).unwrap_or(0)
    };

    for pos in &mut self.positions[k + 1..] {
      *pos += 1.0;
    }
    for (d, inc) in self.desired.iter_mut().zip(self.increments) {
      *d += inc;
    }

    for i in 1..4 {
      let d = self.desired[i] - self.positions[i];
      let n = &self.positions;
      if (d >= 1.0 && n[i + 1] - n[i] > 1.0) || (d <= -1.0 && n[i - 1] - n[i] < -1.0) {
        let s = d.signum();
        let candidate = self.parabolic(i, s);
        self.heights[i] = if self.heights[i - 1] < candidate && candidate < self.heights[i + 1] {
          candidate
        } else {
          self.linear(i, s)
        };
        self.positions[i] += s;
      }
    }
  }

  /// Current estimate, or None before the first observation.
  ///
  /// With fewer than five observations the nearest-rank value is returned.
  pub fn quantile(&self) -> Option<f64> {
    match self.count {
      0 => None,
      n if n < 5 => {
        let mut seen = self.heights;
        let seen = &mut seen[..n];
        seen.sort_by(f64::total_cmp);
        let rank = ((n - 1) as f64 * self.p).round() as usize;
        Some(seen[rank])
      }
      _ => Some(self.heights[2]),
    }
  }

  fn parabolic(&self, i: usize, s: f64) -> f64 {
    let (q, n) = (&self.heights, &self.positions);
    q[i]
      + s / (n[i + 1] - n[i - 1])
        * ((n[i] - n[i - 1] + s) * (q[i + 1] - q[i]) / (n[i + 1] - n[i])
          + (n[i + 1] - n[i] - s) * (q[i] - q[i - 1]) / (n[i] - n[i - 1]))
  }

  fn linear(&self, i: usize, s: f64) -> f64 {
    let j = if s > 0.0 { i + 1 } else { i - 1 };
    let (q, n) = (&self.heights, &self.positions);
    q[i] + s * (q[j] - q[i]) / (n[j] - n[i])
  }
}

impl Extend<f64> for P2Quantile {
  fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
    for x in iter {
      self.add(x);
    }
  }
}
