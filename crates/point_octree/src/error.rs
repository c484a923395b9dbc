//! Error type shared by construction, persistence, and loading.

use thiserror::Error;

/// Errors raised while building, reading, or writing an index.
///
/// Query-time conditions (nothing visible, zero budget) are not errors.
#[derive(Debug, Error)]
pub enum IndexError {
  /// More points than a 32-bit point index can address.
  #[error("point count {points} exceeds the index capacity of {max}")]
  CapacityExceeded {
    /// Number of points offered.
    points: usize,
    /// Largest supported point count.
    max: usize,
  },

  /// Coordinate columns do not have the same length.
  #[error("coordinate columns differ in length (x = {x}, y = {y}, z = {z})")]
  MismatchedColumns {
    /// Length of the x column.
    x: usize,
    /// Length of the y column.
    y: usize,
    /// Length of the z column.
    z: usize,
  },

  /// A configuration value is out of range.
  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  /// The persisted data is not a readable index.
  #[error("invalid index file: {0}")]
  Format(String),

  /// The stream ended inside a declared field or point list.
  #[error("index file is truncated")]
  Truncated,

  /// Insertion into an index that was read from storage.
  #[error("index was loaded from storage and is query-only")]
  QueryOnly,

  /// A background build or read ended without delivering a result.
  #[error("index worker exited without a result")]
  WorkerLost,

  /// The result of a background build or read was already taken.
  #[error("index result was already taken")]
  ResultTaken,

  /// Any other I/O failure.
  #[error(transparent)]
  Io(#[from] std::io::Error),
}
