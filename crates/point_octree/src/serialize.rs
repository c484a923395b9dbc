//! Versioned binary persistence of a [`SpatialIndex`].
//!
//! # Layout (little-endian)
//!
//! ```text
//! ┌──────────────┬──────────────────────────────────────────────┐
//! │ 4 bytes      │ signature "EPTO"                             │
//! │ i32, i32     │ major, minor version                         │
//! │ 6 × f64      │ root xmin, ymin, zmin, xmax, ymax, zmax      │
//! │ f64          │ spacing (mirrors zmax)                       │
//! │ u64          │ node count                                   │
//! ├──────────────┴──────────────────────────────────────────────┤
//! │ per node:  4 × i32 key (depth, x, y, z)                     │
//! │            u64 point count                                  │
//! │            count × u32 point index                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nodes are written in [`SpatialKey`] order so identical indexes produce
//! identical bytes. Occupancy grids are not stored; a read index is
//! query-only.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use glam::DVec3;

use crate::constants::{FORMAT_SIGNATURE, FORMAT_VERSION_MAJOR, FORMAT_VERSION_MINOR};
use crate::error::IndexError;
use crate::octree::{DAabb3, Node, NodeBounds, SpatialIndex, SpatialKey, MAX_POINTS};

/// Bytes before the first node record.
pub const HEADER_LEN: usize = 4 + 2 * 4 + 7 * 8 + 8;

/// Point indices decoded per read call.
const READ_CHUNK: usize = 1 << 16;

/// Write `index` to `out`.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "index::write"))]
pub fn write<W: Write>(index: &SpatialIndex, out: &mut W) -> Result<(), IndexError> {
  let root = index.bounds();

  out.write_all(&FORMAT_SIGNATURE)?;
  out.write_all(&FORMAT_VERSION_MAJOR.to_le_bytes())?;
  out.write_all(&FORMAT_VERSION_MINOR.to_le_bytes())?;
  for v in [
    root.min.x, root.min.y, root.min.z, root.max.x, root.max.y, root.max.z, root.max.z,
  ] {
    out.write_all(&v.to_le_bytes())?;
  }
  out.write_all(&(index.len() as u64).to_le_bytes())?;

  let mut nodes: Vec<(&SpatialKey, &Node)> = index.nodes().collect();
  nodes.sort_unstable_by(|a, b| a.0.cmp(b.0));

  let mut buf = Vec::new();
  for (key, node) in nodes {
    buf.clear();
    for v in [key.depth, key.x, key.y, key.z] {
      buf.extend_from_slice(&v.to_le_bytes());
    }
    buf.extend_from_slice(&(node.npoints() as u64).to_le_bytes());
    buf.reserve(node.npoints() * 4);
    for &p in node.points() {
      buf.extend_from_slice(&p.to_le_bytes());
    }
    out.write_all(&buf)?;
  }

  log::debug!(
    "Wrote index: {} nodes, {} points",
    index.len(),
    index.npoints()
  );
  Ok(())
}

/// Read an index previously produced by [`write`].
///
/// The result answers queries but refuses insertion.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "index::read"))]
pub fn read<R: Read>(input: &mut R) -> Result<SpatialIndex, IndexError> {
  let signature: [u8; 4] = read_array(input)?;
  if signature != FORMAT_SIGNATURE {
    return Err(IndexError::Format(format!(
      "bad signature {:?}",
      String::from_utf8_lossy(&signature)
    )));
  }

  let major = i32::from_le_bytes(read_array(input)?);
  let minor = i32::from_le_bytes(read_array(input)?);
  if major != FORMAT_VERSION_MAJOR || minor != FORMAT_VERSION_MINOR {
    return Err(IndexError::Format(format!(
      "unsupported version {}.{} (expected {}.{})",
      major, minor, FORMAT_VERSION_MAJOR, FORMAT_VERSION_MINOR
    )));
  }

  let mut b = [0.0f64; 6];
  for v in &mut b {
    *v = read_f64(input)?;
  }
  let min = DVec3::new(b[0], b[1], b[2]);
  let max = DVec3::new(b[3], b[4], b[5]);
  if !(min.is_finite() && max.is_finite() && min.cmple(max).all()) {
    return Err(IndexError::Format(format!(
      "invalid bounds {:?}..{:?}",
      min, max
    )));
  }
  let root = DAabb3::new(min, max);

  let spacing = read_f64(input)?;
  if spacing != max.z {
    log::warn!("Spacing field {} differs from zmax {}", spacing, max.z);
  }

  let node_count = u64::from_le_bytes(read_array(input)?);

  let mut registry = HashMap::new();
  let mut total = 0usize;
  for _ in 0..node_count {
    let key = SpatialKey::new(
      i32::from_le_bytes(read_array(input)?),
      i32::from_le_bytes(read_array(input)?),
      i32::from_le_bytes(read_array(input)?),
      i32::from_le_bytes(read_array(input)?),
    );
    let bounds = NodeBounds::of_key(&root, &key)
      .ok_or_else(|| IndexError::Format(format!("invalid key {:?}", key)))?;

    let len = u64::from_le_bytes(read_array(input)?);
    let len = usize::try_from(len)
      .ok()
      .filter(|&n| n <= MAX_POINTS - total)
      .ok_or_else(|| IndexError::Format(format!("point count {} too large in {:?}", len, key)))?;
    total += len;

    let points = read_indices(input, len)?;
    if registry
      .insert(key, Node::with_points(bounds, points))
      .is_some()
    {
      return Err(IndexError::Format(format!("duplicate key {:?}", key)));
    }
  }

  let index = SpatialIndex::from_registry(root, registry);
  log::debug!(
    "Read index: {} nodes, {} points, max depth {}",
    index.len(),
    index.npoints(),
    index.max_depth()
  );
  Ok(index)
}

/// Write `index` to a file at `path`, replacing any existing file.
pub fn save<P: AsRef<Path>>(index: &SpatialIndex, path: P) -> Result<(), IndexError> {
  let mut out = BufWriter::new(File::create(path)?);
  write(index, &mut out)?;
  out.flush()?;
  Ok(())
}

/// Read an index from the file at `path`.
pub fn load<P: AsRef<Path>>(path: P) -> Result<SpatialIndex, IndexError> {
  let mut input = BufReader::new(File::open(path)?);
  read(&mut input)
}

fn read_array<R: Read, const N: usize>(input: &mut R) -> Result<[u8; N], IndexError> {
  let mut buf = [0u8; N];
  input.read_exact(&mut buf).map_err(eof_as_truncated)?;
  Ok(buf)
}

fn read_f64<R: Read>(input: &mut R) -> Result<f64, IndexError> {
  Ok(f64::from_le_bytes(read_array(input)?))
}

/// Decode `len` point indices in bounded chunks, so a corrupt count fails
/// on end of stream instead of allocating up front.
fn read_indices<R: Read>(input: &mut R, len: usize) -> Result<Vec<u32>, IndexError> {
  let mut points = Vec::with_capacity(len.min(READ_CHUNK));
  let mut bytes = vec![0u8; len.min(READ_CHUNK) * 4];
  let mut remaining = len;

  while remaining > 0 {
    let take = remaining.min(READ_CHUNK);
    let chunk = &mut bytes[..take * 4];
    input.read_exact(chunk).map_err(eof_as_truncated)?;
    points.extend(
      chunk
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]])),
    );
    remaining -= take;
  }

  Ok(points)
}

fn eof_as_truncated(err: io::Error) -> IndexError {
  if err.kind() == io::ErrorKind::UnexpectedEof {
    IndexError::Truncated
  } else {
    IndexError::Io(err)
  }
}

#[cfg(test)]
#[path = "serialize_test.rs"]
mod serialize_test;
