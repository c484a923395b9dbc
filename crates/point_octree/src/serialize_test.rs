use std::io::Cursor;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::octree::IndexConfig;
use crate::points::PointCloud;

fn random_index(n: usize, seed: u64) -> SpatialIndex {
  let mut rng = StdRng::seed_from_u64(seed);
  let cloud: PointCloud = (0..n)
    .map(|_| {
      DVec3::new(
        rng.random_range(-10.0..10.0),
        rng.random_range(0.0..40.0),
        rng.random_range(100.0..105.0),
      )
    })
    .collect();
  let config = IndexConfig {
    grid_size: 4,
    max_points_per_node: 40,
  };
  SpatialIndex::build(&cloud, config).unwrap()
}

fn to_bytes(index: &SpatialIndex) -> Vec<u8> {
  let mut bytes = Vec::new();
  write(index, &mut bytes).unwrap();
  bytes
}

fn header(node_count: u64) -> Vec<u8> {
  let mut bytes = Vec::new();
  bytes.extend_from_slice(b"EPTO");
  bytes.extend_from_slice(&1i32.to_le_bytes());
  bytes.extend_from_slice(&0i32.to_le_bytes());
  for v in [0.0f64, 0.0, 0.0, 8.0, 8.0, 8.0, 8.0] {
    bytes.extend_from_slice(&v.to_le_bytes());
  }
  bytes.extend_from_slice(&node_count.to_le_bytes());
  bytes
}

fn node_record(key: [i32; 4], points: &[u32]) -> Vec<u8> {
  let mut bytes = Vec::new();
  for v in key {
    bytes.extend_from_slice(&v.to_le_bytes());
  }
  bytes.extend_from_slice(&(points.len() as u64).to_le_bytes());
  for p in points {
    bytes.extend_from_slice(&p.to_le_bytes());
  }
  bytes
}

#[test]
fn test_round_trip_preserves_nodes() {
  let index = random_index(3000, 5);
  let bytes = to_bytes(&index);
  let read_back = read(&mut Cursor::new(&bytes)).unwrap();

  assert_eq!(read_back.len(), index.len());
  assert_eq!(read_back.npoints(), index.npoints());
  assert_eq!(read_back.bounds(), index.bounds());

  for (key, node) in index.nodes() {
    let other = read_back.get(key).expect("Node missing after read");
    assert_eq!(other.points(), node.points(), "Point order differs at {:?}", key);
    assert_eq!(other.bounds, node.bounds);
    assert_eq!(other.occupancy_len(), 0);
  }
}

#[test]
fn test_read_index_is_query_only() {
  let index = random_index(500, 1);
  let bytes = to_bytes(&index);
  let mut read_back = read(&mut Cursor::new(&bytes)).unwrap();

  assert!(read_back.is_query_only());
  let extra = [DVec3::ZERO];
  assert!(matches!(
    read_back.insert(&extra[..], 0),
    Err(IndexError::QueryOnly)
  ));
}

/// max_depth is recovered as the deepest key present.
#[test]
fn test_read_max_depth_is_deepest_key() {
  let index = random_index(3000, 9);
  let deepest = index.keys().map(|k| k.depth).max().unwrap();
  let read_back = read(&mut Cursor::new(to_bytes(&index))).unwrap();
  assert_eq!(read_back.max_depth(), deepest);
}

#[test]
fn test_header_layout() {
  let index = random_index(200, 3);
  let bytes = to_bytes(&index);
  let root = index.bounds();

  assert_eq!(&bytes[0..4], b"EPTO");
  assert_eq!(i32::from_le_bytes(bytes[4..8].try_into().unwrap()), 1);
  assert_eq!(i32::from_le_bytes(bytes[8..12].try_into().unwrap()), 0);

  let f = |at: usize| f64::from_le_bytes(bytes[at..at + 8].try_into().unwrap());
  assert_eq!(f(12), root.min.x);
  assert_eq!(f(20), root.min.y);
  assert_eq!(f(28), root.min.z);
  assert_eq!(f(36), root.max.x);
  assert_eq!(f(44), root.max.y);
  assert_eq!(f(52), root.max.z);
  assert_eq!(f(60), root.max.z, "Spacing mirrors zmax");

  let count = u64::from_le_bytes(bytes[68..76].try_into().unwrap());
  assert_eq!(count as usize, index.len());
  assert_eq!(HEADER_LEN, 76);

  let expected_len = HEADER_LEN + index.len() * (16 + 8) + index.npoints() * 4;
  assert_eq!(bytes.len(), expected_len);
}

/// First record is the smallest key under the (x, y, z, depth) ordering.
#[test]
fn test_nodes_written_in_key_order() {
  let index = random_index(2000, 4);
  let bytes = to_bytes(&index);
  let first = index.keys().min().unwrap();

  let i = |at: usize| i32::from_le_bytes(bytes[at..at + 4].try_into().unwrap());
  let at = HEADER_LEN;
  assert_eq!(
    SpatialKey::new(i(at), i(at + 4), i(at + 8), i(at + 12)),
    *first
  );
}

#[test]
fn test_write_is_deterministic() {
  let a = random_index(1500, 12);
  let b = random_index(1500, 12);
  assert_eq!(to_bytes(&a), to_bytes(&b));
}

#[test]
fn test_empty_index_round_trip() {
  let index = SpatialIndex::build(&PointCloud::default(), IndexConfig::default()).unwrap();
  let bytes = to_bytes(&index);
  assert_eq!(bytes.len(), HEADER_LEN);

  let read_back = read(&mut Cursor::new(bytes)).unwrap();
  assert!(read_back.is_empty());
  assert_eq!(read_back.max_depth(), 0);
}

#[test]
fn test_hand_written_file() {
  let mut bytes = header(2);
  bytes.extend(node_record([0, 0, 0, 0], &[4, 2]));
  bytes.extend(node_record([1, 1, 0, 1], &[7]));

  let index = read(&mut Cursor::new(bytes)).unwrap();
  assert_eq!(index.len(), 2);
  assert_eq!(index.npoints(), 3);
  assert_eq!(index.max_depth(), 1);

  let node = index.get(&SpatialKey::new(1, 1, 0, 1)).unwrap();
  assert_eq!(node.points(), &[7]);
  assert_eq!(node.bounds.center, DVec3::new(6.0, 2.0, 6.0));
  assert_eq!(node.bounds.half_size, 2.0);
}

#[test]
fn test_bad_signature() {
  let mut bytes = header(0);
  bytes[0..4].copy_from_slice(b"LAS1");
  assert!(matches!(
    read(&mut Cursor::new(bytes)),
    Err(IndexError::Format(_))
  ));
}

#[test]
fn test_bad_version() {
  let mut bytes = header(0);
  bytes[4..8].copy_from_slice(&2i32.to_le_bytes());
  assert!(matches!(
    read(&mut Cursor::new(bytes)),
    Err(IndexError::Format(_))
  ));

  let mut bytes = header(0);
  bytes[8..12].copy_from_slice(&3i32.to_le_bytes());
  assert!(matches!(
    read(&mut Cursor::new(bytes)),
    Err(IndexError::Format(_))
  ));
}

#[test]
fn test_truncated_header() {
  let bytes = header(0);
  for cut in [0, 3, 10, 40, HEADER_LEN - 1] {
    assert!(
      matches!(
        read(&mut Cursor::new(&bytes[..cut])),
        Err(IndexError::Truncated)
      ),
      "Cut at {} should be truncated",
      cut
    );
  }
}

#[test]
fn test_truncated_point_list() {
  let mut bytes = header(1);
  bytes.extend(node_record([0, 0, 0, 0], &[1, 2, 3]));
  bytes.truncate(bytes.len() - 2);
  assert!(matches!(
    read(&mut Cursor::new(bytes)),
    Err(IndexError::Truncated)
  ));
}

/// A header promising more nodes than the stream holds.
#[test]
fn test_missing_nodes() {
  let mut bytes = header(3);
  bytes.extend(node_record([0, 0, 0, 0], &[1]));
  assert!(matches!(
    read(&mut Cursor::new(bytes)),
    Err(IndexError::Truncated)
  ));
}

/// A huge declared point count fails on end of stream, not on allocation.
#[test]
fn test_lying_point_count() {
  let mut bytes = header(1);
  for v in [0i32, 0, 0, 0] {
    bytes.extend_from_slice(&v.to_le_bytes());
  }
  bytes.extend_from_slice(&(u32::MAX as u64).to_le_bytes());
  bytes.extend_from_slice(&5u32.to_le_bytes());
  assert!(matches!(
    read(&mut Cursor::new(bytes)),
    Err(IndexError::Truncated)
  ));
}

#[test]
fn test_invalid_keys_rejected() {
  for key in [[-1, 0, 0, 0], [1, 2, 0, 0], [0, 0, -3, 0], [31, 0, 0, 0]] {
    let mut bytes = header(1);
    bytes.extend(node_record(key, &[0]));
    assert!(
      matches!(read(&mut Cursor::new(bytes)), Err(IndexError::Format(_))),
      "Key {:?} should be rejected",
      key
    );
  }
}

#[test]
fn test_duplicate_key_rejected() {
  let mut bytes = header(2);
  bytes.extend(node_record([1, 0, 1, 0], &[0]));
  bytes.extend(node_record([1, 0, 1, 0], &[1]));
  assert!(matches!(
    read(&mut Cursor::new(bytes)),
    Err(IndexError::Format(_))
  ));
}

#[test]
fn test_inverted_bounds_rejected() {
  let mut bytes = header(0);
  bytes[12..20].copy_from_slice(&9.0f64.to_le_bytes());
  assert!(matches!(
    read(&mut Cursor::new(bytes)),
    Err(IndexError::Format(_))
  ));
}

#[test]
fn test_save_and_load_file() {
  let index = random_index(800, 21);
  let path = std::env::temp_dir().join(format!("point_octree_{}.epto", std::process::id()));

  save(&index, &path).unwrap();
  let read_back = load(&path).unwrap();
  std::fs::remove_file(&path).ok();

  assert_eq!(read_back.len(), index.len());
  assert_eq!(read_back.npoints(), index.npoints());
}

#[test]
fn test_load_missing_file_is_io_error() {
  let path = std::env::temp_dir().join("point_octree_does_not_exist.epto");
  assert!(matches!(load(path), Err(IndexError::Io(_))));
}
