//! Building or reading an index off the calling thread.
//!
//! Construction of a large index takes seconds. The loader runs it on
//! rayon's pool and hands the result back through a channel, so a frame
//! loop can keep drawing and poll once per frame.
//!
//! ```text
//! Frame thread                     rayon
//! ┌──────────────────┐
//! │ spawn_build()    │──────────────►┌──────────────────┐
//! └──────────────────┘               │ SpatialIndex::   │
//! ┌──────────────────┐               │   build()        │
//! │ try_take() None  │               └────────┬─────────┘
//! │ try_take() None  │                        │
//! │ try_take() Some  │◄───────────────────────┘
//! └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let loader = IndexLoader::new(IndexConfig::default());
//! let mut pending = loader.spawn_build(Arc::new(cloud));
//!
//! // Each frame
//! if let Some(result) = pending.try_take() {
//!     index = Some(result?);
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::{self as channel, Receiver, TryRecvError};

use crate::error::IndexError;
use crate::octree::{IndexConfig, SpatialIndex};
use crate::points::PointSource;
use crate::serialize;

type IndexResult = Result<SpatialIndex, IndexError>;

/// Spawns index construction and reading on rayon's pool.
#[derive(Clone, Debug, Default)]
pub struct IndexLoader {
	config: IndexConfig,
}

impl IndexLoader {
	/// Loader building with `config`.
	pub fn new(config: IndexConfig) -> Self {
		Self { config }
	}

	/// Construction parameters used by [`spawn_build`](Self::spawn_build).
	pub fn config(&self) -> &IndexConfig {
		&self.config
	}

	/// Build an index over `points` in the background.
	pub fn spawn_build<P>(&self, points: Arc<P>) -> PendingIndex
	where
		P: PointSource + Send + ?Sized + 'static,
	{
		let config = self.config.clone();
		spawn(move || SpatialIndex::build(&*points, config))
	}

	/// Read an index file in the background.
	pub fn spawn_load(&self, path: impl Into<PathBuf>) -> PendingIndex {
		let path = path.into();
		spawn(move || {
			let index = serialize::load(&path)?;
			log::info!("Loaded index from {}", path.display());
			Ok(index)
		})
	}
}

fn spawn<F>(work: F) -> PendingIndex
where
	F: FnOnce() -> IndexResult + Send + 'static,
{
	let (sender, receiver) = channel::bounded(1);
	rayon::spawn(move || {
		// Receiver dropped = cancelled
		let _ = sender.send(work());
	});
	PendingIndex {
		receiver: Some(receiver),
	}
}

/// Handle to an index being built or read.
#[derive(Debug)]
pub struct PendingIndex {
	receiver: Option<Receiver<IndexResult>>,
}

impl PendingIndex {
	/// True until the result has been taken.
	pub fn is_pending(&self) -> bool {
		self.receiver.is_some()
	}

	/// Take the result if ready (non-blocking).
	///
	/// Returns `None` while the work is running and after the result was
	/// taken.
	pub fn try_take(&mut self) -> Option<IndexResult> {
		let receiver = self.receiver.as_ref()?;

		match receiver.try_recv() {
			Ok(result) => {
				self.receiver = None;
				Some(result)
			}
			Err(TryRecvError::Empty) => None,
			Err(TryRecvError::Disconnected) => {
				self.receiver = None;
				Some(Err(IndexError::WorkerLost))
			}
		}
	}

	/// Block until the result is ready.
	///
	/// Fails with [`IndexError::ResultTaken`] once [`try_take`](Self::try_take)
	/// has returned the result or the handle was cancelled.
	pub fn wait(mut self) -> IndexResult {
		match self.receiver.take() {
			Some(receiver) => receiver.recv().unwrap_or(Err(IndexError::WorkerLost)),
			None => Err(IndexError::ResultTaken),
		}
	}

	/// Drop the pending result; the worker finishes and discards it.
	pub fn cancel(&mut self) {
		self.receiver = None;
	}
}
