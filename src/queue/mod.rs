//! Copy-operation queue supervisor: a bounded-concurrency worker loop that
//! drains pending operations, runs each through the verified copier, and
//! records progress/terminal status back to the catalog.

pub mod quarantine;

use crate::catalog::entities::operation;
use crate::catalog::Catalog;
use crate::copier::{self, CopyOptions, CopyProgress};
use crate::error::CoreResult;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

const DEFAULT_CONCURRENCY: usize = 2;
const MAX_CONCURRENCY: usize = 10;
const IDLE_POLL: Duration = Duration::from_secs(2);
const BUSY_POLL: Duration = Duration::from_millis(500);
const PAUSED_POLL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
pub struct QueueStatus {
	pub running: bool,
	pub paused: bool,
	pub concurrency: usize,
	pub active_count: usize,
}

/// Runs the copy queue as a background supervisor task. Cheap to clone via
/// `Arc`; `start`/`stop`/`pause`/`resume` are safe to call from any task.
pub struct OperationsQueue {
	catalog: Arc<Catalog>,
	running: AtomicBool,
	paused: AtomicBool,
	concurrency: AtomicUsize,
	active_count: AtomicUsize,
	supervisor: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl OperationsQueue {
	pub fn new(catalog: Arc<Catalog>) -> Self {
		Self {
			catalog,
			running: AtomicBool::new(false),
			paused: AtomicBool::new(false),
			concurrency: AtomicUsize::new(DEFAULT_CONCURRENCY),
			active_count: AtomicUsize::new(0),
			supervisor: Mutex::new(None),
		}
	}

	pub fn status(&self) -> QueueStatus {
		QueueStatus {
			running: self.running.load(Ordering::SeqCst),
			paused: self.paused.load(Ordering::SeqCst),
			concurrency: self.concurrency.load(Ordering::SeqCst),
			active_count: self.active_count.load(Ordering::SeqCst),
		}
	}

	pub fn set_concurrency(&self, limit: usize) {
		self.concurrency
			.store(limit.clamp(1, MAX_CONCURRENCY), Ordering::SeqCst);
	}

	/// Start the background worker loop. No-op if already running.
	pub async fn start(self: &Arc<Self>) {
		let mut guard = self.supervisor.lock().await;
		if guard.is_some() {
			return;
		}
		self.running.store(true, Ordering::SeqCst);
		self.paused.store(false, Ordering::SeqCst);

		let this = Arc::clone(self);
		*guard = Some(tokio::spawn(async move { this.worker_loop().await }));
	}

	/// Stop the worker loop. In-flight copies finish; no new ones start.
	pub async fn stop(&self) {
		self.running.store(false, Ordering::SeqCst);
		if let Some(handle) = self.supervisor.lock().await.take() {
			handle.abort();
		}
	}

	pub fn pause(&self) {
		self.paused.store(true, Ordering::SeqCst);
	}

	pub fn resume(&self) {
		self.paused.store(false, Ordering::SeqCst);
	}

	async fn worker_loop(self: Arc<Self>) {
		info!("operations queue started");
		while self.running.load(Ordering::SeqCst) {
			if self.paused.load(Ordering::SeqCst) {
				tokio::time::sleep(PAUSED_POLL).await;
				continue;
			}

			let concurrency = self.concurrency.load(Ordering::SeqCst);
			let active = self.active_count.load(Ordering::SeqCst);
			if active >= concurrency {
				tokio::time::sleep(BUSY_POLL).await;
				continue;
			}

			let pending = match self
				.catalog
				.fetch_pending_operations((concurrency - active) as u64)
				.await
			{
				Ok(rows) => rows,
				Err(err) => {
					error!(error = %err, "failed to fetch pending operations");
					tokio::time::sleep(BUSY_POLL).await;
					continue;
				}
			};

			if pending.is_empty() {
				tokio::time::sleep(IDLE_POLL).await;
				continue;
			}

			for op in pending {
				self.active_count.fetch_add(1, Ordering::SeqCst);
				let this = Arc::clone(&self);
				tokio::spawn(async move {
					if let Err(err) = this.run_operation(op).await {
						warn!(error = %err, "operation failed");
					}
					this.active_count.fetch_sub(1, Ordering::SeqCst);
				});
			}

			tokio::time::sleep(BUSY_POLL).await;
		}
		info!("operations queue stopped");
	}

	async fn run_operation(&self, op: operation::Model) -> CoreResult<()> {
		self.catalog
			.set_operation_status(op.id, operation::OperationStatus::Running, None)
			.await?;

		let source = self.catalog.get_file(op.source_file_id).await?;
		let dest = PathBuf::from(&op.dest_path);
		let op_id = op.id;
		let catalog = Arc::clone(&self.catalog);
		let last_reported = Arc::new(AtomicI64::new(0));

		let on_progress: crate::copier::ProgressCallback = {
			let catalog = Arc::clone(&catalog);
			let last_reported = Arc::clone(&last_reported);
			Arc::new(move |progress: CopyProgress| {
				let bytes = progress.bytes_copied as i64;
				// Coalesce progress updates to roughly once per MiB to avoid
				// hammering the catalog with a write per chunk.
				if bytes - last_reported.swap(bytes, Ordering::SeqCst) < 1024 * 1024
					&& bytes != progress.total_bytes as i64
				{
					return;
				}
				let catalog = Arc::clone(&catalog);
				tokio::spawn(async move {
					let _ = catalog.set_operation_progress(op_id, bytes).await;
				});
			})
		};

		let options = CopyOptions {
			verify_hash: op.verify_hash,
			overwrite: false,
		};

		let result = copier::safe_copy(
			PathBuf::from(&source.path),
			dest,
			options,
			Some(on_progress),
		)
		.await;

		match result {
			Ok(()) => {
				self.catalog
					.set_operation_progress(op.id, op.total_size)
					.await?;
				self.catalog
					.set_operation_status(op.id, operation::OperationStatus::Completed, None)
					.await?;
			}
			Err(err) => {
				self.catalog
					.set_operation_status(
						op.id,
						operation::OperationStatus::Failed,
						Some(err.to_string()),
					)
					.await?;
			}
		}

		Ok(())
	}

	/// Pause a single operation, independent of the supervisor's own pause flag.
	pub async fn pause_operation(&self, id: i32) -> CoreResult<bool> {
		self.catalog.pause_operation(id).await
	}

	pub async fn resume_operation(&self, id: i32) -> CoreResult<bool> {
		self.catalog.resume_operation(id).await
	}

	pub async fn cancel_operation(&self, id: i32) -> CoreResult<bool> {
		self.catalog.cancel_operation(id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn concurrency_is_clamped_to_sane_bounds() {
		assert_eq!(DEFAULT_CONCURRENCY.clamp(1, MAX_CONCURRENCY), 2);
		assert_eq!(50usize.clamp(1, MAX_CONCURRENCY), MAX_CONCURRENCY);
		assert_eq!(0usize.clamp(1, MAX_CONCURRENCY), 1);
	}
}
