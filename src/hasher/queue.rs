//! In-memory FIFO queue driving background hash computation. Not
//! catalog-backed — if the process restarts mid-queue, a fresh
//! `enqueue_pending` call rebuilds it from rows still marked `pending`.

use crate::catalog::entities::file::HashStatus;
use crate::catalog::Catalog;
use crate::error::CoreResult;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashQueueState {
	Idle,
	Running,
	Stopped,
	Complete,
}

#[derive(Debug, Clone)]
pub struct HashQueueStatus {
	pub state: HashQueueState,
	pub files_total: usize,
	pub files_processed: usize,
	pub current_file: Option<String>,
	pub queue_size: usize,
}

struct QueueState {
	queue: VecDeque<i32>,
	files_total: usize,
	files_processed: usize,
	current_file: Option<String>,
}

/// Background hasher. One instance is shared (behind `Arc`) between the
/// component that enqueues work and the loop that drains it.
pub struct HashQueue {
	catalog: Arc<Catalog>,
	state: Mutex<QueueState>,
	running_tx: watch::Sender<bool>,
	running_rx: watch::Receiver<bool>,
}

impl HashQueue {
	pub fn new(catalog: Arc<Catalog>) -> Self {
		let (running_tx, running_rx) = watch::channel(false);
		Self {
			catalog,
			state: Mutex::new(QueueState {
				queue: VecDeque::new(),
				files_total: 0,
				files_processed: 0,
				current_file: None,
			}),
			running_tx,
			running_rx,
		}
	}

	/// Load every file with `hash_status = pending` (or unset) into the
	/// queue. Returns the number enqueued.
	pub async fn enqueue_pending(&self) -> CoreResult<usize> {
		let pending = self.catalog.files_pending_hash().await?;
		let mut state = self.state.lock().await;
		state.queue.clear();
		state.queue.extend(pending.iter().map(|f| f.id));
		state.files_total = state.queue.len();
		state.files_processed = 0;
		Ok(state.queue.len())
	}

	pub async fn enqueue(&self, file_ids: impl IntoIterator<Item = i32>) {
		let mut state = self.state.lock().await;
		for id in file_ids {
			state.queue.push_back(id);
		}
		state.files_total = state.queue.len() + state.files_processed;
	}

	/// Start draining the queue in the background. Returns immediately;
	/// `false` if already running.
	pub fn start(self: &Arc<Self>) -> bool {
		if *self.running_rx.borrow() {
			return false;
		}
		let _ = self.running_tx.send(true);

		let this = Arc::clone(self);
		tokio::spawn(async move {
			info!("hash queue started");
			loop {
				if !*this.running_rx.borrow() {
					break;
				}

				let next = {
					let mut state = this.state.lock().await;
					state.queue.pop_front()
				};

				let Some(file_id) = next else {
					break;
				};

				if let Err(err) = this.process_one(file_id).await {
					warn!(file_id, error = %err, "hash computation failed");
				}

				let mut state = this.state.lock().await;
				state.files_processed += 1;
				state.current_file = None;
			}

			let remaining = this.state.lock().await.queue.len();
			let _ = this.running_tx.send(false);
			debug!(remaining, "hash queue drained");
		});

		true
	}

	async fn process_one(&self, file_id: i32) -> CoreResult<()> {
		let file = self.catalog.get_file(file_id).await?;
		{
			let mut state = self.state.lock().await;
			state.current_file = Some(file.path.clone());
		}

		self.catalog
			.set_file_hash_status(file_id, HashStatus::Computing)
			.await?;

		let path = PathBuf::from(&file.path);
		match super::hash_file(path).await {
			Ok((quick_sig, full_hash)) => {
				self.catalog
					.set_file_fingerprints(
						file_id,
						Some(quick_sig),
						Some(full_hash),
						HashStatus::Complete,
					)
					.await?;
			}
			Err(err) => {
				error!(file_id, error = %err, "hashing failed, marking file errored");
				self.catalog
					.set_file_hash_status(file_id, HashStatus::Error)
					.await?;
			}
		}
		Ok(())
	}

	/// Stop after the in-flight file finishes; the remainder of the queue is
	/// preserved for a later `start`.
	pub fn stop(&self) -> bool {
		if !*self.running_rx.borrow() {
			return false;
		}
		let _ = self.running_tx.send(false);
		true
	}

	pub async fn status(&self) -> HashQueueStatus {
		let running = *self.running_rx.borrow();
		let state = self.state.lock().await;
		let hash_state = if running {
			HashQueueState::Running
		} else if state.files_processed > 0 && state.queue.is_empty() {
			HashQueueState::Complete
		} else if state.files_processed > 0 {
			HashQueueState::Stopped
		} else {
			HashQueueState::Idle
		};

		HashQueueStatus {
			state: hash_state,
			files_total: state.files_total,
			files_processed: state.files_processed,
			current_file: state.current_file.clone(),
			queue_size: state.queue.len(),
		}
	}
}
