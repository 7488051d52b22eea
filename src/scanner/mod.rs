//! Incremental filesystem scanner: walks registered roots, reconciles the
//! catalog, and reports missing files. Runs as a cancellable, pausable
//! background task.

mod log;

pub use log::{log_file_paths, ScanLog};

use crate::catalog::entities::root;
use crate::catalog::{Catalog, ScannedEntry};
use crate::error::{CoreError, CoreResult};
use chrono::Utc;
use serde_json::json;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleLevel {
	Low,
	Normal,
	Fast,
}

impl ThrottleLevel {
	fn delay(&self) -> std::time::Duration {
		match self {
			ThrottleLevel::Low => std::time::Duration::from_millis(100),
			ThrottleLevel::Normal => std::time::Duration::from_millis(10),
			ThrottleLevel::Fast => std::time::Duration::ZERO,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
	Idle,
	Running,
	Paused,
	Completed,
	Cancelled,
}

#[derive(Debug, Clone, Default)]
pub struct ScanStatus {
	pub state: ScanState,
	pub current_root: Option<String>,
	pub files_scanned: u64,
	pub files_new: u64,
	pub files_updated: u64,
	pub files_missing: u64,
	pub started_at: Option<chrono::DateTime<Utc>>,
	/// Where this run's structured/human-readable log pair landed, once
	/// the run has started one.
	pub jsonl_log_path: Option<PathBuf>,
	pub text_log_path: Option<PathBuf>,
}

impl Default for ScanState {
	fn default() -> Self {
		ScanState::Idle
	}
}

struct SharedStatus {
	status: ScanStatus,
}

/// One filesystem scan run. Construct once per `Context`; `start` spawns the
/// walk as a background task and returns immediately.
pub struct Scanner {
	catalog: Arc<Catalog>,
	log_dir: PathBuf,
	status: Mutex<SharedStatus>,
	running: AtomicBool,
	cancel_requested: AtomicBool,
	pause_requested: AtomicBool,
}

impl Scanner {
	pub fn new(catalog: Arc<Catalog>, log_dir: PathBuf) -> Self {
		Self {
			catalog,
			log_dir,
			status: Mutex::new(SharedStatus {
				status: ScanStatus {
					state: ScanState::Idle,
					..Default::default()
				},
			}),
			running: AtomicBool::new(false),
			cancel_requested: AtomicBool::new(false),
			pause_requested: AtomicBool::new(false),
		}
	}

	pub async fn status(&self) -> ScanStatus {
		self.status.lock().await.status.clone()
	}

	/// Start scanning. `drive_id` restricts the walk to one drive's
	/// non-excluded roots; `None` scans every registered root. Returns
	/// `false` if a scan is already running.
	pub fn start(self: &Arc<Self>, drive_id: Option<i32>, throttle: ThrottleLevel) -> bool {
		if self.running.swap(true, Ordering::SeqCst) {
			return false;
		}
		self.cancel_requested.store(false, Ordering::SeqCst);
		self.pause_requested.store(false, Ordering::SeqCst);

		let this = Arc::clone(self);
		tokio::spawn(async move {
			if let Err(err) = this.run(drive_id, throttle).await {
				warn!(error = %err, "scan run failed");
				let mut guard = this.status.lock().await;
				guard.status.state = ScanState::Idle;
			}
			this.running.store(false, Ordering::SeqCst);
		});

		true
	}

	pub fn pause(&self) -> bool {
		if self.running.load(Ordering::SeqCst) {
			self.pause_requested.store(true, Ordering::SeqCst);
			true
		} else {
			false
		}
	}

	pub fn resume(&self) -> bool {
		if self.pause_requested.load(Ordering::SeqCst) {
			self.pause_requested.store(false, Ordering::SeqCst);
			true
		} else {
			false
		}
	}

	pub fn cancel(&self) -> bool {
		if self.running.load(Ordering::SeqCst) {
			self.cancel_requested.store(true, Ordering::SeqCst);
			true
		} else {
			false
		}
	}

	async fn run(&self, drive_id: Option<i32>, throttle: ThrottleLevel) -> CoreResult<()> {
		{
			let mut guard = self.status.lock().await;
			guard.status = ScanStatus {
				state: ScanState::Running,
				started_at: Some(Utc::now()),
				..Default::default()
			};
		}

		let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
		let mut scan_log = ScanLog::create(&self.log_dir, &timestamp)?;
		let (jsonl_log_path, text_log_path) = log_file_paths(&self.log_dir, &timestamp);
		{
			let mut guard = self.status.lock().await;
			guard.status.jsonl_log_path = Some(jsonl_log_path);
			guard.status.text_log_path = Some(text_log_path);
		}
		scan_log.event(
			"scan_started",
			json!({ "drive_id": drive_id, "throttle": format!("{throttle:?}") }),
		);

		let roots = self.catalog.scannable_roots(drive_id).await?;

		for root in &roots {
			if self.cancel_requested.load(Ordering::SeqCst) {
				break;
			}

			{
				let mut guard = self.status.lock().await;
				guard.status.current_root = Some(root.path.clone());
			}
			scan_log.event(
				"scanning_root",
				json!({ "root_id": root.id, "path": root.path }),
			);

			let stats = self.scan_root(root, throttle, &mut scan_log).await?;

			scan_log.event(
				"root_complete",
				json!({ "root_id": root.id, "new": stats.0, "updated": stats.1 }),
			);
		}

		let final_state = if self.cancel_requested.load(Ordering::SeqCst) {
			ScanState::Cancelled
		} else {
			ScanState::Completed
		};

		let summary = {
			let mut guard = self.status.lock().await;
			guard.status.state = final_state;
			guard.status.current_root = None;
			guard.status.clone()
		};

		scan_log.event(
			"scan_complete",
			json!({
				"state": format!("{final_state:?}"),
				"files_scanned": summary.files_scanned,
				"files_new": summary.files_new,
				"files_updated": summary.files_updated,
				"files_missing": summary.files_missing,
			}),
		);

		info!(?final_state, files_scanned = summary.files_scanned, "scan finished");
		Ok(())
	}

	/// Walk one root breadth-first, reconciling each directory's files in a
	/// single transaction, then mark anything unseen since `scan_time` as
	/// missing.
	async fn scan_root(
		&self,
		root: &root::Model,
		throttle: ThrottleLevel,
		scan_log: &mut ScanLog,
	) -> CoreResult<(u64, u64)> {
		let scan_time = Utc::now();
		let mut dirs = VecDeque::new();
		dirs.push_back(PathBuf::from(&root.path));

		let mut total_new = 0u64;
		let mut total_updated = 0u64;

		while let Some(dir) = dirs.pop_front() {
			if self.cancel_requested.load(Ordering::SeqCst) {
				scan_log.event("scan_cancelled", json!({ "root": root.path }));
				return Ok((total_new, total_updated));
			}

			while self.pause_requested.load(Ordering::SeqCst) {
				{
					let mut guard = self.status.lock().await;
					guard.status.state = ScanState::Paused;
				}
				tokio::time::sleep(std::time::Duration::from_millis(500)).await;
				if self.cancel_requested.load(Ordering::SeqCst) {
					return Ok((total_new, total_updated));
				}
			}
			{
				let mut guard = self.status.lock().await;
				guard.status.state = ScanState::Running;
			}

			let entries = match self.read_directory(&dir).await {
				Ok(entries) => entries,
				Err(err) => {
					scan_log.event(
						"dir_error",
						json!({ "path": dir.display().to_string(), "error": err.to_string() }),
					);
					continue;
				}
			};

			let mut scanned = Vec::new();
			for entry in entries {
				if entry.is_dir {
					dirs.push_back(entry.path);
					continue;
				}

				match scanned_entry_from(&entry.path) {
					Ok(scanned_file) => scanned.push(scanned_file),
					Err(err) => {
						scan_log.event(
							"file_error",
							json!({ "path": entry.path.display().to_string(), "error": err.to_string() }),
						);
					}
				}

				if throttle.delay() > std::time::Duration::ZERO {
					tokio::time::sleep(throttle.delay()).await;
				}
			}

			let count = scanned.len() as u64;
			let stats = self
				.catalog
				.upsert_scanned_dir(root.id, scanned, scan_time)
				.await?;
			total_new += stats.new;
			total_updated += stats.updated;

			let mut guard = self.status.lock().await;
			guard.status.files_scanned += count;
			guard.status.files_new = total_new;
			guard.status.files_updated = total_updated;
		}

		let missing = self
			.catalog
			.mark_root_files_missing_before(root.id, scan_time)
			.await?;
		let mut guard = self.status.lock().await;
		guard.status.files_missing += missing;

		Ok((total_new, total_updated))
	}

	async fn read_directory(&self, path: &Path) -> CoreResult<Vec<WalkEntry>> {
		let mut out = Vec::new();
		let mut dir = tokio::fs::read_dir(path)
			.await
			.map_err(CoreError::Io)?;

		while let Some(entry) = dir.next_entry().await.map_err(CoreError::Io)? {
			let metadata = match entry.metadata().await {
				Ok(m) => m,
				Err(_) => continue,
			};
			out.push(WalkEntry {
				path: entry.path(),
				is_dir: metadata.is_dir(),
			});
		}
		Ok(out)
	}
}

struct WalkEntry {
	path: PathBuf,
	is_dir: bool,
}

fn scanned_entry_from(path: &Path) -> CoreResult<ScannedEntry> {
	let metadata = std::fs::metadata(path)?;
	let mtime = metadata
		.modified()?
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_secs_f64())
		.unwrap_or(0.0);
	let ext = path
		.extension()
		.map(|e| e.to_string_lossy().to_lowercase());

	Ok(ScannedEntry {
		path: path.to_string_lossy().into_owned(),
		size: metadata.len() as i64,
		mtime,
		ext,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::{Catalog, FileFilters};
	use std::time::Duration as StdDuration;

	async fn wait_until_idle(scanner: &Arc<Scanner>) {
		for _ in 0..200 {
			let status = scanner.status().await;
			if matches!(status.state, ScanState::Completed | ScanState::Cancelled) {
				return;
			}
			tokio::time::sleep(StdDuration::from_millis(20)).await;
		}
		panic!("scan did not finish in time");
	}

	#[tokio::test]
	async fn a_scan_reconciles_new_updated_unchanged_and_missing_files() {
		let dir = tempfile::tempdir().unwrap();
		let catalog = Arc::new(Catalog::open_in_memory().await.unwrap());
		let drive = catalog
			.register_drive(dir.path().to_string_lossy(), None, None)
			.await
			.unwrap();
		let root = catalog
			.add_root(drive.id, dir.path().to_string_lossy(), false)
			.await
			.unwrap();

		let file_a = dir.path().join("a.mkv");
		let file_b = dir.path().join("b.mkv");
		std::fs::write(&file_a, b"one").unwrap();
		std::fs::write(&file_b, b"two").unwrap();

		let log_dir = dir.path().join("logs");
		let scanner = Arc::new(Scanner::new(Arc::clone(&catalog), log_dir.clone()));
		assert!(scanner.start(Some(drive.id), ThrottleLevel::Fast));
		wait_until_idle(&scanner).await;

		let status = scanner.status().await;
		assert_eq!(status.state, ScanState::Completed);
		assert_eq!(status.files_new, 2);

		// Rewrite one file's content (changes mtime) and delete the other, then rescan.
		tokio::time::sleep(StdDuration::from_millis(1100)).await;
		std::fs::write(&file_a, b"one-modified-content").unwrap();
		std::fs::remove_file(&file_b).unwrap();

		assert!(scanner.start(Some(drive.id), ThrottleLevel::Fast));
		wait_until_idle(&scanner).await;

		let status = scanner.status().await;
		assert_eq!(status.files_updated, 1);
		assert_eq!(status.files_missing, 1);

		let (rows, _) = catalog
			.list_files(&FileFilters { root_id: Some(root.id), missing: Some(true), page_size: 10, ..Default::default() })
			.await
			.unwrap();
		assert_eq!(rows.len(), 1);
		assert!(rows[0].path.ends_with("b.mkv"));
	}

	#[tokio::test]
	async fn a_cancelled_scan_stops_short_of_the_remaining_directories() {
		let dir = tempfile::tempdir().unwrap();
		let catalog = Arc::new(Catalog::open_in_memory().await.unwrap());
		let drive = catalog
			.register_drive(dir.path().to_string_lossy(), None, None)
			.await
			.unwrap();
		catalog
			.add_root(drive.id, dir.path().to_string_lossy(), false)
			.await
			.unwrap();
		// Several subdirectories so the walk's between-directory cancel
		// checkpoint actually has more than one opportunity to fire.
		for sub in 0..8 {
			let subdir = dir.path().join(format!("d{sub}"));
			std::fs::create_dir(&subdir).unwrap();
			std::fs::write(subdir.join("f.mkv"), b"x").unwrap();
		}

		let scanner = Arc::new(Scanner::new(Arc::clone(&catalog), dir.path().join("logs")));
		assert!(scanner.start(Some(drive.id), ThrottleLevel::Low));
		tokio::time::sleep(StdDuration::from_millis(150)).await;
		assert!(scanner.cancel());
		wait_until_idle(&scanner).await;

		assert_eq!(scanner.status().await.state, ScanState::Cancelled);
		let status = scanner.status().await;
		assert!(status.files_scanned < 8, "cancellation should cut the walk short");
	}
}
