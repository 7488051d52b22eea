//! File row upsert (scanner), fingerprint updates (hasher), and listing.

use super::entities::{file, File, FileActive};
use super::Catalog;
use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use sea_orm::{
	ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait, ModelTrait,
	PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};

/// Outcome of [`Catalog::upsert_scanned_file`], feeding the scanner's
/// `new`/`updated`/`unchanged` counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
	New,
	Updated,
	Unchanged,
}

/// One file observed during a directory walk, ready to reconcile.
#[derive(Debug, Clone)]
pub struct ScannedEntry {
	pub path: String,
	pub size: i64,
	pub mtime: f64,
	pub ext: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DirScanStats {
	pub new: u64,
	pub updated: u64,
	pub unchanged: u64,
}

#[derive(Debug, Clone, Default)]
pub struct FileFilters {
	pub root_id: Option<i32>,
	pub ext: Option<String>,
	pub min_size: Option<i64>,
	pub max_size: Option<i64>,
	pub path_contains: Option<String>,
	pub missing: Option<bool>,
	pub page: u64,
	pub page_size: u64,
}

#[derive(Debug, Clone, Default)]
pub struct FileStats {
	pub total_files: u64,
	pub total_size: i64,
	pub missing_files: u64,
	pub pending_hash: u64,
}

impl Catalog {
	/// Reconcile one observed on-disk file with the catalog. `scan_time`
	/// stamps `last_seen`.
	pub async fn upsert_scanned_file(
		&self,
		root_id: i32,
		path: &str,
		size: i64,
		mtime: f64,
		ext: Option<String>,
		scan_time: DateTime<Utc>,
	) -> CoreResult<UpsertOutcome> {
		let existing = File::find()
			.filter(file::Column::RootId.eq(root_id))
			.filter(file::Column::Path.eq(path))
			.one(self.conn())
			.await?;

		match existing {
			Some(row) if row.mtime == mtime => {
				let mut active: FileActive = row.into();
				active.last_seen = Set(Some(scan_time));
				active.update(self.conn()).await?;
				Ok(UpsertOutcome::Unchanged)
			}
			Some(row) => {
				let mut active: FileActive = row.into();
				active.size = Set(size);
				active.mtime = Set(mtime);
				active.ext = Set(ext);
				active.last_seen = Set(Some(scan_time));
				active.update(self.conn()).await?;
				Ok(UpsertOutcome::Updated)
			}
			None => {
				let active = FileActive {
					root_id: Set(root_id),
					path: Set(path.to_string()),
					size: Set(size),
					mtime: Set(mtime),
					ext: Set(ext),
					last_seen: Set(Some(scan_time)),
					hash_status: Set(file::HashStatus::Pending.to_string()),
					..Default::default()
				};
				active.insert(self.conn()).await?;
				Ok(UpsertOutcome::New)
			}
		}
	}

	/// Reconcile every file observed in one directory within a single
	/// transaction, so a crash mid-scan never leaves a directory half
	/// written. Mirrors the scanner's per-directory commit.
	pub async fn upsert_scanned_dir(
		&self,
		root_id: i32,
		entries: Vec<ScannedEntry>,
		scan_time: DateTime<Utc>,
	) -> CoreResult<DirScanStats> {
		let txn = self.conn().begin().await?;
		let mut stats = DirScanStats::default();

		for entry in entries {
			let existing = File::find()
				.filter(file::Column::RootId.eq(root_id))
				.filter(file::Column::Path.eq(entry.path.clone()))
				.one(&txn)
				.await?;

			match existing {
				Some(row) if row.mtime == entry.mtime => {
					let mut active: FileActive = row.into();
					active.last_seen = Set(Some(scan_time));
					active.update(&txn).await?;
					stats.unchanged += 1;
				}
				Some(row) => {
					let mut active: FileActive = row.into();
					active.size = Set(entry.size);
					active.mtime = Set(entry.mtime);
					active.ext = Set(entry.ext);
					active.last_seen = Set(Some(scan_time));
					active.update(&txn).await?;
					stats.updated += 1;
				}
				None => {
					let active = FileActive {
						root_id: Set(root_id),
						path: Set(entry.path),
						size: Set(entry.size),
						mtime: Set(entry.mtime),
						ext: Set(entry.ext),
						last_seen: Set(Some(scan_time)),
						hash_status: Set(file::HashStatus::Pending.to_string()),
						..Default::default()
					};
					active.insert(&txn).await?;
					stats.new += 1;
				}
			}
		}

		txn.commit().await?;
		Ok(stats)
	}

	/// Mark every file under `root_id` not observed by `scan_time` as missing
	/// (`last_seen = NULL`). Returns the number of files marked.
	pub async fn mark_root_files_missing_before(
		&self,
		root_id: i32,
		scan_time: DateTime<Utc>,
	) -> CoreResult<u64> {
		let stale = File::find()
			.filter(file::Column::RootId.eq(root_id))
			.filter(
				Condition::any()
					.add(file::Column::LastSeen.is_null())
					.add(file::Column::LastSeen.lt(scan_time)),
			)
			.all(self.conn())
			.await?;

		let count = stale.len() as u64;
		for row in stale {
			if row.last_seen.is_none() {
				continue; // already missing, nothing to change
			}
			let mut active: FileActive = row.into();
			active.last_seen = Set(None);
			active.update(self.conn()).await?;
		}
		Ok(count)
	}

	pub async fn get_file(&self, id: i32) -> CoreResult<file::Model> {
		File::find_by_id(id)
			.one(self.conn())
			.await?
			.ok_or_else(|| CoreError::not_found(format!("file {id}")))
	}

	pub async fn set_file_hash_status(&self, id: i32, status: file::HashStatus) -> CoreResult<()> {
		let row = self.get_file(id).await?;
		let mut active: FileActive = row.into();
		active.hash_status = Set(status.to_string());
		active.update(self.conn()).await?;
		Ok(())
	}

	pub async fn set_file_fingerprints(
		&self,
		id: i32,
		quick_sig: Option<String>,
		full_hash: Option<String>,
		status: file::HashStatus,
	) -> CoreResult<()> {
		let row = self.get_file(id).await?;
		let mut active: FileActive = row.into();
		active.quick_sig = Set(quick_sig);
		active.full_hash = Set(full_hash);
		active.hash_status = Set(status.to_string());
		active.update(self.conn()).await?;
		Ok(())
	}

	/// Set a file's path (and optionally hash status) — used by quarantine/restore.
	pub async fn relocate_file(
		&self,
		id: i32,
		new_path: &str,
		status: file::HashStatus,
	) -> CoreResult<file::Model> {
		let row = self.get_file(id).await?;
		let mut active: FileActive = row.into();
		active.path = Set(new_path.to_string());
		active.hash_status = Set(status.to_string());
		Ok(active.update(self.conn()).await?)
	}

	pub async fn files_pending_hash(&self) -> CoreResult<Vec<file::Model>> {
		Ok(File::find()
			.filter(
				Condition::any()
					.add(file::Column::HashStatus.eq(file::HashStatus::Pending.to_string())),
			)
			.all(self.conn())
			.await?)
	}

	pub async fn list_files(&self, filters: &FileFilters) -> CoreResult<(Vec<file::Model>, u64)> {
		let mut query = File::find();

		if let Some(root_id) = filters.root_id {
			query = query.filter(file::Column::RootId.eq(root_id));
		}
		if let Some(ext) = &filters.ext {
			query = query.filter(file::Column::Ext.eq(ext.clone()));
		}
		if let Some(min_size) = filters.min_size {
			query = query.filter(file::Column::Size.gte(min_size));
		}
		if let Some(max_size) = filters.max_size {
			query = query.filter(file::Column::Size.lte(max_size));
		}
		if let Some(needle) = &filters.path_contains {
			query = query.filter(file::Column::Path.contains(needle));
		}
		if let Some(missing) = filters.missing {
			query = if missing {
				query.filter(file::Column::LastSeen.is_null())
			} else {
				query.filter(file::Column::LastSeen.is_not_null())
			};
		}

		let paginator = query
			.order_by_asc(file::Column::Id)
			.paginate(self.conn(), filters.page_size.max(1));
		let total = paginator.num_items().await?;
		let page = filters.page;
		let rows = paginator.fetch_page(page).await?;
		Ok((rows, total))
	}

	pub async fn file_stats(&self) -> CoreResult<FileStats> {
		let total_files = File::find().count(self.conn()).await?;
		let missing_files = File::find()
			.filter(file::Column::LastSeen.is_null())
			.count(self.conn())
			.await?;
		let pending_hash = File::find()
			.filter(file::Column::HashStatus.eq(file::HashStatus::Pending.to_string()))
			.count(self.conn())
			.await?;

		let rows = File::find()
			.select_only()
			.column(file::Column::Size)
			.into_tuple::<i64>()
			.all(self.conn())
			.await?;
		let total_size = rows.into_iter().sum();

		Ok(FileStats {
			total_files,
			total_size,
			missing_files,
			pending_hash,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::Catalog;

	async fn setup() -> (Catalog, i32) {
		let catalog = Catalog::open_in_memory().await.unwrap();
		let drive = catalog.register_drive("/mnt/a", None, None).await.unwrap();
		let root = catalog.add_root(drive.id, "/mnt/a/lib", false).await.unwrap();
		(catalog, root.id)
	}

	#[tokio::test]
	async fn upsert_scanned_dir_classifies_new_updated_and_unchanged() {
		let (catalog, root_id) = setup().await;
		let t0 = Utc::now();

		let first_pass = catalog
			.upsert_scanned_dir(
				root_id,
				vec![
					ScannedEntry { path: "/mnt/a/lib/a.mkv".into(), size: 10, mtime: 1.0, ext: Some("mkv".into()) },
					ScannedEntry { path: "/mnt/a/lib/b.mkv".into(), size: 20, mtime: 1.0, ext: Some("mkv".into()) },
				],
				t0,
			)
			.await
			.unwrap();
		assert_eq!(first_pass.new, 2);
		assert_eq!(first_pass.updated, 0);
		assert_eq!(first_pass.unchanged, 0);

		let t1 = t0 + chrono::Duration::seconds(1);
		let second_pass = catalog
			.upsert_scanned_dir(
				root_id,
				vec![
					ScannedEntry { path: "/mnt/a/lib/a.mkv".into(), size: 99, mtime: 2.0, ext: Some("mkv".into()) },
					ScannedEntry { path: "/mnt/a/lib/b.mkv".into(), size: 20, mtime: 1.0, ext: Some("mkv".into()) },
				],
				t1,
			)
			.await
			.unwrap();
		assert_eq!(second_pass.new, 0);
		assert_eq!(second_pass.updated, 1);
		assert_eq!(second_pass.unchanged, 1);
	}

	#[tokio::test]
	async fn files_unseen_since_scan_time_are_marked_missing() {
		let (catalog, root_id) = setup().await;
		let t0 = Utc::now();
		catalog
			.upsert_scanned_dir(
				root_id,
				vec![ScannedEntry { path: "/mnt/a/lib/a.mkv".into(), size: 10, mtime: 1.0, ext: Some("mkv".into()) }],
				t0,
			)
			.await
			.unwrap();

		let t1 = t0 + chrono::Duration::seconds(1);
		let missing = catalog.mark_root_files_missing_before(root_id, t1).await.unwrap();
		assert_eq!(missing, 1);

		let (rows, _) = catalog
			.list_files(&FileFilters { root_id: Some(root_id), page_size: 10, ..Default::default() })
			.await
			.unwrap();
		assert!(rows[0].last_seen.is_none());
	}

	#[tokio::test]
	async fn unchanged_file_keeps_mtime_and_only_advances_last_seen() {
		let (catalog, root_id) = setup().await;
		let t0 = Utc::now();
		catalog
			.upsert_scanned_dir(
				root_id,
				vec![ScannedEntry { path: "/mnt/a/lib/a.mkv".into(), size: 10, mtime: 1.0, ext: Some("mkv".into()) }],
				t0,
			)
			.await
			.unwrap();

		let t1 = t0 + chrono::Duration::seconds(5);
		catalog
			.upsert_scanned_dir(
				root_id,
				vec![ScannedEntry { path: "/mnt/a/lib/a.mkv".into(), size: 10, mtime: 1.0, ext: Some("mkv".into()) }],
				t1,
			)
			.await
			.unwrap();

		let (rows, _) = catalog
			.list_files(&FileFilters { root_id: Some(root_id), page_size: 10, ..Default::default() })
			.await
			.unwrap();
		assert_eq!(rows[0].mtime, 1.0);
		assert_eq!(rows[0].last_seen.unwrap().timestamp(), t1.timestamp());
	}
}
