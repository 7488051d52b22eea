//! Reversible delete: move a file to `{drive}/{quarantine_dirname}/{date}/{relative_path}`
//! and flip its hash status, or move it back out again. Never unlinks the
//! database row and never deletes bytes outright.

use crate::catalog::entities::file;
use crate::catalog::Catalog;
use crate::error::{CoreError, CoreResult};
use chrono::Utc;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct QuarantineMove {
	pub file_id: i32,
	pub original_path: String,
	pub quarantine_path: String,
}

#[derive(Debug, Clone)]
pub struct QuarantineError {
	pub file_id: i32,
	pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct QuarantineSummary {
	pub moved: Vec<QuarantineMove>,
	pub errors: Vec<QuarantineError>,
}

/// Move each file in `file_ids` into quarantine under its own drive,
/// preserving its path relative to the drive's mount point. A failure on one
/// file is recorded in `errors` and does not stop the rest.
pub async fn quarantine_files(
	catalog: &Catalog,
	file_ids: &[i32],
	quarantine_dirname: &str,
) -> CoreResult<QuarantineSummary> {
	let date_str = Utc::now().format("%Y-%m-%d").to_string();
	let mut summary = QuarantineSummary::default();

	for &file_id in file_ids {
		match quarantine_one(catalog, file_id, quarantine_dirname, &date_str).await {
			Ok(moved) => summary.moved.push(moved),
			Err(err) => summary.errors.push(QuarantineError {
				file_id,
				error: err.to_string(),
			}),
		}
	}

	Ok(summary)
}

async fn quarantine_one(
	catalog: &Catalog,
	file_id: i32,
	quarantine_dirname: &str,
	date_str: &str,
) -> CoreResult<QuarantineMove> {
	let row = catalog.get_file(file_id).await?;
	let root = catalog.get_root(row.root_id).await?;
	let drive = catalog.get_drive(root.drive_id).await?;

	let source_path = PathBuf::from(&row.path);
	if !source_path.exists() {
		return Err(CoreError::not_found(format!(
			"file does not exist on disk: {}",
			source_path.display()
		)));
	}

	let relative = source_path
		.strip_prefix(&drive.mount_path)
		.unwrap_or(&source_path);
	let quarantine_dest = Path::new(&drive.mount_path)
		.join(quarantine_dirname)
		.join(date_str)
		.join(relative);

	if let Some(parent) = quarantine_dest.parent() {
		std::fs::create_dir_all(parent)?;
	}
	move_file(&source_path, &quarantine_dest)?;

	let quarantine_path = quarantine_dest.to_string_lossy().into_owned();
	catalog
		.relocate_file(file_id, &quarantine_path, file::HashStatus::Quarantined)
		.await?;

	Ok(QuarantineMove {
		file_id,
		original_path: row.path,
		quarantine_path,
	})
}

/// Restore each quarantined file in `file_ids` back to its original
/// location, inferred from the `{drive}/{quarantine_dirname}/{date}/...`
/// structure `quarantine_files` created.
pub async fn restore_files(
	catalog: &Catalog,
	file_ids: &[i32],
	quarantine_dirname: &str,
) -> CoreResult<QuarantineSummary> {
	let mut summary = QuarantineSummary::default();

	for &file_id in file_ids {
		match restore_one(catalog, file_id, quarantine_dirname).await {
			Ok(moved) => summary.moved.push(moved),
			Err(err) => summary.errors.push(QuarantineError {
				file_id,
				error: err.to_string(),
			}),
		}
	}

	Ok(summary)
}

async fn restore_one(
	catalog: &Catalog,
	file_id: i32,
	quarantine_dirname: &str,
) -> CoreResult<QuarantineMove> {
	let row = catalog.get_file(file_id).await?;
	if row.hash_status() != file::HashStatus::Quarantined {
		return Err(CoreError::invalid(format!(
			"file {file_id} is not quarantined"
		)));
	}

	let original_path = original_path_from_quarantine(&row.path, quarantine_dirname)
		.ok_or_else(|| CoreError::invalid("cannot determine original path"))?;

	if let Some(parent) = original_path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	move_file(Path::new(&row.path), &original_path)?;

	let restored_path = original_path.to_string_lossy().into_owned();
	catalog
		.relocate_file(file_id, &restored_path, file::HashStatus::Pending)
		.await?;

	Ok(QuarantineMove {
		file_id,
		original_path: row.path,
		quarantine_path: restored_path,
	})
}

/// `{drive}/{quarantine_dirname}/{date}/{relative_path}` -> `{drive}/{relative_path}`.
fn original_path_from_quarantine(quarantine_path: &str, quarantine_dirname: &str) -> Option<PathBuf> {
	let idx = quarantine_path.find(quarantine_dirname)?;
	let drive = quarantine_path[..idx].trim_end_matches(std::path::is_separator);

	let rest = &quarantine_path[idx + quarantine_dirname.len()..];
	let mut components = rest
		.split(std::path::is_separator)
		.filter(|p| !p.is_empty());
	components.next()?; // date folder

	let mut original = PathBuf::from(drive);
	for part in components {
		original.push(part);
	}
	Some(original)
}

fn move_file(source: &Path, dest: &Path) -> CoreResult<()> {
	if std::fs::rename(source, dest).is_ok() {
		return Ok(());
	}
	// Cross-filesystem move: copy then remove the original.
	std::fs::copy(source, dest)?;
	std::fs::remove_file(source)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn recovers_original_path_from_quarantine_structure() {
		let quarantine_path = "/mnt/drive_a/.quarantine/2026-07-31/Movies/Foo (2020)/Foo.mkv";
		let original = original_path_from_quarantine(quarantine_path, ".quarantine").unwrap();
		assert_eq!(
			original,
			PathBuf::from("/mnt/drive_a/Movies/Foo (2020)/Foo.mkv")
		);
	}

	#[test]
	fn returns_none_when_quarantine_marker_is_absent() {
		let path = "/mnt/drive_a/Movies/Foo.mkv";
		assert!(original_path_from_quarantine(path, ".quarantine").is_none());
	}

	#[test]
	fn move_file_relocates_bytes_and_removes_source() {
		let dir = tempfile::tempdir().unwrap();
		let source = dir.path().join("source.txt");
		let dest = dir.path().join("nested").join("dest.txt");
		std::fs::write(&source, b"quarantined bytes").unwrap();
		std::fs::create_dir_all(dest.parent().unwrap()).unwrap();

		move_file(&source, &dest).unwrap();

		assert!(!source.exists());
		assert_eq!(std::fs::read(&dest).unwrap(), b"quarantined bytes");
	}
}
