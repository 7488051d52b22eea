//! Verified file copy: stream to a `.tmp` sibling, check size (and
//! optionally full hash), then atomically rename into place. Any failure
//! removes the temp file so a crash mid-copy never leaves a half-written
//! file at the final path.

use crate::error::{CoreError, CoreResult};
use crate::hasher;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct CopyOptions {
	pub verify_hash: bool,
	pub overwrite: bool,
}

impl Default for CopyOptions {
	fn default() -> Self {
		Self {
			verify_hash: true,
			overwrite: false,
		}
	}
}

#[derive(Debug, Clone, Copy)]
pub struct CopyProgress {
	pub bytes_copied: u64,
	pub total_bytes: u64,
}

pub type ProgressCallback = Arc<dyn Fn(CopyProgress) + Send + Sync>;

/// Copy `source` to `dest`, verifying size (and hash, if requested) before
/// the final atomic rename. Runs on a blocking thread since it's pure I/O.
pub async fn safe_copy(
	source: PathBuf,
	dest: PathBuf,
	options: CopyOptions,
	on_progress: Option<ProgressCallback>,
) -> CoreResult<()> {
	tokio::task::spawn_blocking(move || copy_blocking(&source, &dest, options, on_progress))
		.await
		.map_err(|join_err| CoreError::internal(format!("copy task panicked: {join_err}")))?
}

fn copy_blocking(
	source: &Path,
	dest: &Path,
	options: CopyOptions,
	on_progress: Option<ProgressCallback>,
) -> CoreResult<()> {
	if !source.is_file() {
		return Err(CoreError::not_found(format!(
			"source file not found: {}",
			source.display()
		)));
	}
	if dest.exists() && !options.overwrite {
		return Err(CoreError::conflict(format!(
			"destination already exists: {}",
			dest.display()
		)));
	}

	let temp_dest = temp_path(dest);

	if let Some(parent) = dest.parent() {
		std::fs::create_dir_all(parent)?;
	}

	let source_size = std::fs::metadata(source)?.len();

	let result = (|| -> CoreResult<()> {
		stream_copy(source, &temp_dest, source_size, on_progress.as_ref())?;

		let temp_size = std::fs::metadata(&temp_dest)?.len();
		if temp_size != source_size {
			return Err(CoreError::integrity(format!(
				"size mismatch after copy: source={source_size}, copied={temp_size}"
			)));
		}

		if options.verify_hash {
			let source_hash = hasher::compute_full_hash(source)?;
			let dest_hash = hasher::compute_full_hash(&temp_dest)?;
			if source_hash != dest_hash {
				return Err(CoreError::integrity("hash mismatch after copy"));
			}
		}

		if dest.exists() {
			std::fs::remove_file(dest)?;
		}
		std::fs::rename(&temp_dest, dest)?;
		Ok(())
	})();

	if result.is_err() && temp_dest.exists() {
		let _ = std::fs::remove_file(&temp_dest);
	}

	result
}

fn stream_copy(
	source: &Path,
	temp_dest: &Path,
	total_bytes: u64,
	on_progress: Option<&ProgressCallback>,
) -> CoreResult<()> {
	let mut src_file = std::fs::File::open(source)?;
	let mut dst_file = std::fs::File::create(temp_dest)?;
	let mut buf = vec![0u8; CHUNK_SIZE];
	let mut bytes_copied = 0u64;

	loop {
		let read = src_file.read(&mut buf)?;
		if read == 0 {
			break;
		}
		dst_file.write_all(&buf[..read])?;
		bytes_copied += read as u64;

		if let Some(callback) = on_progress {
			callback(CopyProgress {
				bytes_copied,
				total_bytes,
			});
		}
	}

	dst_file.flush()?;
	Ok(())
}

fn temp_path(dest: &Path) -> PathBuf {
	let mut name = dest
		.file_name()
		.map(|n| n.to_os_string())
		.unwrap_or_default();
	name.push(".tmp");
	dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU64, Ordering};

	#[tokio::test]
	async fn copies_and_verifies_small_file() {
		let dir = tempfile::tempdir().unwrap();
		let source = dir.path().join("source.bin");
		std::fs::write(&source, b"hello world").unwrap();
		let dest = dir.path().join("dest.bin");

		safe_copy(source.clone(), dest.clone(), CopyOptions::default(), None)
			.await
			.unwrap();

		assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");
		assert!(!temp_path(&dest).exists());
	}

	#[tokio::test]
	async fn refuses_to_overwrite_without_flag() {
		let dir = tempfile::tempdir().unwrap();
		let source = dir.path().join("source.bin");
		std::fs::write(&source, b"data").unwrap();
		let dest = dir.path().join("dest.bin");
		std::fs::write(&dest, b"existing").unwrap();

		let err = safe_copy(source, dest, CopyOptions::default(), None)
			.await
			.unwrap_err();
		assert!(matches!(err, CoreError::Conflict(_)));
	}

	#[tokio::test]
	async fn reports_progress() {
		let dir = tempfile::tempdir().unwrap();
		let source = dir.path().join("source.bin");
		std::fs::write(&source, vec![7u8; 4096]).unwrap();
		let dest = dir.path().join("dest.bin");

		let total_seen = Arc::new(AtomicU64::new(0));
		let total_seen_clone = Arc::clone(&total_seen);
		let callback: ProgressCallback = Arc::new(move |progress: CopyProgress| {
			total_seen_clone.store(progress.bytes_copied, Ordering::SeqCst);
		});

		safe_copy(source, dest, CopyOptions::default(), Some(callback))
			.await
			.unwrap();

		assert_eq!(total_seen.load(Ordering::SeqCst), 4096);
	}

	#[tokio::test]
	async fn cleans_up_temp_file_on_missing_source() {
		let dir = tempfile::tempdir().unwrap();
		let source = dir.path().join("missing.bin");
		let dest = dir.path().join("dest.bin");

		let err = safe_copy(source, dest.clone(), CopyOptions::default(), None)
			.await
			.unwrap_err();
		assert!(matches!(err, CoreError::NotFound(_)));
		assert!(!temp_path(&dest).exists());
	}
}
