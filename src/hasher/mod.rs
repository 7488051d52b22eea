//! Two-tier fingerprinting: a cheap quick signature for first-pass grouping,
//! and a full SHA-256 for exact confirmation. Computation runs on
//! `spawn_blocking` so it never stalls the async runtime.

mod queue;

pub use queue::{HashQueue, HashQueueStatus, HashQueueState};

use crate::error::CoreResult;
use md5::{Digest as Md5Digest, Md5};
use sha2::Sha256;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

const CHUNK_SIZE: usize = 1024 * 1024;
const QUICK_SIG_SIZE: u64 = 1024 * 1024;

/// `"{size}:{first_md5_16}:{last_md5_16}"` — size plus MD5 of the first and
/// last megabyte, truncated to 16 hex characters each. Cheap enough to run
/// on every file up front; full hash confirmation follows only when two
/// quick signatures collide.
pub fn compute_quick_signature(path: &Path) -> CoreResult<String> {
	let mut file = File::open(path)?;
	let size = file.metadata()?.len();

	let mut first_buf = vec![0u8; QUICK_SIG_SIZE.min(size) as usize];
	file.read_exact(&mut first_buf)?;
	let first_hash = &hex::encode(Md5::digest(&first_buf))[..16];

	let last_hash = if size > QUICK_SIG_SIZE {
		file.seek(SeekFrom::End(-(QUICK_SIG_SIZE as i64)))?;
		let mut last_buf = vec![0u8; QUICK_SIG_SIZE as usize];
		file.read_exact(&mut last_buf)?;
		hex::encode(Md5::digest(&last_buf))[..16].to_string()
	} else {
		first_hash.to_string()
	};

	Ok(format!("{size}:{first_hash}:{last_hash}"))
}

/// Whole-file SHA-256, read in 1MiB chunks.
pub fn compute_full_hash(path: &Path) -> CoreResult<String> {
	let mut file = File::open(path)?;
	let mut hasher = Sha256::new();
	let mut buf = vec![0u8; CHUNK_SIZE];

	loop {
		let n = file.read(&mut buf)?;
		if n == 0 {
			break;
		}
		hasher.update(&buf[..n]);
	}

	Ok(hex::encode(hasher.finalize()))
}

/// Compute both fingerprints for one file, run off the async executor.
pub async fn hash_file(path: impl AsRef<Path> + Send + 'static) -> CoreResult<(String, String)> {
	let path = path.as_ref().to_path_buf();
	let quick = {
		let path = path.clone();
		tokio::task::spawn_blocking(move || compute_quick_signature(&path))
			.await
			.map_err(|e| crate::error::CoreError::invalid(format!("hash task panicked: {e}")))??
	};
	let full = {
		let path = path.clone();
		tokio::task::spawn_blocking(move || compute_full_hash(&path))
			.await
			.map_err(|e| crate::error::CoreError::invalid(format!("hash task panicked: {e}")))??
	};
	Ok((quick, full))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	#[test]
	fn quick_signature_is_deterministic_and_size_prefixed() {
		let mut file = NamedTempFile::new().unwrap();
		file.write_all(&vec![7u8; 2 * 1024 * 1024]).unwrap();
		let sig_a = compute_quick_signature(file.path()).unwrap();
		let sig_b = compute_quick_signature(file.path()).unwrap();
		assert_eq!(sig_a, sig_b);
		assert!(sig_a.starts_with("2097152:"));
	}

	#[test]
	fn quick_signature_handles_small_files_without_seek_underflow() {
		let mut file = NamedTempFile::new().unwrap();
		file.write_all(b"tiny").unwrap();
		let sig = compute_quick_signature(file.path()).unwrap();
		assert!(sig.starts_with("4:"));
	}

	#[test]
	fn full_hash_matches_known_sha256() {
		let mut file = NamedTempFile::new().unwrap();
		file.write_all(b"hello world").unwrap();
		let hash = compute_full_hash(file.path()).unwrap();
		assert_eq!(
			hash,
			"b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
		);
	}
}
