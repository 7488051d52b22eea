//! Dedicated per-scan log pair: a machine-readable ndjson stream and a
//! human-readable text mirror, independent of the `tracing` subscriber so a
//! scan's history survives even with logging filtered elsewhere.

use chrono::Utc;
use serde_json::json;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::CoreResult;

pub struct ScanLog {
	jsonl: File,
	text: File,
}

impl ScanLog {
	/// Create a fresh `scan_<timestamp>.jsonl` / `.log` pair under `log_dir`.
	pub fn create(log_dir: &Path, timestamp: &str) -> CoreResult<Self> {
		std::fs::create_dir_all(log_dir)?;
		let jsonl_path = log_dir.join(format!("scan_{timestamp}.jsonl"));
		let text_path = log_dir.join(format!("scan_{timestamp}.log"));

		Ok(Self {
			jsonl: OpenOptions::new()
				.create(true)
				.append(true)
				.open(jsonl_path)?,
			text: OpenOptions::new().create(true).append(true).open(text_path)?,
		})
	}

	pub fn event(&mut self, event_type: &str, data: serde_json::Value) {
		let now = Utc::now().to_rfc3339();

		let mut entry = json!({ "timestamp": now, "type": event_type });
		if let (Some(entry_obj), Some(data_obj)) = (entry.as_object_mut(), data.as_object()) {
			for (key, value) in data_obj {
				entry_obj.insert(key.clone(), value.clone());
			}
		}
		let _ = writeln!(self.jsonl, "{entry}");
		let _ = writeln!(self.text, "[{now}] {event_type}: {data}");
	}
}

/// The `(jsonl, text)` path pair a [`ScanLog::create`] call with the same
/// arguments would produce — surfaced so callers can report where a scan's
/// logs landed without holding onto the `ScanLog` itself.
pub fn log_file_paths(log_dir: &Path, timestamp: &str) -> (PathBuf, PathBuf) {
	(
		log_dir.join(format!("scan_{timestamp}.jsonl")),
		log_dir.join(format!("scan_{timestamp}.log")),
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn log_file_paths_matches_what_create_would_write() {
		let dir = std::path::PathBuf::from("/tmp/milestone-scan-logs");
		let (jsonl, text) = log_file_paths(&dir, "20260731_120000");
		assert_eq!(jsonl, dir.join("scan_20260731_120000.jsonl"));
		assert_eq!(text, dir.join("scan_20260731_120000.log"));
	}
}
