//! Destination drive selection for copy operations: filters out the source
//! drive and any denylisted drive, then ranks the rest by free space with a
//! large boost for drives a user rule prefers.

mod disk;

pub use disk::{disk_usage, DiskUsage};

use crate::catalog::entities::{drive, user_rule};
use crate::catalog::Catalog;
use crate::error::{CoreError, CoreResult};
use std::path::Path;
use std::sync::Arc;

/// Drives keep a copy needs at least the file size plus a 10GiB buffer, or
/// 10% of the file size, whichever is larger.
const MIN_FREE_BUFFER_BYTES: u64 = 10 * 1024 * 1024 * 1024;

/// Score boost for a drive matched by a `prefer_*` rule — large enough that
/// free space alone never outranks an explicit preference.
const PREFERRED_DRIVE_BOOST: u128 = 10u128 * 1024u128.pow(5);

#[derive(Debug, Clone)]
pub struct DestinationCandidate {
	pub drive: drive::Model,
	pub free_bytes: u64,
	pub total_bytes: u64,
	pub score: u128,
}

pub struct DestinationPicker {
	catalog: Arc<Catalog>,
}

impl DestinationPicker {
	pub fn new(catalog: Arc<Catalog>) -> Self {
		Self { catalog }
	}

	/// Rank every drive other than `source_drive_id` as a destination for a
	/// file of `file_size` bytes and (optionally) `media_type`, best first.
	pub async fn rank_destinations(
		&self,
		source_drive_id: i32,
		file_size: i64,
		media_type: Option<&str>,
	) -> CoreResult<Vec<DestinationCandidate>> {
		let all_drives = self.catalog.list_drives().await?;
		let rules = self.catalog.list_rules(None).await?;

		let mut denylist = std::collections::HashSet::new();
		let mut preferred = std::collections::HashSet::new();
		for rule in &rules {
			match rule.rule_type() {
				Some(user_rule::RuleType::Denylist) => {
					denylist.insert(rule.drive_id);
				}
				Some(user_rule::RuleType::PreferAll) => {
					preferred.insert(rule.drive_id);
				}
				Some(user_rule::RuleType::PreferMovie) if media_type == Some("movie") => {
					preferred.insert(rule.drive_id);
				}
				Some(user_rule::RuleType::PreferTv) if media_type == Some("tv_episode") => {
					preferred.insert(rule.drive_id);
				}
				_ => {}
			}
		}

		let mut candidates = Vec::new();
		for drive in all_drives {
			if drive.id == source_drive_id || denylist.contains(&drive.id) {
				continue;
			}

			let usage = match disk_usage(Path::new(&drive.mount_path)).await {
				Ok(usage) => usage,
				Err(_) => continue,
			};

			let min_required = file_size.max(0) as u64
				+ MIN_FREE_BUFFER_BYTES.max((file_size.max(0) as f64 * 0.1) as u64);
			if usage.free_bytes < min_required {
				continue;
			}

			let mut score = usage.free_bytes as u128;
			if preferred.contains(&drive.id) {
				score += PREFERRED_DRIVE_BOOST;
			}

			candidates.push(DestinationCandidate {
				drive,
				free_bytes: usage.free_bytes,
				total_bytes: usage.total_bytes,
				score,
			});
		}

		candidates.sort_by(|a, b| b.score.cmp(&a.score));
		Ok(candidates)
	}

	/// Pick the single best destination drive, or an error if none qualify.
	pub async fn pick_best(
		&self,
		source_drive_id: i32,
		file_size: i64,
		media_type: Option<&str>,
	) -> CoreResult<DestinationCandidate> {
		let mut candidates = self
			.rank_destinations(source_drive_id, file_size, media_type)
			.await?;
		if candidates.is_empty() {
			return Err(CoreError::invalid(
				"no destination drive has enough free space",
			));
		}
		Ok(candidates.remove(0))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn preferred_boost_dwarfs_any_realistic_free_space_difference() {
		// A 1 PiB drive should never outrank a preferred 1 TiB drive.
		let huge_unpreferred = 1024u128.pow(5);
		let modest_preferred = (1024u128.pow(4)) + PREFERRED_DRIVE_BOOST;
		assert!(modest_preferred > huge_unpreferred);
	}
}
