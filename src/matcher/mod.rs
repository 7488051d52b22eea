//! Groups files into media items: exact full-hash equality first, quick
//! signature as a fallback that requires manual confirmation, otherwise a
//! brand new item seeded from the parsed filename.

use crate::catalog::entities::media_item;
use crate::catalog::{Catalog, ItemFilters, MergeOutcome, NewItemMeta, SplitOutcome};
use crate::error::CoreResult;
use crate::parser::{self, ParsedMedia};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct LinkStats {
	pub processed: u64,
	pub new_items: u64,
	pub linked: u64,
	pub skipped: u64,
}

pub struct Matcher {
	catalog: Arc<Catalog>,
}

impl Matcher {
	pub fn new(catalog: Arc<Catalog>) -> Self {
		Self { catalog }
	}

	/// Find an existing item matching either fingerprint. Full-hash equality
	/// wins outright; a quick-signature-only match demotes the item to
	/// `needs_verification` since equal quick signatures don't prove
	/// byte-identical content.
	pub async fn find_match(
		&self,
		quick_sig: Option<&str>,
		full_hash: Option<&str>,
	) -> CoreResult<Option<i32>> {
		if quick_sig.is_none() && full_hash.is_none() {
			return Ok(None);
		}

		if let Some(full_hash) = full_hash {
			if let Some(item_id) = self.catalog.find_item_by_full_hash(full_hash).await? {
				return Ok(Some(item_id));
			}
		}

		if let Some(quick_sig) = quick_sig {
			if let Some(item_id) = self.catalog.find_item_by_quick_sig(quick_sig).await? {
				return Ok(Some(item_id));
			}
		}

		Ok(None)
	}

	/// Link `file_id` to a matching item, or create a new one from its
	/// parsed filename. No-op for non-video files or files already linked.
	pub async fn create_or_link(&self, file_id: i32) -> CoreResult<Option<i32>> {
		let file = self.catalog.get_file(file_id).await?;

		if !parser::is_video_file(&file.path) {
			return Ok(None);
		}
		if self.catalog.file_is_linked(file_id).await? {
			return Ok(None);
		}

		if let Some(item_id) = self
			.find_match(file.quick_sig.as_deref(), file.full_hash.as_deref())
			.await?
		{
			self.catalog.link_file(item_id, file_id, false).await?;
			return Ok(Some(item_id));
		}

		let parsed = parser::parse_path(&file.path);
		let item = self
			.catalog
			.create_item(meta_from_parsed(&parsed), media_item::ItemStatus::Auto)
			.await?;
		self.catalog.link_file(item.id, file_id, true).await?;

		Ok(Some(item.id))
	}

	/// Process every file not yet linked to a media item. Skips non-video
	/// files without counting them as processed.
	pub async fn process_unlinked(&self) -> CoreResult<LinkStats> {
		let mut stats = LinkStats::default();
		let unlinked = self.catalog.unlinked_files().await?;

		for file in unlinked {
			if !parser::is_video_file(&file.path) {
				stats.skipped += 1;
				continue;
			}

			let result = self.create_or_link(file.id).await?;
			stats.processed += 1;

			if let Some(item_id) = result {
				let count = self.catalog.item_file_count(item_id).await?;
				if count == 1 {
					stats.new_items += 1;
				} else {
					stats.linked += 1;
				}
			}
		}

		debug!(?stats, "processed unlinked files");
		Ok(stats)
	}

	pub async fn merge(&self, target_id: i32, source_ids: &[i32]) -> CoreResult<MergeOutcome> {
		self.catalog.merge_items(target_id, source_ids).await
	}

	pub async fn split(&self, file_id: i32) -> CoreResult<SplitOutcome> {
		let file = self.catalog.get_file(file_id).await?;
		let parsed = parser::parse_path(&file.path);
		self.catalog
			.split_file(file_id, meta_from_parsed(&parsed))
			.await
	}

	pub async fn list_items(
		&self,
		filters: &ItemFilters,
	) -> CoreResult<(Vec<media_item::Model>, u64)> {
		self.catalog.list_items(filters).await
	}
}

fn meta_from_parsed(parsed: &ParsedMedia) -> NewItemMeta {
	NewItemMeta {
		item_type: parsed.media_type,
		title: parsed.title.clone(),
		year: parsed.year,
		season: parsed.season,
		episode: parsed.episode,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::Catalog;
	use chrono::Utc;

	async fn setup() -> (Arc<Catalog>, Matcher, i32) {
		let catalog = Arc::new(Catalog::open_in_memory().await.unwrap());
		let drive = catalog
			.register_drive("/mnt/a", None, None)
			.await
			.unwrap();
		let root = catalog.add_root(drive.id, "/mnt/a/movies", false).await.unwrap();
		(Arc::clone(&catalog), Matcher::new(catalog), root.id)
	}

	async fn insert_hashed_file(
		catalog: &Catalog,
		root_id: i32,
		path: &str,
		quick_sig: &str,
		full_hash: Option<&str>,
	) -> i32 {
		catalog
			.upsert_scanned_file(root_id, path, 1024, 1.0, Some("mkv".into()), Utc::now())
			.await
			.unwrap();
		let (_, total) = catalog
			.list_files(&crate::catalog::FileFilters {
				path_contains: Some(path.to_string()),
				page_size: 10,
				..Default::default()
			})
			.await
			.unwrap();
		assert_eq!(total, 1);
		let (rows, _) = catalog
			.list_files(&crate::catalog::FileFilters {
				path_contains: Some(path.to_string()),
				page_size: 10,
				..Default::default()
			})
			.await
			.unwrap();
		let file_id = rows[0].id;
		catalog
			.set_file_fingerprints(
				file_id,
				Some(quick_sig.to_string()),
				full_hash.map(str::to_string),
				crate::catalog::entities::file::HashStatus::Complete,
			)
			.await
			.unwrap();
		file_id
	}

	#[tokio::test]
	async fn two_identical_full_hashes_produce_one_item_with_two_copies() {
		let (catalog, matcher, root_id) = setup().await;
		let a = insert_hashed_file(&catalog, root_id, "/mnt/a/movies/a.mkv", "q1", Some("deadbeef")).await;
		let b = insert_hashed_file(&catalog, root_id, "/mnt/a/movies/b.mkv", "q2", Some("deadbeef")).await;

		let item_a = matcher.create_or_link(a).await.unwrap().unwrap();
		let item_b = matcher.create_or_link(b).await.unwrap().unwrap();

		assert_eq!(item_a, item_b);
		assert_eq!(catalog.item_file_count(item_a).await.unwrap(), 2);
	}

	#[tokio::test]
	async fn quick_signature_only_match_demotes_item_to_needs_verification() {
		let (catalog, matcher, root_id) = setup().await;
		let a = insert_hashed_file(&catalog, root_id, "/mnt/a/movies/a.mkv", "same-sig", None).await;
		let b = insert_hashed_file(&catalog, root_id, "/mnt/a/movies/b.mkv", "same-sig", None).await;

		let item_a = matcher.create_or_link(a).await.unwrap().unwrap();
		let item_b = matcher.create_or_link(b).await.unwrap().unwrap();

		assert_eq!(item_a, item_b);
		let item = catalog.get_item(item_a).await.unwrap();
		assert_eq!(
			item.item_status(),
			crate::catalog::entities::media_item::ItemStatus::NeedsVerification
		);
	}

	#[tokio::test]
	async fn unmatched_file_seeds_a_new_item_from_its_parsed_path() {
		let (catalog, matcher, root_id) = setup().await;
		let a = insert_hashed_file(
			&catalog,
			root_id,
			"/mnt/a/movies/The.Matrix.1999.mkv",
			"uniq",
			Some("uniquehash"),
		)
		.await;

		let item_id = matcher.create_or_link(a).await.unwrap().unwrap();
		let item = catalog.get_item(item_id).await.unwrap();
		assert_eq!(item.title.as_deref(), Some("The Matrix"));
		assert_eq!(item.year, Some(1999));
	}

	#[tokio::test]
	async fn non_video_files_are_skipped() {
		let (catalog, matcher, root_id) = setup().await;
		let f = insert_hashed_file(&catalog, root_id, "/mnt/a/movies/poster.jpg", "q", None).await;
		assert_eq!(matcher.create_or_link(f).await.unwrap(), None);
		assert!(!catalog.file_is_linked(f).await.unwrap());
	}

	#[tokio::test]
	async fn merge_then_split_restores_two_distinct_items() {
		let (catalog, matcher, root_id) = setup().await;
		let a = insert_hashed_file(&catalog, root_id, "/mnt/a/movies/a.mkv", "qa", Some("ha")).await;
		let b = insert_hashed_file(&catalog, root_id, "/mnt/a/movies/b.mkv", "qb", Some("hb")).await;

		let item_a = matcher.create_or_link(a).await.unwrap().unwrap();
		let item_b = matcher.create_or_link(b).await.unwrap().unwrap();
		assert_ne!(item_a, item_b);

		let merge = matcher.merge(item_a, &[item_b]).await.unwrap();
		assert_eq!(merge.target_id, item_a);
		assert_eq!(catalog.item_file_count(item_a).await.unwrap(), 2);
		assert!(catalog.get_item(item_b).await.is_err());

		let split = matcher.split(b).await.unwrap();
		assert_eq!(split.old_item_id, item_a);
		assert_ne!(split.new_item_id, item_a);
		assert_eq!(catalog.item_file_count(item_a).await.unwrap(), 1);
		assert_eq!(catalog.item_file_count(split.new_item_id).await.unwrap(), 1);
	}

	#[tokio::test]
	async fn process_unlinked_links_every_unmatched_video_file() {
		let (catalog, matcher, root_id) = setup().await;
		insert_hashed_file(&catalog, root_id, "/mnt/a/movies/a.mkv", "qa", Some("ha")).await;
		insert_hashed_file(&catalog, root_id, "/mnt/a/movies/b.mkv", "qb", Some("ha")).await;
		insert_hashed_file(&catalog, root_id, "/mnt/a/movies/poster.jpg", "qc", None).await;

		let stats = matcher.process_unlinked().await.unwrap();
		assert_eq!(stats.processed, 2);
		assert_eq!(stats.skipped, 1);
		assert_eq!(stats.new_items, 1);
		assert_eq!(stats.linked, 1);
	}
}

