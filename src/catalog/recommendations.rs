//! Deletion recommendations: never auto-deletes, only surfaces files that
//! are safe to quarantine once an item has more copies than it needs.

use super::entities::{media_item, media_item_file, user_rule, File, MediaItem, MediaItemFile, UserRule};
use crate::error::CoreResult;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::collections::HashSet;

use super::Catalog;

#[derive(Debug, Clone)]
pub struct RecommendedFile {
	pub file_id: i32,
	pub path: String,
	pub size: i64,
	pub drive_mount_path: String,
}

#[derive(Debug, Clone)]
pub struct DeletionRecommendation {
	pub item_id: i32,
	pub title: Option<String>,
	pub item_type: String,
	pub total_copies: u64,
	pub files_to_keep: Vec<RecommendedFile>,
	pub files_to_delete: Vec<RecommendedFile>,
	pub savings_bytes: i64,
}

#[derive(Debug, Clone, Default)]
pub struct DeletionRecommendationSummary {
	pub recommendations: Vec<DeletionRecommendation>,
	pub total_items: u64,
	pub total_files_to_delete: u64,
	pub total_savings_bytes: i64,
}

struct FileRow {
	id: i32,
	path: String,
	size: i64,
	drive_id: i32,
	mount_path: String,
	is_primary: bool,
}

impl Catalog {
	/// Items with at least `min_copies` linked files, ranked by keeping the
	/// primary copy plus any copy on a drive with a `prefer_*` rule, topping
	/// up to at least two kept copies before recommending the rest for
	/// quarantine.
	pub async fn deletion_recommendations(
		&self,
		min_copies: u64,
		limit: u64,
	) -> CoreResult<DeletionRecommendationSummary> {
		let preferred_drives: HashSet<i32> = UserRule::find()
			.filter(
				user_rule::Column::RuleType
					.is_in([
						user_rule::RuleType::PreferAll.to_string(),
						user_rule::RuleType::PreferMovie.to_string(),
						user_rule::RuleType::PreferTv.to_string(),
					]),
			)
			.all(self.conn())
			.await?
			.into_iter()
			.map(|r| r.drive_id)
			.collect();

		let items = MediaItem::find()
			.order_by_desc(media_item::Column::Id)
			.all(self.conn())
			.await?;

		let mut recommendations = Vec::new();

		for item in items {
			if recommendations.len() as u64 >= limit {
				break;
			}

			let links = MediaItemFile::find()
				.filter(media_item_file::Column::MediaItemId.eq(item.id))
				.all(self.conn())
				.await?;
			if (links.len() as u64) < min_copies {
				continue;
			}

			let mut rows = Vec::with_capacity(links.len());
			for link in &links {
				let Some(file) = File::find_by_id(link.file_id).one(self.conn()).await? else {
					continue;
				};
				let root = self.get_root(file.root_id).await?;
				let drive = self.get_drive(root.drive_id).await?;
				rows.push(FileRow {
					id: file.id,
					path: file.path,
					size: file.size,
					drive_id: drive.id,
					mount_path: drive.mount_path,
					is_primary: link.is_primary,
				});
			}
			rows.sort_by(|a, b| b.is_primary.cmp(&a.is_primary).then(b.size.cmp(&a.size)));

			let mut keep = Vec::new();
			let mut delete = Vec::new();
			for row in rows {
				if row.is_primary || preferred_drives.contains(&row.drive_id) {
					keep.push(row);
				} else {
					delete.push(row);
				}
			}
			while keep.len() < 2 && !delete.is_empty() {
				keep.push(delete.remove(0));
			}

			if delete.is_empty() {
				continue;
			}

			let savings_bytes: i64 = delete.iter().map(|f| f.size).sum();
			recommendations.push(DeletionRecommendation {
				item_id: item.id,
				title: item.title,
				item_type: item.item_type,
				total_copies: links.len() as u64,
				files_to_keep: keep
					.into_iter()
					.map(|f| RecommendedFile {
						file_id: f.id,
						path: f.path,
						size: f.size,
						drive_mount_path: f.mount_path,
					})
					.collect(),
				files_to_delete: delete
					.into_iter()
					.map(|f| RecommendedFile {
						file_id: f.id,
						path: f.path,
						size: f.size,
						drive_mount_path: f.mount_path,
					})
					.collect(),
				savings_bytes,
			});
		}

		let total_files_to_delete = recommendations
			.iter()
			.map(|r| r.files_to_delete.len() as u64)
			.sum();
		let total_savings_bytes = recommendations.iter().map(|r| r.savings_bytes).sum();

		Ok(DeletionRecommendationSummary {
			total_items: recommendations.len() as u64,
			total_files_to_delete,
			total_savings_bytes,
			recommendations,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::entities::media_item::{ItemStatus, MediaType};
	use crate::catalog::{Catalog, NewItemMeta};
	use chrono::Utc;

	#[tokio::test]
	async fn an_item_with_three_copies_keeps_primary_and_recommends_the_rest() {
		let catalog = Catalog::open_in_memory().await.unwrap();
		let drive = catalog.register_drive("/mnt/a", None, None).await.unwrap();
		let root = catalog.add_root(drive.id, "/mnt/a/lib", false).await.unwrap();

		let mut file_ids = Vec::new();
		for (name, size) in [("primary.mkv", 100), ("copy1.mkv", 50), ("copy2.mkv", 75)] {
			catalog
				.upsert_scanned_file(root.id, &format!("/mnt/a/lib/{name}"), size, 1.0, Some("mkv".into()), Utc::now())
				.await
				.unwrap();
			let (rows, _) = catalog
				.list_files(&super::super::FileFilters { path_contains: Some(name.into()), page_size: 10, ..Default::default() })
				.await
				.unwrap();
			file_ids.push(rows[0].id);
		}

		let item = catalog
			.create_item(
				NewItemMeta { item_type: MediaType::Movie, title: Some("X".into()), ..Default::default() },
				ItemStatus::Auto,
			)
			.await
			.unwrap();
		catalog.link_file(item.id, file_ids[0], true).await.unwrap();
		catalog.link_file(item.id, file_ids[1], false).await.unwrap();
		catalog.link_file(item.id, file_ids[2], false).await.unwrap();

		let summary = catalog.deletion_recommendations(3, 10).await.unwrap();
		assert_eq!(summary.total_items, 1);
		let rec = &summary.recommendations[0];
		assert_eq!(rec.total_copies, 3);
		// Primary plus the larger non-primary copy are kept; the smallest is recommended away.
		assert_eq!(rec.files_to_delete.len(), 1);
		assert_eq!(rec.files_to_delete[0].size, 50);
		assert_eq!(rec.savings_bytes, 50);
	}

	#[tokio::test]
	async fn items_below_min_copies_are_excluded() {
		let catalog = Catalog::open_in_memory().await.unwrap();
		let drive = catalog.register_drive("/mnt/a", None, None).await.unwrap();
		let root = catalog.add_root(drive.id, "/mnt/a/lib", false).await.unwrap();
		catalog
			.upsert_scanned_file(root.id, "/mnt/a/lib/only.mkv", 10, 1.0, Some("mkv".into()), Utc::now())
			.await
			.unwrap();
		let (rows, _) = catalog
			.list_files(&super::super::FileFilters { page_size: 10, ..Default::default() })
			.await
			.unwrap();

		let item = catalog
			.create_item(NewItemMeta::default(), ItemStatus::Auto)
			.await
			.unwrap();
		catalog.link_file(item.id, rows[0].id, true).await.unwrap();

		let summary = catalog.deletion_recommendations(2, 10).await.unwrap();
		assert_eq!(summary.total_items, 0);
	}
}

