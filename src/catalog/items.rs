//! MediaItem / MediaItemFile management: matching, merging, splitting, and
//! the orphan sweep that follows any cascading file deletion.

use super::entities::{
	media_item, media_item_file, File, MediaItem, MediaItemActive, MediaItemFile,
	MediaItemFileActive,
};
use super::Catalog;
use crate::error::{CoreError, CoreResult};
use chrono::Utc;
use sea_orm::{
	sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait,
	JoinType, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
};
use std::collections::HashSet;

/// Parsed metadata used to seed a newly created item.
#[derive(Debug, Clone, Default)]
pub struct NewItemMeta {
	pub item_type: media_item::MediaType,
	pub title: Option<String>,
	pub year: Option<i32>,
	pub season: Option<i32>,
	pub episode: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct ItemFilters {
	pub item_type: Option<media_item::MediaType>,
	pub status: Option<media_item::ItemStatus>,
	pub min_copies: Option<u64>,
	pub max_copies: Option<u64>,
	pub search: Option<String>,
	pub page: u64,
	pub page_size: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ItemStats {
	pub total_items: u64,
	pub singletons: u64,
	pub needs_verification: u64,
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
	pub target_id: i32,
	pub files_moved: u64,
	pub items_merged: u64,
}

#[derive(Debug, Clone)]
pub struct SplitOutcome {
	pub old_item_id: i32,
	pub new_item_id: i32,
	pub file_id: i32,
}

impl Catalog {
	/// Exact full-hash match across every file linked to an item.
	pub async fn find_item_by_full_hash(&self, full_hash: &str) -> CoreResult<Option<i32>> {
		let link = MediaItemFile::find()
			.join(JoinType::InnerJoin, media_item_file::Relation::File.def())
			.filter(super::entities::file::Column::FullHash.eq(full_hash))
			.one(self.conn())
			.await?;
		Ok(link.map(|m| m.media_item_id))
	}

	/// Quick-signature fallback match. Demotes the matched item to
	/// `needs_verification` since equal quick signatures don't guarantee
	/// byte-identical content.
	pub async fn find_item_by_quick_sig(&self, quick_sig: &str) -> CoreResult<Option<i32>> {
		let link = MediaItemFile::find()
			.join(JoinType::InnerJoin, media_item_file::Relation::File.def())
			.filter(super::entities::file::Column::QuickSig.eq(quick_sig))
			.one(self.conn())
			.await?;

		let Some(link) = link else {
			return Ok(None);
		};

		let item = self.get_item(link.media_item_id).await?;
		let mut active: MediaItemActive = item.into();
		active.status = Set(media_item::ItemStatus::NeedsVerification.to_string());
		active.update(self.conn()).await?;

		Ok(Some(link.media_item_id))
	}

	pub async fn file_is_linked(&self, file_id: i32) -> CoreResult<bool> {
		Ok(MediaItemFile::find()
			.filter(media_item_file::Column::FileId.eq(file_id))
			.one(self.conn())
			.await?
			.is_some())
	}

	pub async fn create_item(
		&self,
		meta: NewItemMeta,
		status: media_item::ItemStatus,
	) -> CoreResult<media_item::Model> {
		let active = MediaItemActive {
			item_type: Set(meta.item_type.to_string()),
			title: Set(meta.title),
			year: Set(meta.year),
			season: Set(meta.season),
			episode: Set(meta.episode),
			status: Set(status.to_string()),
			created_at: Set(Utc::now()),
			..Default::default()
		};
		Ok(active.insert(self.conn()).await?)
	}

	/// Link a file to an item. Idempotent on `(item_id, file_id)` — a second
	/// call with the same pair is a no-op, matching `INSERT OR IGNORE`.
	pub async fn link_file(
		&self,
		item_id: i32,
		file_id: i32,
		is_primary: bool,
	) -> CoreResult<()> {
		let existing = MediaItemFile::find()
			.filter(media_item_file::Column::FileId.eq(file_id))
			.one(self.conn())
			.await?;
		if existing.is_some() {
			return Ok(());
		}

		let active = MediaItemFileActive {
			media_item_id: Set(item_id),
			file_id: Set(file_id),
			is_primary: Set(is_primary),
			..Default::default()
		};
		active.insert(self.conn()).await?;
		Ok(())
	}

	pub async fn item_file_count(&self, item_id: i32) -> CoreResult<u64> {
		Ok(MediaItemFile::find()
			.filter(media_item_file::Column::MediaItemId.eq(item_id))
			.count(self.conn())
			.await?)
	}

	pub async fn get_item(&self, id: i32) -> CoreResult<media_item::Model> {
		MediaItem::find_by_id(id)
			.one(self.conn())
			.await?
			.ok_or_else(|| CoreError::not_found(format!("media item {id}")))
	}

	/// Move every file linked to `source_ids` onto `target_id`, delete the
	/// now-empty source items, and mark the target verified.
	pub async fn merge_items(
		&self,
		target_id: i32,
		source_ids: &[i32],
	) -> CoreResult<MergeOutcome> {
		self.get_item(target_id).await?;

		let mut files_moved = 0u64;
		let mut items_merged = 0u64;
		for &source_id in source_ids {
			if source_id == target_id {
				continue;
			}
			let result = MediaItemFile::update_many()
				.col_expr(media_item_file::Column::MediaItemId, Expr::value(target_id))
				.filter(media_item_file::Column::MediaItemId.eq(source_id))
				.exec(self.conn())
				.await?;
			files_moved += result.rows_affected;

			if let Some(source) = MediaItem::find_by_id(source_id).one(self.conn()).await? {
				source.delete(self.conn()).await?;
				items_merged += 1;
			}
		}

		let target = self.get_item(target_id).await?;
		let mut active: MediaItemActive = target.into();
		active.status = Set(media_item::ItemStatus::Verified.to_string());
		active.update(self.conn()).await?;

		Ok(MergeOutcome {
			target_id,
			files_moved,
			items_merged,
		})
	}

	/// Pull `file_id` out of its current item into a freshly created one.
	/// Refuses when the file is the only member of its item — there is
	/// nothing to split.
	pub async fn split_file(&self, file_id: i32, meta: NewItemMeta) -> CoreResult<SplitOutcome> {
		let link = MediaItemFile::find()
			.filter(media_item_file::Column::FileId.eq(file_id))
			.one(self.conn())
			.await?
			.ok_or_else(|| CoreError::invalid(format!("file {file_id} is not linked to an item")))?;

		let old_item_id = link.media_item_id;
		let count = self.item_file_count(old_item_id).await?;
		if count <= 1 {
			return Err(CoreError::invalid(
				"cannot split: file is alone in its item",
			));
		}

		let new_item = self
			.create_item(meta, media_item::ItemStatus::Verified)
			.await?;

		let mut active: MediaItemFileActive = link.into();
		active.media_item_id = Set(new_item.id);
		active.is_primary = Set(true);
		active.update(self.conn()).await?;

		Ok(SplitOutcome {
			old_item_id,
			new_item_id: new_item.id,
			file_id,
		})
	}

	/// Delete any media item with zero linked files. Called after any
	/// cascading delete of files/roots/drives, since `ON DELETE CASCADE`
	/// removes the link rows but never the item row itself.
	pub async fn delete_orphaned_media_items(&self) -> CoreResult<u64> {
		let linked_ids: HashSet<i32> = MediaItemFile::find()
			.select_only()
			.column(media_item_file::Column::MediaItemId)
			.into_tuple::<i32>()
			.all(self.conn())
			.await?
			.into_iter()
			.collect();

		let all_items = MediaItem::find().all(self.conn()).await?;
		let mut count = 0u64;
		for item in all_items {
			if !linked_ids.contains(&item.id) {
				item.delete(self.conn()).await?;
				count += 1;
			}
		}
		Ok(count)
	}

	pub async fn list_items(
		&self,
		filters: &ItemFilters,
	) -> CoreResult<(Vec<media_item::Model>, u64)> {
		let mut query = MediaItem::find();

		if let Some(item_type) = filters.item_type {
			query = query.filter(media_item::Column::ItemType.eq(item_type.to_string()));
		}
		if let Some(status) = filters.status {
			query = query.filter(media_item::Column::Status.eq(status.to_string()));
		}
		if let Some(needle) = &filters.search {
			query = query.filter(
				Condition::any()
					.add(media_item::Column::Title.contains(needle))
					.add(media_item::Column::ItemType.contains(needle)),
			);
		}

		let paginator = query
			.order_by_asc(media_item::Column::Id)
			.paginate(self.conn(), filters.page_size.max(1));
		let total = paginator.num_items().await?;
		let mut rows = paginator.fetch_page(filters.page).await?;

		if filters.min_copies.is_some() || filters.max_copies.is_some() {
			let mut kept = Vec::with_capacity(rows.len());
			for row in rows.drain(..) {
				let copies = self.item_file_count(row.id).await?;
				if filters.min_copies.is_some_and(|min| copies < min) {
					continue;
				}
				if filters.max_copies.is_some_and(|max| copies > max) {
					continue;
				}
				kept.push(row);
			}
			rows = kept;
		}

		Ok((rows, total))
	}

	pub async fn item_stats(&self) -> CoreResult<ItemStats> {
		let total_items = MediaItem::find().count(self.conn()).await?;
		let needs_verification = MediaItem::find()
			.filter(
				media_item::Column::Status
					.eq(media_item::ItemStatus::NeedsVerification.to_string()),
			)
			.count(self.conn())
			.await?;

		let all_items = MediaItem::find().all(self.conn()).await?;
		let mut singletons = 0u64;
		for item in all_items {
			if self.item_file_count(item.id).await? == 1 {
				singletons += 1;
			}
		}

		Ok(ItemStats {
			total_items,
			singletons,
			needs_verification,
		})
	}

	/// Files not yet linked to any media item, candidates for matching.
	pub async fn unlinked_files(&self) -> CoreResult<Vec<super::entities::file::Model>> {
		let linked_ids: HashSet<i32> = MediaItemFile::find()
			.select_only()
			.column(media_item_file::Column::FileId)
			.into_tuple::<i32>()
			.all(self.conn())
			.await?
			.into_iter()
			.collect();

		Ok(File::find()
			.all(self.conn())
			.await?
			.into_iter()
			.filter(|f| !linked_ids.contains(&f.id))
			.collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::Catalog;

	async fn setup_file(catalog: &Catalog, path: &str) -> i32 {
		let drive = catalog.register_drive(format!("drive:{path}"), None, None).await.unwrap();
		let root = catalog.add_root(drive.id, "/mnt/r", false).await.unwrap();
		catalog
			.upsert_scanned_file(root.id, path, 1, 1.0, Some("mkv".into()), Utc::now())
			.await
			.unwrap();
		let (rows, _) = catalog
			.list_files(&super::super::FileFilters { path_contains: Some(path.into()), page_size: 10, ..Default::default() })
			.await
			.unwrap();
		rows[0].id
	}

	#[tokio::test]
	async fn deleting_the_last_linked_file_leaves_no_orphan_item() {
		let catalog = Catalog::open_in_memory().await.unwrap();
		let file_id = setup_file(&catalog, "/mnt/a.mkv").await;
		let item = catalog
			.create_item(NewItemMeta::default(), media_item::ItemStatus::Auto)
			.await
			.unwrap();
		catalog.link_file(item.id, file_id, true).await.unwrap();

		MediaItemFile::delete_many()
			.filter(media_item_file::Column::FileId.eq(file_id))
			.exec(catalog.conn())
			.await
			.unwrap();

		let swept = catalog.delete_orphaned_media_items().await.unwrap();
		assert_eq!(swept, 1);
		assert!(catalog.get_item(item.id).await.is_err());
	}

	#[tokio::test]
	async fn linking_the_same_file_twice_is_idempotent() {
		let catalog = Catalog::open_in_memory().await.unwrap();
		let file_id = setup_file(&catalog, "/mnt/a.mkv").await;
		let item = catalog
			.create_item(NewItemMeta::default(), media_item::ItemStatus::Auto)
			.await
			.unwrap();

		catalog.link_file(item.id, file_id, true).await.unwrap();
		catalog.link_file(item.id, file_id, true).await.unwrap();

		assert_eq!(catalog.item_file_count(item.id).await.unwrap(), 1);
	}

	#[tokio::test]
	async fn split_refuses_when_file_is_the_sole_member() {
		let catalog = Catalog::open_in_memory().await.unwrap();
		let file_id = setup_file(&catalog, "/mnt/a.mkv").await;
		let item = catalog
			.create_item(NewItemMeta::default(), media_item::ItemStatus::Auto)
			.await
			.unwrap();
		catalog.link_file(item.id, file_id, true).await.unwrap();

		let err = catalog.split_file(file_id, NewItemMeta::default()).await;
		assert!(err.is_err());
	}

	#[tokio::test]
	async fn min_and_max_copies_filter_items_by_link_count() {
		let catalog = Catalog::open_in_memory().await.unwrap();
		let solo = setup_file(&catalog, "/mnt/solo.mkv").await;
		let solo_item = catalog
			.create_item(NewItemMeta::default(), media_item::ItemStatus::Auto)
			.await
			.unwrap();
		catalog.link_file(solo_item.id, solo, true).await.unwrap();

		let dup_a = setup_file(&catalog, "/mnt/dup_a.mkv").await;
		let dup_b = setup_file(&catalog, "/mnt/dup_b.mkv").await;
		let dup_item = catalog
			.create_item(NewItemMeta::default(), media_item::ItemStatus::Auto)
			.await
			.unwrap();
		catalog.link_file(dup_item.id, dup_a, true).await.unwrap();
		catalog.link_file(dup_item.id, dup_b, false).await.unwrap();

		let (at_risk, _) = catalog
			.list_items(&ItemFilters { max_copies: Some(1), page_size: 10, ..Default::default() })
			.await
			.unwrap();
		assert_eq!(at_risk.len(), 1);
		assert_eq!(at_risk[0].id, solo_item.id);

		let (duplicated, _) = catalog
			.list_items(&ItemFilters { min_copies: Some(2), page_size: 10, ..Default::default() })
			.await
			.unwrap();
		assert_eq!(duplicated.len(), 1);
		assert_eq!(duplicated[0].id, dup_item.id);
	}
}
