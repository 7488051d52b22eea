//! Root (indexed subtree) management.

use super::entities::{root, Root, RootActive};
use super::Catalog;
use crate::error::{CoreError, CoreResult};
use chrono::Utc;
use sea_orm::{
	ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, ModelTrait, QueryFilter,
};

impl Catalog {
	pub async fn add_root(
		&self,
		drive_id: i32,
		path: impl Into<String>,
		excluded: bool,
	) -> CoreResult<root::Model> {
		self.get_drive(drive_id).await?;
		let path = path.into();

		if Root::find()
			.filter(root::Column::DriveId.eq(drive_id))
			.filter(root::Column::Path.eq(path.clone()))
			.one(self.conn())
			.await?
			.is_some()
		{
			return Err(CoreError::conflict(format!(
				"root {path} already indexed on drive {drive_id}"
			)));
		}

		let model = RootActive {
			drive_id: Set(drive_id),
			path: Set(path),
			excluded: Set(excluded),
			created_at: Set(Utc::now()),
			..Default::default()
		};
		Ok(model.insert(self.conn()).await?)
	}

	pub async fn list_roots(&self, drive_id: Option<i32>) -> CoreResult<Vec<root::Model>> {
		let mut query = Root::find();
		if let Some(drive_id) = drive_id {
			query = query.filter(root::Column::DriveId.eq(drive_id));
		}
		Ok(query.all(self.conn()).await?)
	}

	/// Non-excluded roots, the set the scanner walks. Restricted to a single
	/// drive when `drive_id` is given.
	pub async fn scannable_roots(&self, drive_id: Option<i32>) -> CoreResult<Vec<root::Model>> {
		let mut query = Root::find().filter(root::Column::Excluded.eq(false));
		if let Some(drive_id) = drive_id {
			query = query.filter(root::Column::DriveId.eq(drive_id));
		}
		Ok(query.all(self.conn()).await?)
	}

	pub async fn get_root(&self, id: i32) -> CoreResult<root::Model> {
		Root::find_by_id(id)
			.one(self.conn())
			.await?
			.ok_or_else(|| CoreError::not_found(format!("root {id}")))
	}

	pub async fn set_root_excluded(&self, id: i32, excluded: bool) -> CoreResult<root::Model> {
		let root = self.get_root(id).await?;
		let mut active: RootActive = root.into();
		active.excluded = Set(excluded);
		Ok(active.update(self.conn()).await?)
	}

	pub async fn delete_root(&self, id: i32) -> CoreResult<()> {
		let root = self.get_root(id).await?;
		root.delete(self.conn()).await?;
		self.delete_orphaned_media_items().await?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::Catalog;

	#[tokio::test]
	async fn root_path_is_unique_per_drive() {
		let catalog = Catalog::open_in_memory().await.unwrap();
		let drive = catalog.register_drive("/mnt/a", None, None).await.unwrap();
		catalog.add_root(drive.id, "/mnt/a/movies", false).await.unwrap();

		let err = catalog.add_root(drive.id, "/mnt/a/movies", false).await;
		assert!(err.is_err());
	}

	#[tokio::test]
	async fn excluded_roots_are_skipped_by_scannable_roots() {
		let catalog = Catalog::open_in_memory().await.unwrap();
		let drive = catalog.register_drive("/mnt/a", None, None).await.unwrap();
		catalog.add_root(drive.id, "/mnt/a/movies", false).await.unwrap();
		let excluded = catalog.add_root(drive.id, "/mnt/a/skip", true).await.unwrap();

		let scannable = catalog.scannable_roots(Some(drive.id)).await.unwrap();
		assert_eq!(scannable.len(), 1);
		assert_ne!(scannable[0].id, excluded.id);
	}

	#[tokio::test]
	async fn adding_a_root_to_a_missing_drive_is_not_found() {
		let catalog = Catalog::open_in_memory().await.unwrap();
		let err = catalog.add_root(999, "/mnt/ghost", false).await;
		assert!(err.is_err());
	}
}
