//! Drive registration and live disk metrics.

use super::entities::{Drive, DriveActive};
use super::Catalog;
use crate::error::{CoreError, CoreResult};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter};

/// Policy for `delete_drive`. Callers choose explicitly: `Forbid` so an
/// accidental delete can't silently orphan a library's worth of file rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionPolicy {
	/// Refuse to delete a drive that still has roots registered on it.
	Forbid,
	/// Delete the drive and let `ON DELETE CASCADE` remove its roots, files,
	/// and media item links; then sweep any media items left with no files.
	Cascade,
}

impl Catalog {
	pub async fn register_drive(
		&self,
		mount_path: impl Into<String>,
		volume_serial: Option<String>,
		volume_label: Option<String>,
	) -> CoreResult<drive::Model> {
		let mount_path = mount_path.into();
		if Drive::find()
			.filter(drive::Column::MountPath.eq(mount_path.clone()))
			.one(self.conn())
			.await?
			.is_some()
		{
			return Err(CoreError::conflict(format!(
				"drive already registered at {mount_path}"
			)));
		}

		let model = DriveActive {
			mount_path: Set(mount_path),
			volume_serial: Set(volume_serial),
			volume_label: Set(volume_label),
			created_at: Set(Utc::now()),
			..Default::default()
		};
		Ok(model.insert(self.conn()).await?)
	}

	pub async fn list_drives(&self) -> CoreResult<Vec<drive::Model>> {
		Ok(Drive::find().all(self.conn()).await?)
	}

	pub async fn get_drive(&self, id: i32) -> CoreResult<drive::Model> {
		Drive::find_by_id(id)
			.one(self.conn())
			.await?
			.ok_or_else(|| CoreError::not_found(format!("drive {id}")))
	}

	pub async fn delete_drive(&self, id: i32, policy: DeletionPolicy) -> CoreResult<()> {
		let drive = self.get_drive(id).await?;

		if policy == DeletionPolicy::Forbid {
			let root_count = super::entities::Root::find()
				.filter(super::entities::root::Column::DriveId.eq(id))
				.count(self.conn())
				.await?;
			if root_count > 0 {
				return Err(CoreError::conflict(format!(
					"drive {id} still has {root_count} root(s); use Cascade to force"
				)));
			}
		}

		drive.delete(self.conn()).await?;

		// Cascade removed the file/link rows via FK; sweep items left bare.
		self.delete_orphaned_media_items().await?;
		Ok(())
	}
}

use super::entities::drive;

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::Catalog;

	#[tokio::test]
	async fn registering_the_same_mount_path_twice_conflicts() {
		let catalog = Catalog::open_in_memory().await.unwrap();
		catalog.register_drive("/mnt/a", None, None).await.unwrap();
		let err = catalog.register_drive("/mnt/a", None, None).await;
		assert!(err.is_err());
	}

	#[tokio::test]
	async fn forbid_policy_refuses_deletion_while_roots_remain() {
		let catalog = Catalog::open_in_memory().await.unwrap();
		let drive = catalog.register_drive("/mnt/a", None, None).await.unwrap();
		catalog.add_root(drive.id, "/mnt/a/movies", false).await.unwrap();

		let err = catalog.delete_drive(drive.id, DeletionPolicy::Forbid).await;
		assert!(err.is_err());
	}

	#[tokio::test]
	async fn cascade_policy_removes_roots_and_orphaned_items() {
		let catalog = Catalog::open_in_memory().await.unwrap();
		let drive = catalog.register_drive("/mnt/a", None, None).await.unwrap();
		let root = catalog.add_root(drive.id, "/mnt/a/movies", false).await.unwrap();
		catalog
			.upsert_scanned_file(root.id, "/mnt/a/movies/x.mkv", 1, 1.0, Some("mkv".into()), chrono::Utc::now())
			.await
			.unwrap();

		catalog.delete_drive(drive.id, DeletionPolicy::Cascade).await.unwrap();
		assert!(catalog.get_drive(drive.id).await.is_err());
		assert!(catalog.list_roots(Some(drive.id)).await.unwrap().is_empty());
	}
}
