//! File entity — one on-disk file instance, uniquely identified by `(root_id, path)`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "files")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	pub root_id: i32,
	pub path: String,
	/// Size in bytes at last scan.
	pub size: i64,
	/// Modification time, seconds since epoch. Kept as a float (not truncated
	/// to whole seconds) so "mtime unchanged" comparisons match the filesystem
	/// exactly.
	pub mtime: f64,
	pub ext: Option<String>,
	/// Timestamp of the most recent scan that observed this file; `None` means
	/// the file is currently missing (but not deleted from the catalog).
	pub last_seen: Option<DateTimeUtc>,
	pub quick_sig: Option<String>,
	pub full_hash: Option<String>,
	pub hash_status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::root::Entity",
		from = "Column::RootId",
		to = "super::root::Column::Id"
	)]
	Root,
	#[sea_orm(has_many = "super::media_item_file::Entity")]
	MediaItemFiles,
	#[sea_orm(has_many = "super::operation::Entity")]
	Operations,
}

impl Related<super::root::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Root.def()
	}
}

impl Related<super::media_item_file::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::MediaItemFiles.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

/// Hashing lifecycle for a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HashStatus {
	Pending,
	Computing,
	Complete,
	Error,
	Quarantined,
}

impl Model {
	pub fn hash_status(&self) -> HashStatus {
		self.hash_status.parse().unwrap_or(HashStatus::Pending)
	}

	pub fn is_missing(&self) -> bool {
		self.last_seen.is_none()
	}
}
