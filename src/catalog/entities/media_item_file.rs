//! MediaItemFile entity — the link between exactly one item and one file.
//!
//! Invariant: a File may be linked to at most one item — enforced by a
//! unique index on `file_id` (see the initial-tables migration), not just by
//! application logic, so a racing insert can't violate it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "media_item_files")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	pub media_item_id: i32,
	#[sea_orm(unique)]
	pub file_id: i32,
	pub is_primary: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::media_item::Entity",
		from = "Column::MediaItemId",
		to = "super::media_item::Column::Id"
	)]
	MediaItem,
	#[sea_orm(
		belongs_to = "super::file::Entity",
		from = "Column::FileId",
		to = "super::file::Column::Id"
	)]
	File,
}

impl Related<super::media_item::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::MediaItem.def()
	}
}

impl Related<super::file::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::File.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}
