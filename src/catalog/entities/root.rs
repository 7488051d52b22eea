//! Root entity — an indexed subtree of a drive; the scanning unit.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "roots")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	pub drive_id: i32,
	pub path: String,
	pub excluded: bool,
	pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::drive::Entity",
		from = "Column::DriveId",
		to = "super::drive::Column::Id"
	)]
	Drive,
	#[sea_orm(has_many = "super::file::Entity")]
	Files,
}

impl Related<super::drive::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Drive.def()
	}
}

impl Related<super::file::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Files.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}
