//! Drive entity — a registered storage volume.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "drives")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	#[sea_orm(unique)]
	pub mount_path: String,
	pub volume_serial: Option<String>,
	pub volume_label: Option<String>,
	pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(has_many = "super::root::Entity")]
	Roots,
	#[sea_orm(has_many = "super::user_rule::Entity")]
	UserRules,
}

impl Related<super::root::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Roots.def()
	}
}

impl Related<super::user_rule::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::UserRules.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}
