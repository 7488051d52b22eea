//! UserRule entity — destination-picker policy row.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_rules")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	pub rule_type: String,
	pub drive_id: i32,
	pub priority: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::drive::Entity",
		from = "Column::DriveId",
		to = "super::drive::Column::Id"
	)]
	Drive,
}

impl Related<super::drive::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Drive.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
	Denylist,
	PreferMovie,
	PreferTv,
	PreferAll,
}

impl Model {
	pub fn rule_type(&self) -> Option<RuleType> {
		self.rule_type.parse().ok()
	}
}
