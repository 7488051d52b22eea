//! Operation entity — a queued action (currently only `copy`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "operations")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	#[sea_orm(column_name = "type")]
	pub op_type: String,
	pub status: String,
	pub source_file_id: i32,
	pub dest_drive_id: i32,
	pub dest_path: String,
	pub total_size: i64,
	pub verify_hash: bool,
	pub progress: i64,
	pub error: Option<String>,
	pub created_at: DateTimeUtc,
	pub started_at: Option<DateTimeUtc>,
	pub completed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::file::Entity",
		from = "Column::SourceFileId",
		to = "super::file::Column::Id"
	)]
	SourceFile,
	#[sea_orm(
		belongs_to = "super::drive::Entity",
		from = "Column::DestDriveId",
		to = "super::drive::Column::Id"
	)]
	DestDrive,
}

impl Related<super::file::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::SourceFile.def()
	}
}

impl Related<super::drive::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::DestDrive.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
	Pending,
	Running,
	Paused,
	Completed,
	Failed,
	Cancelled,
}

impl OperationStatus {
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
	}
}

impl Model {
	pub fn op_status(&self) -> OperationStatus {
		self.status.parse().unwrap_or(OperationStatus::Pending)
	}
}
