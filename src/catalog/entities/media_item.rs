//! MediaItem entity — the logical work (movie, episode, unknown).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "media_items")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	#[sea_orm(column_name = "type")]
	pub item_type: String,
	pub title: Option<String>,
	pub year: Option<i32>,
	pub season: Option<i32>,
	pub episode: Option<i32>,
	pub status: String,
	pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(has_many = "super::media_item_file::Entity")]
	MediaItemFiles,
}

impl Related<super::media_item_file::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::MediaItemFiles.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
	Movie,
	TvEpisode,
	#[default]
	Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
	Auto,
	NeedsVerification,
	Verified,
}

impl Model {
	pub fn media_type(&self) -> MediaType {
		self.item_type.parse().unwrap_or(MediaType::Unknown)
	}

	pub fn item_status(&self) -> ItemStatus {
		self.status.parse().unwrap_or(ItemStatus::Auto)
	}
}
