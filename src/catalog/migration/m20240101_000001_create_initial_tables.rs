//! Create the initial catalog schema: drives, roots, files, media items,
//! media item/file links, user rules, and operations.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
	async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager
			.create_table(
				Table::create()
					.table(Drives::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(Drives::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(
						ColumnDef::new(Drives::MountPath)
							.text()
							.not_null()
							.unique_key(),
					)
					.col(ColumnDef::new(Drives::VolumeSerial).text())
					.col(ColumnDef::new(Drives::VolumeLabel).text())
					.col(ColumnDef::new(Drives::CreatedAt).timestamp().not_null())
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(Roots::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(Roots::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(Roots::DriveId).integer().not_null())
					.col(ColumnDef::new(Roots::Path).text().not_null())
					.col(
						ColumnDef::new(Roots::Excluded)
							.boolean()
							.not_null()
							.default(false),
					)
					.col(ColumnDef::new(Roots::CreatedAt).timestamp().not_null())
					.foreign_key(
						ForeignKey::create()
							.name("fk_roots_drive_id")
							.from(Roots::Table, Roots::DriveId)
							.to(Drives::Table, Drives::Id)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_roots_drive_path_unique")
					.table(Roots::Table)
					.col(Roots::DriveId)
					.col(Roots::Path)
					.unique()
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(Files::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(Files::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(Files::RootId).integer().not_null())
					.col(ColumnDef::new(Files::Path).text().not_null())
					.col(ColumnDef::new(Files::Size).big_integer().not_null())
					.col(ColumnDef::new(Files::Mtime).double().not_null())
					.col(ColumnDef::new(Files::Ext).text())
					.col(ColumnDef::new(Files::LastSeen).timestamp())
					.col(ColumnDef::new(Files::QuickSig).text())
					.col(ColumnDef::new(Files::FullHash).text())
					.col(
						ColumnDef::new(Files::HashStatus)
							.text()
							.not_null()
							.default("pending"),
					)
					.foreign_key(
						ForeignKey::create()
							.name("fk_files_root_id")
							.from(Files::Table, Files::RootId)
							.to(Roots::Table, Roots::Id)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_files_root_path_unique")
					.table(Files::Table)
					.col(Files::RootId)
					.col(Files::Path)
					.unique()
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_files_full_hash")
					.table(Files::Table)
					.col(Files::FullHash)
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_files_quick_sig")
					.table(Files::Table)
					.col(Files::QuickSig)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(MediaItems::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(MediaItems::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(MediaItems::Type).text().not_null())
					.col(ColumnDef::new(MediaItems::Title).text())
					.col(ColumnDef::new(MediaItems::Year).integer())
					.col(ColumnDef::new(MediaItems::Season).integer())
					.col(ColumnDef::new(MediaItems::Episode).integer())
					.col(
						ColumnDef::new(MediaItems::Status)
							.text()
							.not_null()
							.default("auto"),
					)
					.col(ColumnDef::new(MediaItems::CreatedAt).timestamp().not_null())
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(MediaItemFiles::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(MediaItemFiles::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(
						ColumnDef::new(MediaItemFiles::MediaItemId)
							.integer()
							.not_null(),
					)
					.col(
						ColumnDef::new(MediaItemFiles::FileId)
							.integer()
							.not_null()
							.unique_key(),
					)
					.col(
						ColumnDef::new(MediaItemFiles::IsPrimary)
							.boolean()
							.not_null()
							.default(false),
					)
					.foreign_key(
						ForeignKey::create()
							.name("fk_mif_media_item_id")
							.from(MediaItemFiles::Table, MediaItemFiles::MediaItemId)
							.to(MediaItems::Table, MediaItems::Id)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.foreign_key(
						ForeignKey::create()
							.name("fk_mif_file_id")
							.from(MediaItemFiles::Table, MediaItemFiles::FileId)
							.to(Files::Table, Files::Id)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(UserRules::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(UserRules::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(UserRules::RuleType).text().not_null())
					.col(ColumnDef::new(UserRules::DriveId).integer().not_null())
					.col(
						ColumnDef::new(UserRules::Priority)
							.integer()
							.not_null()
							.default(0),
					)
					.foreign_key(
						ForeignKey::create()
							.name("fk_user_rules_drive_id")
							.from(UserRules::Table, UserRules::DriveId)
							.to(Drives::Table, Drives::Id)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(Operations::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(Operations::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(Operations::Type).text().not_null())
					.col(
						ColumnDef::new(Operations::Status)
							.text()
							.not_null()
							.default("pending"),
					)
					.col(
						ColumnDef::new(Operations::SourceFileId)
							.integer()
							.not_null(),
					)
					.col(
						ColumnDef::new(Operations::DestDriveId)
							.integer()
							.not_null(),
					)
					.col(ColumnDef::new(Operations::DestPath).text().not_null())
					.col(ColumnDef::new(Operations::TotalSize).big_integer().not_null())
					.col(
						ColumnDef::new(Operations::VerifyHash)
							.boolean()
							.not_null()
							.default(true),
					)
					.col(
						ColumnDef::new(Operations::Progress)
							.big_integer()
							.not_null()
							.default(0),
					)
					.col(ColumnDef::new(Operations::Error).text())
					.col(ColumnDef::new(Operations::CreatedAt).timestamp().not_null())
					.col(ColumnDef::new(Operations::StartedAt).timestamp())
					.col(ColumnDef::new(Operations::CompletedAt).timestamp())
					.foreign_key(
						ForeignKey::create()
							.name("fk_operations_source_file_id")
							.from(Operations::Table, Operations::SourceFileId)
							.to(Files::Table, Files::Id)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.foreign_key(
						ForeignKey::create()
							.name("fk_operations_dest_drive_id")
							.from(Operations::Table, Operations::DestDriveId)
							.to(Drives::Table, Drives::Id)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_operations_status_created_at")
					.table(Operations::Table)
					.col(Operations::Status)
					.col(Operations::CreatedAt)
					.to_owned(),
			)
			.await?;

		Ok(())
	}

	async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager
			.drop_table(Table::drop().table(Operations::Table).to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(UserRules::Table).to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(MediaItemFiles::Table).to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(MediaItems::Table).to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(Files::Table).to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(Roots::Table).to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(Drives::Table).to_owned())
			.await?;
		Ok(())
	}
}

#[derive(DeriveIden)]
enum Drives {
	Table,
	Id,
	MountPath,
	VolumeSerial,
	VolumeLabel,
	CreatedAt,
}

#[derive(DeriveIden)]
enum Roots {
	Table,
	Id,
	DriveId,
	Path,
	Excluded,
	CreatedAt,
}

#[derive(DeriveIden)]
enum Files {
	Table,
	Id,
	RootId,
	Path,
	Size,
	Mtime,
	Ext,
	LastSeen,
	QuickSig,
	FullHash,
	HashStatus,
}

#[derive(DeriveIden)]
enum MediaItems {
	Table,
	Id,
	Type,
	Title,
	Year,
	Season,
	Episode,
	Status,
	CreatedAt,
}

#[derive(DeriveIden)]
enum MediaItemFiles {
	Table,
	Id,
	MediaItemId,
	FileId,
	IsPrimary,
}

#[derive(DeriveIden)]
enum UserRules {
	Table,
	Id,
	RuleType,
	DriveId,
	Priority,
}

#[derive(DeriveIden)]
enum Operations {
	Table,
	Id,
	Type,
	Status,
	SourceFileId,
	DestDriveId,
	DestPath,
	TotalSize,
	VerifyHash,
	Progress,
	Error,
	CreatedAt,
	StartedAt,
	CompletedAt,
}
