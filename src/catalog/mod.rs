//! The Catalog: the relational store that is the source of truth for
//! drives, roots, files, items, rules, operations.
//!
//! Writers serialize through SQLite's own locking; readers run concurrently
//! against the same connection pool. Multi-statement state transitions run
//! inside one transaction via [`Catalog::transaction`], so a failure rolls
//! back rather than leaving the graph half-linked.

pub mod entities;
pub mod migration;

mod drives;
mod files;
mod items;
mod operations;
mod recommendations;
mod roots;
mod rules;

pub use drives::DeletionPolicy;
pub use files::{DirScanStats, FileFilters, FileStats, ScannedEntry, UpsertOutcome};
pub use items::{ItemFilters, ItemStats, MergeOutcome, NewItemMeta, SplitOutcome};
pub use operations::OperationFilters;
pub use recommendations::{DeletionRecommendation, DeletionRecommendationSummary, RecommendedFile};

use crate::error::{CoreError, CoreResult};
use sea_orm::{ConnectOptions, ConnectionTrait, Database as SeaDatabase, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Thin wrapper around the SeaORM connection pool, following
/// `core-new/src/infrastructure/database/mod.rs`'s shape.
pub struct Catalog {
	conn: DatabaseConnection,
}

impl Catalog {
	/// Open (creating if necessary) the catalog at `path` and apply migrations.
	pub async fn open(path: &Path) -> CoreResult<Self> {
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent).map_err(CoreError::Io)?;
		}

		let db_url = format!("sqlite://{}?mode=rwc", path.display());
		let mut opt = ConnectOptions::new(db_url);
		opt.max_connections(10)
			.min_connections(1)
			.connect_timeout(Duration::from_secs(8))
			.idle_timeout(Duration::from_secs(8))
			.sqlx_logging(false);

		let conn = SeaDatabase::connect(opt).await?;
		apply_pragmas(&conn).await;

		migration::Migrator::up(&conn, None).await?;
		info!(path = %path.display(), "catalog ready");

		Ok(Self { conn })
	}

	/// Open an in-memory catalog, for tests.
	pub async fn open_in_memory() -> CoreResult<Self> {
		let conn = SeaDatabase::connect("sqlite::memory:").await?;
		migration::Migrator::up(&conn, None).await?;
		Ok(Self { conn })
	}

	pub fn conn(&self) -> &DatabaseConnection {
		&self.conn
	}
}

async fn apply_pragmas(conn: &DatabaseConnection) {
	for pragma in [
		"PRAGMA journal_mode=WAL",
		"PRAGMA synchronous=NORMAL",
		"PRAGMA foreign_keys=ON",
		"PRAGMA busy_timeout=5000",
	] {
		let _ = conn
			.execute(Statement::from_string(
				sea_orm::DatabaseBackend::Sqlite,
				pragma,
			))
			.await;
	}
}
