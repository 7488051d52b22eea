//! Copy-queue operation rows: creation, status transitions, progress.

use super::entities::{operation, Operation, OperationActive};
use super::Catalog;
use crate::error::{CoreError, CoreResult};
use chrono::Utc;
use sea_orm::{
	ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
	QueryOrder, QuerySelect,
};

#[derive(Debug, Clone, Default)]
pub struct OperationFilters {
	pub status: Option<operation::OperationStatus>,
	pub dest_drive_id: Option<i32>,
	pub page: u64,
	pub page_size: u64,
}

impl Catalog {
	pub async fn create_operation(
		&self,
		source_file_id: i32,
		dest_drive_id: i32,
		dest_path: impl Into<String>,
		total_size: i64,
		verify_hash: bool,
	) -> CoreResult<operation::Model> {
		self.get_file(source_file_id).await?;
		self.get_drive(dest_drive_id).await?;

		let active = OperationActive {
			op_type: Set("copy".to_string()),
			status: Set(operation::OperationStatus::Pending.to_string()),
			source_file_id: Set(source_file_id),
			dest_drive_id: Set(dest_drive_id),
			dest_path: Set(dest_path.into()),
			total_size: Set(total_size),
			verify_hash: Set(verify_hash),
			progress: Set(0),
			created_at: Set(Utc::now()),
			..Default::default()
		};
		Ok(active.insert(self.conn()).await?)
	}

	pub async fn get_operation(&self, id: i32) -> CoreResult<operation::Model> {
		Operation::find_by_id(id)
			.one(self.conn())
			.await?
			.ok_or_else(|| CoreError::not_found(format!("operation {id}")))
	}

	pub async fn list_operations(
		&self,
		filters: &OperationFilters,
	) -> CoreResult<(Vec<operation::Model>, u64)> {
		let mut query = Operation::find();
		if let Some(status) = filters.status {
			query = query.filter(operation::Column::Status.eq(status.to_string()));
		}
		if let Some(dest_drive_id) = filters.dest_drive_id {
			query = query.filter(operation::Column::DestDriveId.eq(dest_drive_id));
		}

		let paginator = query
			.order_by_asc(operation::Column::CreatedAt)
			.order_by_asc(operation::Column::Id)
			.paginate(self.conn(), filters.page_size.max(1));
		let total = paginator.num_items().await?;
		let rows = paginator.fetch_page(filters.page).await?;
		Ok((rows, total))
	}

	/// Oldest-first pending operations, the batch the queue worker pulls.
	pub async fn fetch_pending_operations(&self, limit: u64) -> CoreResult<Vec<operation::Model>> {
		Ok(Operation::find()
			.filter(operation::Column::Status.eq(operation::OperationStatus::Pending.to_string()))
			.order_by_asc(operation::Column::CreatedAt)
			.order_by_asc(operation::Column::Id)
			.limit(limit)
			.all(self.conn())
			.await?)
	}

	/// Transition an operation's status, stamping `started_at`/`completed_at`
	/// the way entering `running` or a terminal state implies.
	pub async fn set_operation_status(
		&self,
		id: i32,
		status: operation::OperationStatus,
		error: Option<String>,
	) -> CoreResult<operation::Model> {
		let op = self.get_operation(id).await?;
		let mut active: OperationActive = op.into();
		active.status = Set(status.to_string());
		if let Some(error) = error {
			active.error = Set(Some(error));
		}
		match status {
			operation::OperationStatus::Running => active.started_at = Set(Some(Utc::now())),
			s if s.is_terminal() => active.completed_at = Set(Some(Utc::now())),
			_ => {}
		}
		Ok(active.update(self.conn()).await?)
	}

	pub async fn set_operation_progress(&self, id: i32, progress: i64) -> CoreResult<()> {
		let op = self.get_operation(id).await?;
		let mut active: OperationActive = op.into();
		active.progress = Set(progress);
		active.update(self.conn()).await?;
		Ok(())
	}

	/// Pause a pending or running operation. Returns `false` if its current
	/// status doesn't allow pausing.
	pub async fn pause_operation(&self, id: i32) -> CoreResult<bool> {
		let op = self.get_operation(id).await?;
		if !matches!(
			op.op_status(),
			operation::OperationStatus::Pending | operation::OperationStatus::Running
		) {
			return Ok(false);
		}
		self.set_operation_status(id, operation::OperationStatus::Paused, None)
			.await?;
		Ok(true)
	}

	/// Resume a paused operation back to pending. Returns `false` if it
	/// wasn't paused.
	pub async fn resume_operation(&self, id: i32) -> CoreResult<bool> {
		let op = self.get_operation(id).await?;
		if op.op_status() != operation::OperationStatus::Paused {
			return Ok(false);
		}
		self.set_operation_status(id, operation::OperationStatus::Pending, None)
			.await?;
		Ok(true)
	}

	/// Cancel an operation in any non-terminal state. Returns `false` if it
	/// had already finished.
	pub async fn cancel_operation(&self, id: i32) -> CoreResult<bool> {
		let op = self.get_operation(id).await?;
		if op.op_status().is_terminal() {
			return Ok(false);
		}
		self.set_operation_status(id, operation::OperationStatus::Cancelled, None)
			.await?;
		Ok(true)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::Catalog;

	async fn setup_operation(catalog: &Catalog) -> i32 {
		let drive = catalog.register_drive("/mnt/a", None, None).await.unwrap();
		let root = catalog.add_root(drive.id, "/mnt/a/lib", false).await.unwrap();
		catalog
			.upsert_scanned_file(root.id, "/mnt/a/lib/a.mkv", 100, 1.0, Some("mkv".into()), Utc::now())
			.await
			.unwrap();
		let (rows, _) = catalog
			.list_files(&super::super::FileFilters { page_size: 10, ..Default::default() })
			.await
			.unwrap();
		let file_id = rows[0].id;
		let dest_drive = catalog.register_drive("/mnt/b", None, None).await.unwrap();
		catalog
			.create_operation(file_id, dest_drive.id, "/mnt/b/a.mkv", 100, true)
			.await
			.unwrap()
			.id
	}

	#[tokio::test]
	async fn a_terminal_operation_never_transitions_again() {
		let catalog = Catalog::open_in_memory().await.unwrap();
		let id = setup_operation(&catalog).await;

		catalog.set_operation_status(id, operation::OperationStatus::Completed, None).await.unwrap();
		assert!(!catalog.cancel_operation(id).await.unwrap());

		let op = catalog.get_operation(id).await.unwrap();
		assert_eq!(op.op_status(), operation::OperationStatus::Completed);
	}

	#[tokio::test]
	async fn pause_then_resume_returns_a_paused_operation_to_pending() {
		let catalog = Catalog::open_in_memory().await.unwrap();
		let id = setup_operation(&catalog).await;

		assert!(catalog.pause_operation(id).await.unwrap());
		assert_eq!(catalog.get_operation(id).await.unwrap().op_status(), operation::OperationStatus::Paused);

		assert!(catalog.resume_operation(id).await.unwrap());
		assert_eq!(catalog.get_operation(id).await.unwrap().op_status(), operation::OperationStatus::Pending);
	}

	#[tokio::test]
	async fn fetch_pending_operations_orders_by_created_at_ascending() {
		let catalog = Catalog::open_in_memory().await.unwrap();
		let first = setup_operation(&catalog).await;
		let second = setup_operation(&catalog).await;

		let pending = catalog.fetch_pending_operations(10).await.unwrap();
		assert_eq!(pending.len(), 2);
		assert_eq!(pending[0].id, first);
		assert_eq!(pending[1].id, second);
	}
}
