//! Crate-wide error taxonomy shared by every layer of the core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
	/// Entity id absent. Maps to `404` at a future HTTP boundary.
	#[error("not found: {0}")]
	NotFound(String),

	/// Pre-existing entity or destination. Maps to `409`.
	#[error("conflict: {0}")]
	Conflict(String),

	/// Malformed input, bad state transition, or failed constraint. Maps to `400`.
	#[error("invalid: {0}")]
	Invalid(String),

	/// Transient I/O: permission denied, missing file, read/write error.
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),

	/// Size or hash mismatch during a verified copy.
	#[error("integrity check failed: {0}")]
	Integrity(String),

	/// Catalog-level failure.
	#[error("database error: {0}")]
	Database(#[from] sea_orm::DbErr),

	/// Anything else unexpected. Maps to `500`.
	#[error(transparent)]
	Internal(#[from] anyhow::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
	pub fn not_found(what: impl Into<String>) -> Self {
		Self::NotFound(what.into())
	}

	pub fn conflict(what: impl Into<String>) -> Self {
		Self::Conflict(what.into())
	}

	pub fn invalid(what: impl Into<String>) -> Self {
		Self::Invalid(what.into())
	}

	pub fn integrity(what: impl Into<String>) -> Self {
		Self::Integrity(what.into())
	}

	pub fn internal(what: impl Into<String>) -> Self {
		Self::Internal(anyhow::anyhow!(what.into()))
	}
}
