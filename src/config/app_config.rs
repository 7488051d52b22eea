//! Application configuration: JSON on disk, versioned, migrated on load.

use crate::config::migration::Migrate;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// How the copy queue treats verification failures and pre-existing
/// destinations. Read by `OperationsQueue`; not yet exposed for per-drive
/// override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
	/// Refuse to overwrite an existing destination file.
	Safe,
	/// Overwrite an existing destination file if present.
	Force,
}

impl Default for WriteMode {
	fn default() -> Self {
		WriteMode::Safe
	}
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
	/// Config schema version.
	pub version: u32,

	/// Data directory path: database file, scan logs, and this config live here.
	pub data_dir: PathBuf,

	/// Logging level passed to `tracing_subscriber::EnvFilter`.
	pub log_level: String,

	/// Whether the copy queue may overwrite existing destination files.
	pub write_mode: WriteMode,

	/// Bind address for an external API surface, if one is hosted.
	pub api_host: String,

	/// Bind port for an external API surface, if one is hosted.
	pub api_port: u16,

	/// Default worker concurrency for the copy queue.
	pub default_copy_concurrency: usize,

	/// Directory name used for quarantined files under a drive's mount path.
	pub quarantine_dirname: String,
}

impl AppConfig {
	pub fn load() -> Result<Self> {
		let data_dir = default_data_dir()?;
		Self::load_from(&data_dir)
	}

	pub fn load_from(data_dir: &PathBuf) -> Result<Self> {
		let config_path = data_dir.join("milestone.json");

		if config_path.exists() {
			info!("loading config from {:?}", config_path);
			let json = fs::read_to_string(&config_path)?;
			let mut config: AppConfig = serde_json::from_str(&json)?;

			if config.version < Self::target_version() {
				info!(
					"migrating config from v{} to v{}",
					config.version,
					Self::target_version()
				);
				config.migrate()?;
				config.save()?;
			}

			Ok(config)
		} else {
			warn!("no config found, creating default at {:?}", config_path);
			let config = Self::default_with_dir(data_dir.clone());
			config.save()?;
			Ok(config)
		}
	}

	pub fn load_or_create(data_dir: &PathBuf) -> Result<Self> {
		Self::load_from(data_dir).or_else(|_| {
			let config = Self::default_with_dir(data_dir.clone());
			config.save()?;
			Ok(config)
		})
	}

	pub fn default_with_dir(data_dir: PathBuf) -> Self {
		Self {
			version: Self::target_version(),
			data_dir,
			log_level: "info".to_string(),
			write_mode: WriteMode::default(),
			api_host: "127.0.0.1".to_string(),
			api_port: 8000,
			default_copy_concurrency: 2,
			quarantine_dirname: ".quarantine".to_string(),
		}
	}

	pub fn save(&self) -> Result<()> {
		fs::create_dir_all(&self.data_dir)?;

		let config_path = self.data_dir.join("milestone.json");
		let json = serde_json::to_string_pretty(self)?;
		fs::write(&config_path, json)?;
		info!("saved config to {:?}", config_path);
		Ok(())
	}

	pub fn logs_dir(&self) -> PathBuf {
		self.data_dir.join("logs")
	}

	pub fn database_path(&self) -> PathBuf {
		self.data_dir.join("milestone.db")
	}

	pub fn ensure_directories(&self) -> Result<()> {
		fs::create_dir_all(&self.data_dir)?;
		fs::create_dir_all(self.logs_dir())?;
		Ok(())
	}
}

impl Default for AppConfig {
	fn default() -> Self {
		let data_dir = default_data_dir().unwrap_or_else(|_| PathBuf::from("."));
		Self::default_with_dir(data_dir)
	}
}

impl Migrate for AppConfig {
	fn current_version(&self) -> u32 {
		self.version
	}

	fn target_version() -> u32 {
		1
	}

	fn migrate(&mut self) -> Result<()> {
		match self.version {
			0 => {
				self.version = 1;
				Ok(())
			}
			1 => Ok(()),
			v => Err(anyhow!("unknown config version: {v}")),
		}
	}
}

/// Default data directory: `$XDG_DATA_HOME/milestone` (or platform
/// equivalent via `dirs`).
pub fn default_data_dir() -> Result<PathBuf> {
	dirs::data_dir()
		.map(|d| d.join("milestone"))
		.ok_or_else(|| anyhow!("could not determine platform data directory"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_with_dir_has_sane_defaults() {
		let config = AppConfig::default_with_dir(PathBuf::from("/tmp/milestone-test"));
		assert_eq!(config.write_mode, WriteMode::Safe);
		assert_eq!(config.quarantine_dirname, ".quarantine");
		assert_eq!(config.default_copy_concurrency, 2);
	}

	#[test]
	fn save_and_load_roundtrips() {
		let dir = tempfile::tempdir().unwrap();
		let data_dir = dir.path().join("data");
		let config = AppConfig::default_with_dir(data_dir.clone());
		config.save().unwrap();

		let loaded = AppConfig::load_from(&data_dir).unwrap();
		assert_eq!(loaded.version, config.version);
		assert_eq!(loaded.quarantine_dirname, config.quarantine_dirname);
	}
}
