//! Versioned, on-disk JSON configuration for the core.

pub mod app_config;
pub mod migration;

pub use app_config::{default_data_dir, AppConfig, WriteMode};
pub use migration::Migrate;
