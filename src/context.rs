//! Top-level wiring: one `Context` owns the catalog and every long-running
//! component built on top of it. Construct once per process; clone the
//! `Arc`-wrapped components out to whatever frontend (CLI, future API)
//! drives them.

use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::error::CoreResult;
use crate::hasher::HashQueue;
use crate::matcher::Matcher;
use crate::picker::DestinationPicker;
use crate::queue::OperationsQueue;
use crate::scanner::Scanner;
use std::sync::Arc;

pub struct Context {
	pub config: AppConfig,
	pub catalog: Arc<Catalog>,
	pub scanner: Arc<Scanner>,
	pub hash_queue: Arc<HashQueue>,
	pub matcher: Arc<Matcher>,
	pub picker: Arc<DestinationPicker>,
	pub operations: Arc<OperationsQueue>,
}

impl Context {
	/// Open the catalog at `config.database_path()` and wire up every
	/// component against it. Does not start any background loop — callers
	/// decide when to kick off scanning/hashing/the copy queue.
	pub async fn new(config: AppConfig) -> CoreResult<Self> {
		config.ensure_directories()?;

		let catalog = Arc::new(Catalog::open(&config.database_path()).await?);
		let scanner = Arc::new(Scanner::new(Arc::clone(&catalog), config.logs_dir()));
		let hash_queue = Arc::new(HashQueue::new(Arc::clone(&catalog)));
		let matcher = Arc::new(Matcher::new(Arc::clone(&catalog)));
		let picker = Arc::new(DestinationPicker::new(Arc::clone(&catalog)));
		let operations = Arc::new(OperationsQueue::new(Arc::clone(&catalog)));
		operations.set_concurrency(config.default_copy_concurrency);

		Ok(Self {
			config,
			catalog,
			scanner,
			hash_queue,
			matcher,
			picker,
			operations,
		})
	}
}
