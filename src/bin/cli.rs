//! `milestone` — command-line frontend over the core. Every subcommand opens
//! the catalog at the configured data directory, performs one action, and
//! exits; the long-running scan/hash/copy loops are started in the
//! foreground and run until their job finishes or the process is killed.

use clap::{Parser, Subcommand};
use comfy_table::Table;
use milestone_core::catalog::entities::{operation, user_rule};
use milestone_core::catalog::{DeletionPolicy, FileFilters, ItemFilters, OperationFilters};
use milestone_core::config::AppConfig;
use milestone_core::context::Context;
use milestone_core::scanner::ThrottleLevel;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser)]
#[command(name = "milestone")]
#[command(about = "Local media-library inventory and redundancy manager", long_about = None)]
struct Cli {
	/// Data directory holding the catalog, config, and scan logs.
	#[arg(long, global = true)]
	data_dir: Option<PathBuf>,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Manage registered drives
	#[command(subcommand)]
	Drive(DriveCommands),

	/// Manage indexed roots
	#[command(subcommand)]
	Root(RootCommands),

	/// Manage destination-picker rules
	#[command(subcommand)]
	Rule(RuleCommands),

	/// Filesystem scan
	#[command(subcommand)]
	Scan(ScanCommands),

	/// Background hashing
	#[command(subcommand)]
	Hash(HashCommands),

	/// Group unlinked files into media items
	Match,

	/// Inspect and edit media items
	#[command(subcommand)]
	Item(ItemCommands),

	/// Browse catalog files
	Files {
		#[arg(long)]
		missing: bool,
		#[arg(long)]
		page: Option<u64>,
	},

	/// Copy-queue operations
	#[command(subcommand)]
	Ops(OpsCommands),

	/// Deletion recommendations and quarantine
	#[command(subcommand)]
	Cleanup(CleanupCommands),
}

#[derive(Subcommand)]
enum DriveCommands {
	Register {
		mount_path: String,
		#[arg(long)]
		label: Option<String>,
	},
	List,
	Remove {
		drive_id: i32,
		/// Also remove roots, files, and media item links on this drive.
		#[arg(long)]
		cascade: bool,
	},
}

#[derive(Subcommand)]
enum RootCommands {
	Add {
		drive_id: i32,
		path: String,
		#[arg(long)]
		excluded: bool,
	},
	List {
		#[arg(long)]
		drive_id: Option<i32>,
	},
}

#[derive(Subcommand)]
enum RuleCommands {
	Add {
		drive_id: i32,
		#[arg(value_enum)]
		rule_type: CliRuleType,
		#[arg(long, default_value_t = 0)]
		priority: i32,
	},
	List,
}

#[derive(Clone, clap::ValueEnum)]
enum CliRuleType {
	Denylist,
	PreferMovie,
	PreferTv,
	PreferAll,
}

impl From<CliRuleType> for user_rule::RuleType {
	fn from(value: CliRuleType) -> Self {
		match value {
			CliRuleType::Denylist => user_rule::RuleType::Denylist,
			CliRuleType::PreferMovie => user_rule::RuleType::PreferMovie,
			CliRuleType::PreferTv => user_rule::RuleType::PreferTv,
			CliRuleType::PreferAll => user_rule::RuleType::PreferAll,
		}
	}
}

#[derive(Subcommand)]
enum ScanCommands {
	Start {
		#[arg(long)]
		drive_id: Option<i32>,
		#[arg(long, default_value = "normal")]
		throttle: String,
	},
	Status,
	Pause,
	Resume,
	Cancel,
}

#[derive(Subcommand)]
enum HashCommands {
	Start,
	Status,
	Stop,
}

#[derive(Subcommand)]
enum ItemCommands {
	List {
		#[arg(long)]
		min_copies: Option<u64>,
		#[arg(long)]
		search: Option<String>,
	},
	Stats,
	Merge {
		target_id: i32,
		source_ids: Vec<i32>,
	},
	Split {
		file_id: i32,
	},
}

#[derive(Subcommand)]
enum OpsCommands {
	Create {
		source_file_id: i32,
		#[arg(long)]
		dest_drive_id: Option<i32>,
		#[arg(long)]
		dest_path: Option<String>,
	},
	List {
		#[arg(long)]
		status: Option<String>,
	},
	Start,
	Pause {
		id: i32,
	},
	Resume {
		id: i32,
	},
	Cancel {
		id: i32,
	},
}

#[derive(Subcommand)]
enum CleanupCommands {
	Recommend {
		#[arg(long, default_value_t = 3)]
		min_copies: u64,
		#[arg(long, default_value_t = 100)]
		limit: u64,
	},
	Quarantine {
		file_ids: Vec<i32>,
	},
	Restore {
		file_ids: Vec<i32>,
	},
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	let data_dir = cli
		.data_dir
		.clone()
		.unwrap_or_else(|| milestone_core::config::default_data_dir().unwrap_or_else(|_| PathBuf::from(".")));
	let config = AppConfig::load_or_create(&data_dir)?;

	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
	tracing_subscriber::fmt().with_env_filter(env_filter).init();

	let ctx = Context::new(config).await?;

	match cli.command {
		Commands::Drive(cmd) => run_drive(&ctx, cmd).await?,
		Commands::Root(cmd) => run_root(&ctx, cmd).await?,
		Commands::Rule(cmd) => run_rule(&ctx, cmd).await?,
		Commands::Scan(cmd) => run_scan(&ctx, cmd).await?,
		Commands::Hash(cmd) => run_hash(&ctx, cmd).await?,
		Commands::Match => run_match(&ctx).await?,
		Commands::Item(cmd) => run_item(&ctx, cmd).await?,
		Commands::Files { missing, page } => run_files(&ctx, missing, page).await?,
		Commands::Ops(cmd) => run_ops(&ctx, cmd).await?,
		Commands::Cleanup(cmd) => run_cleanup(&ctx, cmd).await?,
	}

	Ok(())
}

async fn run_drive(ctx: &Context, cmd: DriveCommands) -> anyhow::Result<()> {
	match cmd {
		DriveCommands::Register { mount_path, label } => {
			let drive = ctx.catalog.register_drive(mount_path, None, label).await?;
			println!("{} registered drive #{}", "✓".green(), drive.id);
		}
		DriveCommands::List => {
			let drives = ctx.catalog.list_drives().await?;
			let mut table = Table::new();
			table.set_header(vec!["ID", "Mount Path", "Label"]);
			for drive in drives {
				table.add_row(vec![
					drive.id.to_string(),
					drive.mount_path,
					drive.volume_label.unwrap_or_default(),
				]);
			}
			println!("{table}");
		}
		DriveCommands::Remove { drive_id, cascade } => {
			let policy = if cascade {
				DeletionPolicy::Cascade
			} else {
				DeletionPolicy::Forbid
			};
			ctx.catalog.delete_drive(drive_id, policy).await?;
			println!("{} removed drive #{drive_id}", "✓".green());
		}
	}
	Ok(())
}

async fn run_root(ctx: &Context, cmd: RootCommands) -> anyhow::Result<()> {
	match cmd {
		RootCommands::Add {
			drive_id,
			path,
			excluded,
		} => {
			let root = ctx.catalog.add_root(drive_id, path, excluded).await?;
			println!("{} added root #{}", "✓".green(), root.id);
		}
		RootCommands::List { drive_id } => {
			let roots = ctx.catalog.list_roots(drive_id).await?;
			let mut table = Table::new();
			table.set_header(vec!["ID", "Drive", "Path", "Excluded"]);
			for root in roots {
				table.add_row(vec![
					root.id.to_string(),
					root.drive_id.to_string(),
					root.path,
					root.excluded.to_string(),
				]);
			}
			println!("{table}");
		}
	}
	Ok(())
}

async fn run_rule(ctx: &Context, cmd: RuleCommands) -> anyhow::Result<()> {
	match cmd {
		RuleCommands::Add {
			drive_id,
			rule_type,
			priority,
		} => {
			let rule = ctx
				.catalog
				.add_rule(rule_type.into(), drive_id, priority)
				.await?;
			println!("{} added rule #{}", "✓".green(), rule.id);
		}
		RuleCommands::List => {
			let rules = ctx.catalog.list_rules(None).await?;
			let mut table = Table::new();
			table.set_header(vec!["ID", "Drive", "Type", "Priority"]);
			for rule in rules {
				table.add_row(vec![
					rule.id.to_string(),
					rule.drive_id.to_string(),
					rule.rule_type,
					rule.priority.to_string(),
				]);
			}
			println!("{table}");
		}
	}
	Ok(())
}

async fn run_scan(ctx: &Context, cmd: ScanCommands) -> anyhow::Result<()> {
	match cmd {
		ScanCommands::Start { drive_id, throttle } => {
			let throttle = match throttle.to_lowercase().as_str() {
				"low" => ThrottleLevel::Low,
				"fast" => ThrottleLevel::Fast,
				_ => ThrottleLevel::Normal,
			};
			if ctx.scanner.start(drive_id, throttle) {
				println!("{} scan started", "✓".green());
			} else {
				println!("{} a scan is already running", "✗".red());
			}
		}
		ScanCommands::Status => {
			let status = ctx.scanner.status().await;
			println!("state:          {:?}", status.state);
			println!("current root:   {}", status.current_root.as_deref().unwrap_or("-"));
			println!("files scanned:  {}", status.files_scanned);
			println!("files new:      {}", status.files_new);
			println!("files updated:  {}", status.files_updated);
			println!("files missing:  {}", status.files_missing);
			if let Some(path) = &status.jsonl_log_path {
				println!("event log:      {}", path.display());
			}
			if let Some(path) = &status.text_log_path {
				println!("text log:       {}", path.display());
			}
		}
		ScanCommands::Pause => {
			println!("{}", if ctx.scanner.pause() { "paused" } else { "not running" });
		}
		ScanCommands::Resume => {
			println!("{}", if ctx.scanner.resume() { "resumed" } else { "not paused" });
		}
		ScanCommands::Cancel => {
			println!("{}", if ctx.scanner.cancel() { "cancelling" } else { "not running" });
		}
	}
	Ok(())
}

async fn run_hash(ctx: &Context, cmd: HashCommands) -> anyhow::Result<()> {
	match cmd {
		HashCommands::Start => {
			let queued = ctx.hash_queue.enqueue_pending().await?;
			if ctx.hash_queue.start() {
				println!("{} hashing started ({queued} file(s) queued)", "✓".green());
			} else {
				println!("{} hashing already running", "✗".red());
			}
		}
		HashCommands::Status => {
			let status = ctx.hash_queue.status().await;
			println!("state:     {:?}", status.state);
			println!("total:     {}", status.files_total);
			println!("processed: {}", status.files_processed);
			println!("queued:    {}", status.queue_size);
			if let Some(current) = status.current_file {
				println!("current:   {current}");
			}
		}
		HashCommands::Stop => {
			ctx.hash_queue.stop();
			println!("{} stop requested", "✓".green());
		}
	}
	Ok(())
}

async fn run_match(ctx: &Context) -> anyhow::Result<()> {
	let stats = ctx.matcher.process_unlinked().await?;
	println!("processed: {}", stats.processed);
	println!("new items: {}", stats.new_items);
	println!("linked:    {}", stats.linked);
	println!("skipped:   {}", stats.skipped);
	Ok(())
}

async fn run_item(ctx: &Context, cmd: ItemCommands) -> anyhow::Result<()> {
	match cmd {
		ItemCommands::List { min_copies, search } => {
			let filters = ItemFilters {
				min_copies,
				search,
				page_size: 50,
				..Default::default()
			};
			let (items, total) = ctx.catalog.list_items(&filters).await?;
			let mut table = Table::new();
			table.set_header(vec!["ID", "Title", "Type", "Status"]);
			for item in items {
				table.add_row(vec![
					item.id.to_string(),
					item.title.unwrap_or_default(),
					item.item_type,
					item.status,
				]);
			}
			println!("{table}");
			println!("{total} item(s) total");
		}
		ItemCommands::Stats => {
			let stats = ctx.catalog.item_stats().await?;
			println!("total items:        {}", stats.total_items);
			println!("singletons:         {}", stats.singletons);
			println!("needs verification: {}", stats.needs_verification);
		}
		ItemCommands::Merge {
			target_id,
			source_ids,
		} => {
			let outcome = ctx.matcher.merge(target_id, &source_ids).await?;
			println!(
				"{} merged {} item(s), moved {} file(s) into #{}",
				"✓".green(),
				outcome.items_merged,
				outcome.files_moved,
				outcome.target_id
			);
		}
		ItemCommands::Split { file_id } => {
			let outcome = ctx.matcher.split(file_id).await?;
			println!(
				"{} split file #{} into new item #{} (was #{})",
				"✓".green(),
				outcome.file_id,
				outcome.new_item_id,
				outcome.old_item_id
			);
		}
	}
	Ok(())
}

async fn run_files(ctx: &Context, missing: bool, page: Option<u64>) -> anyhow::Result<()> {
	let filters = FileFilters {
		missing: if missing { Some(true) } else { None },
		page: page.unwrap_or(0),
		page_size: 50,
		..Default::default()
	};
	let (files, total) = ctx.catalog.list_files(&filters).await?;
	let mut table = Table::new();
	table.set_header(vec!["ID", "Path", "Size", "Hash Status"]);
	for file in files {
		table.add_row(vec![
			file.id.to_string(),
			file.path,
			file.size.to_string(),
			file.hash_status,
		]);
	}
	println!("{table}");
	println!("{total} file(s) total");
	Ok(())
}

async fn run_ops(ctx: &Context, cmd: OpsCommands) -> anyhow::Result<()> {
	match cmd {
		OpsCommands::Create {
			source_file_id,
			dest_drive_id,
			dest_path,
		} => {
			let source = ctx.catalog.get_file(source_file_id).await?;
			let root = ctx.catalog.get_root(source.root_id).await?;

			let (dest_drive_id, dest_path) = match (dest_drive_id, dest_path) {
				(Some(drive_id), Some(path)) => (drive_id, path),
				(Some(drive_id), None) => {
					let drive = ctx.catalog.get_drive(drive_id).await?;
					let file_name = std::path::Path::new(&source.path)
						.file_name()
						.map(|n| n.to_string_lossy().into_owned())
						.unwrap_or_else(|| source.path.clone());
					(drive_id, format!("{}/{}", drive.mount_path, file_name))
				}
				(None, _) => {
					let best = ctx
						.picker
						.pick_best(root.drive_id, source.size, None)
						.await?;
					let file_name = std::path::Path::new(&source.path)
						.file_name()
						.map(|n| n.to_string_lossy().into_owned())
						.unwrap_or_else(|| source.path.clone());
					(best.drive.id, format!("{}/{}", best.drive.mount_path, file_name))
				}
			};

			let op = ctx
				.catalog
				.create_operation(source_file_id, dest_drive_id, dest_path, source.size, true)
				.await?;
			println!("{} created operation #{}", "✓".green(), op.id);
		}
		OpsCommands::List { status } => {
			let filters = OperationFilters {
				status: status.and_then(|s| operation::OperationStatus::from_str(&s).ok()),
				page_size: 50,
				..Default::default()
			};
			let (ops, total) = ctx.catalog.list_operations(&filters).await?;
			let mut table = Table::new();
			table.set_header(vec!["ID", "Status", "Source File", "Dest Path", "Progress"]);
			for op in ops {
				table.add_row(vec![
					op.id.to_string(),
					op.status,
					op.source_file_id.to_string(),
					op.dest_path,
					format!("{}/{}", op.progress, op.total_size),
				]);
			}
			println!("{table}");
			println!("{total} operation(s) total");
		}
		OpsCommands::Start => {
			ctx.operations.start().await;
			println!("{} operations queue started", "✓".green());
		}
		OpsCommands::Pause { id } => {
			let ok = ctx.operations.pause_operation(id).await?;
			println!("{}", if ok { "paused" } else { "could not pause" });
		}
		OpsCommands::Resume { id } => {
			let ok = ctx.operations.resume_operation(id).await?;
			println!("{}", if ok { "resumed" } else { "could not resume" });
		}
		OpsCommands::Cancel { id } => {
			let ok = ctx.operations.cancel_operation(id).await?;
			println!("{}", if ok { "cancelled" } else { "could not cancel" });
		}
	}
	Ok(())
}

async fn run_cleanup(ctx: &Context, cmd: CleanupCommands) -> anyhow::Result<()> {
	match cmd {
		CleanupCommands::Recommend { min_copies, limit } => {
			let summary = ctx.catalog.deletion_recommendations(min_copies, limit).await?;
			for rec in &summary.recommendations {
				println!(
					"#{} {} ({} copies, {} to delete, {:.2} GB savings)",
					rec.item_id,
					rec.title.as_deref().unwrap_or("untitled"),
					rec.total_copies,
					rec.files_to_delete.len(),
					rec.savings_bytes as f64 / 1024f64.powi(3)
				);
			}
			println!(
				"\n{} item(s), {} file(s), {:.2} GB total savings",
				summary.total_items,
				summary.total_files_to_delete,
				summary.total_savings_bytes as f64 / 1024f64.powi(3)
			);
		}
		CleanupCommands::Quarantine { file_ids } => {
			let summary = milestone_core::queue::quarantine::quarantine_files(
				&ctx.catalog,
				&file_ids,
				&ctx.config.quarantine_dirname,
			)
			.await?;
			println!("moved: {}, errors: {}", summary.moved.len(), summary.errors.len());
			for err in &summary.errors {
				println!("  {} file #{}: {}", "✗".red(), err.file_id, err.error);
			}
		}
		CleanupCommands::Restore { file_ids } => {
			let summary = milestone_core::queue::quarantine::restore_files(
				&ctx.catalog,
				&file_ids,
				&ctx.config.quarantine_dirname,
			)
			.await?;
			println!("restored: {}, errors: {}", summary.moved.len(), summary.errors.len());
			for err in &summary.errors {
				println!("  {} file #{}: {}", "✗".red(), err.file_id, err.error);
			}
		}
	}
	Ok(())
}

