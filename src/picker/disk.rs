//! Free-space query for a mount point via the platform `df`/`dir` tool,
//! run off the async executor with a hard timeout since shelling out can
//! hang on an unresponsive network mount.

use crate::error::{CoreError, CoreResult};
use std::path::Path;
use std::process::Command;
use std::time::Duration;

const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct DiskUsage {
	pub total_bytes: u64,
	pub free_bytes: u64,
}

/// Query free/total space for the filesystem backing `mount_path`.
pub async fn disk_usage(mount_path: &Path) -> CoreResult<DiskUsage> {
	let mount_path = mount_path.to_path_buf();
	let query = tokio::task::spawn_blocking(move || query_df(&mount_path));

	match tokio::time::timeout(QUERY_TIMEOUT, query).await {
		Ok(Ok(result)) => result,
		Ok(Err(join_err)) => Err(CoreError::invalid(format!(
			"disk usage query panicked: {join_err}"
		))),
		Err(_) => Err(CoreError::invalid("disk usage query timed out")),
	}
}

#[cfg(unix)]
fn query_df(mount_path: &Path) -> CoreResult<DiskUsage> {
	let output = Command::new("df")
		.args(["-k", &mount_path.to_string_lossy()])
		.output()
		.map_err(CoreError::Io)?;

	if !output.status.success() {
		return Err(CoreError::invalid(format!(
			"df exited with status {}",
			output.status
		)));
	}

	let stdout = String::from_utf8_lossy(&output.stdout);
	let data_line = stdout
		.lines()
		.nth(1)
		.ok_or_else(|| CoreError::invalid("unexpected df output"))?;

	let fields: Vec<&str> = data_line.split_whitespace().collect();
	if fields.len() < 4 {
		return Err(CoreError::invalid("unexpected df field count"));
	}

	let total_kb: u64 = fields[1]
		.parse()
		.map_err(|_| CoreError::invalid("could not parse df total"))?;
	let available_kb: u64 = fields[3]
		.parse()
		.map_err(|_| CoreError::invalid("could not parse df available"))?;

	Ok(DiskUsage {
		total_bytes: total_kb * 1024,
		free_bytes: available_kb * 1024,
	})
}

#[cfg(not(unix))]
fn query_df(mount_path: &Path) -> CoreResult<DiskUsage> {
	let output = Command::new("cmd")
		.args(["/C", "dir", "/-c", &mount_path.to_string_lossy()])
		.output()
		.map_err(CoreError::Io)?;

	if !output.status.success() {
		return Err(CoreError::invalid(format!(
			"dir exited with status {}",
			output.status
		)));
	}

	let stdout = String::from_utf8_lossy(&output.stdout);
	let free_line = stdout
		.lines()
		.rev()
		.find(|l| l.contains("bytes free"))
		.ok_or_else(|| CoreError::invalid("unexpected dir output"))?;

	let digits: String = free_line.chars().filter(|c| c.is_ascii_digit()).collect();
	let free_bytes: u64 = digits
		.parse()
		.map_err(|_| CoreError::invalid("could not parse free bytes"))?;

	Ok(DiskUsage {
		total_bytes: free_bytes,
		free_bytes,
	})
}
