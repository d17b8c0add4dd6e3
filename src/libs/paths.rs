// Imports the `Colorize` trait for adding color to console output.
use colored::Colorize;
use std::path::{Path, PathBuf};
use crate::libs::errors::TaskError;
use crate::libs::utilities::file_operations::ensure_user_dir;
use crate::libs::utilities::timestamps::file_stamp;
use crate::log_debug;
use crate::schemas::identity::TargetIdentity;

/// Where the config file lives unless `SDH_CONFIG_PATH` says otherwise.
pub const DEFAULT_CONFIG_PATH: &str = "~/.setup-devhost/config.yaml";

/// Report written into the target's home after a full install.
pub const REPORT_FILE: &str = "setup-devhost-report.txt";

/// Helper script written beside the report.
pub const CHECK_SCRIPT: &str = "setup-devhost-check.sh";

/// Resolves the configuration file path for this run.
///
/// # Arguments
/// * `identity`: `~` expands against this account's home, not root's.
/// * `override_path`: The value of `SDH_CONFIG_PATH`, if set and non-empty.
pub fn resolve_config_path(identity: &TargetIdentity, override_path: Option<&str>) -> PathBuf {
    let raw = override_path
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_CONFIG_PATH);
    let resolved = identity.expand(raw);
    log_debug!(
        "[SDH::Paths] Configuration path: {}",
        resolved.display().to_string().cyan()
    );
    resolved
}

/// `setup-devhost-<stamp>.log` inside `log_dir`.
pub fn log_file_path(log_dir: &Path, stamp: &str) -> PathBuf {
    log_dir.join(format!("setup-devhost-{stamp}.log"))
}

/// Creates the log directory (owned by the target) and returns this run's log file path.
pub fn prepare_log_file(identity: &TargetIdentity, log_dir: &str) -> Result<PathBuf, TaskError> {
    let dir = identity.expand(log_dir);
    ensure_user_dir(identity, &dir)?;
    Ok(log_file_path(&dir, &file_stamp()))
}
