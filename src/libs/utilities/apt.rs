// Thin wrapper around dpkg/apt: query package state, install, purge.
// apt itself (dependency resolution, repositories) is an external collaborator; this module
// only decides *whether* to call it and with what.

use crate::libs::errors::TaskError;
use crate::libs::run_context::RunContext;
use crate::libs::utilities::command_runner::{run_checked, CommandRunner, Invocation};
use crate::{log_debug, log_info};
use colored::Colorize;

/// Installed state of one package as reported by dpkg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageStatus {
    NotInstalled,
    Installed { version: String },
}

/// Queries dpkg for `package`.
///
/// `dpkg-query` exits non-zero for packages it has never heard of; a package that was
/// removed but not purged reports `deinstall ok config-files`. Both count as not installed.
pub fn package_status(runner: &dyn CommandRunner, package: &str) -> PackageStatus {
    let query = Invocation::root(
        "dpkg-query",
        ["-W", "-f=${Status}\t${Version}", package],
    );
    let Ok(output) = runner.run(&query) else {
        return PackageStatus::NotInstalled;
    };
    if !output.success() {
        return PackageStatus::NotInstalled;
    }

    let mut fields = output.stdout.trim().splitn(2, '\t');
    let status = fields.next().unwrap_or_default();
    let version = fields.next().unwrap_or_default().trim();

    if status.trim_end().ends_with(" installed") {
        PackageStatus::Installed {
            version: version.to_string(),
        }
    } else {
        PackageStatus::NotInstalled
    }
}

pub fn is_installed(runner: &dyn CommandRunner, package: &str) -> bool {
    matches!(
        package_status(runner, package),
        PackageStatus::Installed { .. }
    )
}

/// Runs `apt-get update` once per process, before the first install.
pub fn refresh_index(ctx: &RunContext) -> Result<(), TaskError> {
    if ctx.apt_index_fresh() {
        log_debug!("[SDH::Apt] Package index already refreshed this run");
        return Ok(());
    }
    log_info!("[SDH::Apt] Refreshing package index...");
    run_checked(ctx.runner(), &apt_get(["update"]))?;
    ctx.mark_apt_index_fresh();
    Ok(())
}

/// Installs whichever of `packages` are missing. Already-installed packages are left alone.
pub fn install_packages(ctx: &RunContext, packages: &[&str]) -> Result<(), TaskError> {
    let missing: Vec<&str> = packages
        .iter()
        .copied()
        .filter(|p| !is_installed(ctx.runner(), p))
        .collect();
    if missing.is_empty() {
        log_debug!("[SDH::Apt] Packages already installed: {}", packages.join(" "));
        return Ok(());
    }

    refresh_index(ctx)?;
    log_info!(
        "[SDH::Apt] Installing: {}",
        missing.join(" ").bold()
    );
    let mut args = vec!["install", "-y"];
    args.extend(missing.iter().copied());
    run_checked(ctx.runner(), &apt_get(args))?;
    Ok(())
}

/// Purges whichever of `packages` are installed. Missing packages are a no-op.
pub fn purge_packages(ctx: &RunContext, packages: &[&str]) -> Result<(), TaskError> {
    let present: Vec<&str> = packages
        .iter()
        .copied()
        .filter(|p| is_installed(ctx.runner(), p))
        .collect();
    if present.is_empty() {
        log_debug!("[SDH::Apt] Nothing to purge among: {}", packages.join(" "));
        return Ok(());
    }

    log_info!("[SDH::Apt] Purging: {}", present.join(" ").bold());
    let mut args = vec!["purge", "-y"];
    args.extend(present.iter().copied());
    run_checked(ctx.runner(), &apt_get(args))?;
    Ok(())
}

fn apt_get<'a>(args: impl IntoIterator<Item = &'a str>) -> Invocation {
    Invocation::root("apt-get", args).with_env("DEBIAN_FRONTEND", "noninteractive")
}
