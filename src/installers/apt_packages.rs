// Components that are nothing more than apt packages plus a little system configuration:
// the firewall, fail2ban and the base build toolchain.

use crate::installers::steps::{run_steps, Step};
use crate::libs::errors::TaskError;
use crate::libs::run_context::RunContext;
use crate::libs::task_executor::Provisioner;
use crate::libs::utilities::apt::{self, PackageStatus};
use crate::schemas::task::PresenceState;

pub struct AptRecipe {
    pub packages: &'static [&'static str],
    /// Run after the packages are in place, on every (re)install.
    pub configure: &'static [Step],
    /// Run before the packages are purged.
    pub teardown: &'static [Step],
    /// `false` for packages other components depend on.
    pub removable: bool,
}

impl Provisioner for AptRecipe {
    /// Present only when every package is installed; a partial set is stale.
    fn detect(&self, ctx: &RunContext) -> Result<PresenceState, TaskError> {
        let statuses: Vec<PackageStatus> = self
            .packages
            .iter()
            .map(|p| apt::package_status(ctx.runner(), p))
            .collect();
        let installed = statuses
            .iter()
            .filter(|s| matches!(s, PackageStatus::Installed { .. }))
            .count();

        Ok(if installed == 0 {
            PresenceState::Absent
        } else if installed == self.packages.len() {
            let version = match &statuses[0] {
                PackageStatus::Installed { version } => Some(version.clone()),
                PackageStatus::NotInstalled => None,
            };
            PresenceState::Present { version }
        } else {
            PresenceState::Stale {
                found: Some(format!("{installed}/{} packages", self.packages.len())),
                wanted: format!("{} packages", self.packages.len()),
            }
        })
    }

    fn install(&self, ctx: &RunContext) -> Result<(), TaskError> {
        apt::install_packages(ctx, self.packages)?;
        run_steps(ctx, self.configure, None)
    }

    fn uninstall(&self, ctx: &RunContext) -> Result<(), TaskError> {
        run_steps(ctx, self.teardown, None)?;
        apt::purge_packages(ctx, self.packages)
    }

    fn can_uninstall(&self) -> bool {
        self.removable
    }
}

/// Default-deny inbound, allow outbound, keep SSH reachable.
pub const UFW: AptRecipe = AptRecipe {
    packages: &["ufw"],
    configure: &[
        Step::root("ufw default deny incoming"),
        Step::root("ufw default allow outgoing"),
        Step::root("ufw allow OpenSSH"),
        Step::root("ufw --force enable"),
    ],
    teardown: &[Step::root("ufw --force disable").best_effort()],
    removable: true,
};

pub const FAIL2BAN: AptRecipe = AptRecipe {
    packages: &["fail2ban"],
    configure: &[Step::root("systemctl enable --now fail2ban").best_effort()],
    teardown: &[Step::root("systemctl disable --now fail2ban").best_effort()],
    removable: true,
};

/// Compilers, git and download tools most other components need.
pub const ESSENTIALS: AptRecipe = AptRecipe {
    packages: &[
        "build-essential",
        "curl",
        "wget",
        "git",
        "unzip",
        "ca-certificates",
        "pkg-config",
        "libssl-dev",
    ],
    configure: &[],
    teardown: &[],
    removable: false,
};
