// zsh as the target user's login shell, and the block at the top of the profile it owns.

use crate::libs::errors::TaskError;
use crate::libs::run_context::RunContext;
use crate::libs::shell_profile::{ProfileEntry, ShellProfile};
use crate::libs::task_executor::Provisioner;
use crate::libs::utilities::apt::{self, PackageStatus};
use crate::libs::utilities::command_runner::{run_checked, Invocation};
use crate::schemas::task::PresenceState;
use crate::{log_debug, log_info};
use colored::Colorize;

pub struct LoginShellRecipe {
    pub package: &'static str,
    /// Used when `command -v` cannot locate the installed shell.
    pub default_path: &'static str,
    /// Lines placed at the very top of the profile, after the banner.
    pub profile_lines: &'static [&'static str],
}

pub const ZSH: LoginShellRecipe = LoginShellRecipe {
    package: "zsh",
    default_path: "/usr/bin/zsh",
    profile_lines: &[
        "export HISTFILE=\"$HOME/.zsh_history\"",
        "export HISTSIZE=10000",
        "export SAVEHIST=10000",
        "setopt HIST_IGNORE_DUPS SHARE_HISTORY",
        "autoload -Uz compinit && compinit",
    ],
};

impl LoginShellRecipe {
    /// The login shell currently recorded for the target, straight from the account database.
    fn current_login_shell(&self, ctx: &RunContext) -> Result<String, TaskError> {
        let output = run_checked(
            ctx.runner(),
            &Invocation::root("getent", ["passwd", ctx.identity.user.as_str()]),
        )?;
        Ok(login_shell_field(&output.stdout).unwrap_or_default())
    }

    fn shell_path(&self, ctx: &RunContext) -> String {
        let lookup = Invocation::root_script(&format!("command -v {}", self.package));
        match ctx.runner().run(&lookup) {
            Ok(out) if out.success() && !out.stdout.trim().is_empty() => {
                out.stdout.trim().to_string()
            }
            _ => self.default_path.to_string(),
        }
    }

    fn is_this_shell(&self, path: &str) -> bool {
        path.rsplit('/').next() == Some(self.package)
    }
}

impl Provisioner for LoginShellRecipe {
    /// Absent without the package; stale while the account still logs into another shell.
    fn detect(&self, ctx: &RunContext) -> Result<PresenceState, TaskError> {
        let PackageStatus::Installed { version } = apt::package_status(ctx.runner(), self.package)
        else {
            return Ok(PresenceState::Absent);
        };

        let current = self.current_login_shell(ctx)?;
        if self.is_this_shell(&current) {
            Ok(PresenceState::Present {
                version: Some(version),
            })
        } else {
            Ok(PresenceState::Stale {
                found: Some(format!("login shell {current}")),
                wanted: format!("login shell {}", self.package),
            })
        }
    }

    fn install(&self, ctx: &RunContext) -> Result<(), TaskError> {
        apt::install_packages(ctx, &[self.package])?;

        let shell = self.shell_path(ctx);
        if self.is_this_shell(&self.current_login_shell(ctx)?) {
            log_debug!("[SDH::Shell] {} already logs into {}", ctx.identity.user, shell);
            return Ok(());
        }
        log_info!(
            "[SDH::Shell] Changing login shell of {} to {}",
            ctx.identity.user.bold(),
            shell.cyan()
        );
        run_checked(
            ctx.runner(),
            &Invocation::root("chsh", ["-s", shell.as_str(), ctx.identity.user.as_str()]),
        )?;
        Ok(())
    }

    /// Restores the fallback login shell, then purges the package. The profile file stays.
    fn uninstall(&self, ctx: &RunContext) -> Result<(), TaskError> {
        let fallback = ctx.config.fallback_shell.as_str();
        if self.is_this_shell(&self.current_login_shell(ctx)?) {
            log_info!(
                "[SDH::Shell] Restoring login shell of {} to {}",
                ctx.identity.user.bold(),
                fallback.cyan()
            );
            run_checked(
                ctx.runner(),
                &Invocation::root("chsh", ["-s", fallback, ctx.identity.user.as_str()]),
            )?;
        }
        apt::purge_packages(ctx, &[self.package])
    }

    /// Backs up an existing profile, then moves this task's block to the top of it.
    fn prepare_profile(&self, ctx: &RunContext, profile: &ShellProfile) -> Result<(), TaskError> {
        profile.backup()?;
        profile.rewrite_with_leading_block(&self.profile_effects(ctx))?;
        Ok(())
    }

    fn profile_effects(&self, _ctx: &RunContext) -> Vec<ProfileEntry> {
        std::iter::once(ProfileEntry::banner(self.package))
            .chain(self.profile_lines.iter().map(|l| ProfileEntry::line(*l)))
            .collect()
    }

    fn best_effort_note(&self) -> Option<&'static str> {
        Some("the profile file and its setup-devhost backups were left in place")
    }
}

/// Field 7 of a passwd line.
fn login_shell_field(passwd_line: &str) -> Option<String> {
    passwd_line
        .lines()
        .next()?
        .split(':')
        .nth(6)
        .map(|s| s.trim().to_string())
}
