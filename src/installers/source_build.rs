// tmux, built from its release tarball into /usr/local.
//
// A source build leaves no package record, so presence is judged by `tmux -V` alone.
// `make install` has no inverse, so uninstall removes the known files and says so.

use crate::installers::steps::{run_steps, Step};
use crate::libs::errors::TaskError;
use crate::libs::run_context::RunContext;
use crate::libs::task_executor::Provisioner;
use crate::libs::utilities::apt;
use crate::libs::utilities::command_runner::{run_checked, Invocation};
use crate::libs::utilities::downloads::{download_file, extract_tar_gz, find_dir_containing, verify_checksum};
use crate::libs::utilities::file_operations::{remove_path, write_user_file};
use crate::libs::utilities::versions::{classify, parse_lenient};
use crate::schemas::task::PresenceState;
use crate::{log_debug, log_info};
use colored::Colorize;
use std::fs;

pub struct SourceBuildRecipe {
    pub component: &'static str,
    pub url_template: &'static str,
    pub build_dependencies: &'static [&'static str],
    /// Run in the directory holding `configure`.
    pub build_script: &'static str,
    /// Version query; its output must contain the version number.
    pub version_argv: &'static [&'static str],
    /// Home-relative config file written only when the user has none.
    pub config_file: Option<(&'static str, &'static str)>,
    pub removal: &'static [Step],
}

const TMUX_CONF: &str = "\
# Written by setup-devhost. Edit freely; it will not be overwritten.
set -g mouse on
set -g history-limit 50000
set -g base-index 1
setw -g pane-base-index 1
set -g default-terminal \"tmux-256color\"
set -sg escape-time 10
";

pub const TMUX: SourceBuildRecipe = SourceBuildRecipe {
    component: "tmux",
    url_template: "https://github.com/tmux/tmux/releases/download/{version}/tmux-{version}.tar.gz",
    build_dependencies: &["libevent-dev", "libncurses-dev", "build-essential", "bison", "pkg-config"],
    build_script: "./configure --prefix=/usr/local && make && make install",
    version_argv: &["tmux", "-V"],
    config_file: Some((".tmux.conf", TMUX_CONF)),
    removal: &[
        Step::remove("/usr/local/bin/tmux").best_effort(),
        Step::remove("/usr/local/share/man/man1/tmux.1").best_effort(),
    ],
};

impl SourceBuildRecipe {
    fn wanted_version(&self, ctx: &RunContext) -> Result<String, TaskError> {
        ctx.config
            .version_of(self.component)
            .ok_or_else(|| TaskError::MissingVersion(self.component.to_string()))
    }

    /// The version the installed binary reports, or `None` when it is not runnable.
    fn query_version(&self, ctx: &RunContext) -> Option<String> {
        let (program, args) = self.version_argv.split_first()?;
        let output = ctx.runner().run(&Invocation::root(program, args.iter().copied())).ok()?;
        if !output.success() {
            return None;
        }
        let reported = output.stdout.trim();
        parse_lenient(reported)?;
        Some(
            reported
                .rsplit(' ')
                .next()
                .unwrap_or(reported)
                .to_string(),
        )
    }

    fn write_config(&self, ctx: &RunContext) -> Result<(), TaskError> {
        let Some((relative, contents)) = self.config_file else {
            return Ok(());
        };
        let path = ctx.identity.home_path(relative);
        if write_user_file(&ctx.identity, &path, contents, false)? {
            log_info!("[SDH::Build] Wrote {}", path.display().to_string().cyan());
        }
        Ok(())
    }

    /// Removes the config file only if it is still exactly what we wrote.
    ///
    /// # Returns
    /// * `true` when a customised copy was left in place.
    fn remove_config(&self, ctx: &RunContext) -> Result<bool, TaskError> {
        let Some((relative, contents)) = self.config_file else {
            return Ok(false);
        };
        let path = ctx.identity.home_path(relative);
        match fs::read_to_string(&path) {
            Ok(current) if current == contents => {
                remove_path(&path)
                    .map_err(|e| TaskError::io(format!("removing {}", path.display()), e))?;
                Ok(false)
            }
            Ok(_) => {
                log_info!(
                    "[SDH::Build] {} was edited since it was written; keeping it",
                    path.display()
                );
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }
}

impl Provisioner for SourceBuildRecipe {
    fn detect(&self, ctx: &RunContext) -> Result<PresenceState, TaskError> {
        let wanted = self.wanted_version(ctx)?;
        Ok(match self.query_version(ctx) {
            None => PresenceState::Absent,
            Some(found) => classify(Some(&found), &wanted),
        })
    }

    fn install(&self, ctx: &RunContext) -> Result<(), TaskError> {
        let version = self.wanted_version(ctx)?;
        apt::install_packages(ctx, self.build_dependencies)?;

        let url = self.url_template.replace("{version}", &version);
        let workdir = tempfile::Builder::new()
            .prefix("setup-devhost-build-")
            .tempdir()
            .map_err(|e| TaskError::io("creating build directory", e))?;
        let archive = workdir.path().join("source.tar.gz");
        download_file(&url, &archive)?;
        verify_checksum(&archive, &url, ctx.config.checksum_for(self.component))?;

        let tree = workdir.path().join("src");
        extract_tar_gz(&archive, &tree).map_err(|e| TaskError::io(format!("unpacking {url}"), e))?;
        let source_root = find_dir_containing(&tree, "configure").ok_or_else(|| {
            TaskError::Verification(format!("no configure script inside {url}"))
        })?;
        log_debug!("[SDH::Build] Building in {}", source_root.display());

        log_info!(
            "[SDH::Build] Compiling {} {} (this takes a while)",
            self.component.bold(),
            version
        );
        run_checked(
            ctx.runner(),
            &Invocation::root_script(self.build_script).in_dir(&source_root),
        )?;
        self.write_config(ctx)
    }

    fn uninstall(&self, ctx: &RunContext) -> Result<(), TaskError> {
        run_steps(ctx, self.removal, None)?;
        self.remove_config(ctx)?;
        Ok(())
    }

    fn best_effort_note(&self) -> Option<&'static str> {
        Some("only the installed binary and man page were removed; build dependencies and an edited ~/.tmux.conf were kept")
    }
}
