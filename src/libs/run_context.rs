// The explicit context every task executes against.
//
// It carries what would otherwise be process-wide globals: the resolved identity, the
// configuration, the command runner, the log file location and the execution log.
// Task code receives `&RunContext`; only the executor records outcomes through `&mut`.

use crate::libs::shell_profile::ShellProfile;
use crate::libs::utilities::command_runner::CommandRunner;
use crate::libs::utilities::platform::detect_architecture;
use crate::schemas::config::ProvisionConfig;
use crate::schemas::execution_log::ExecutionLog;
use crate::schemas::identity::TargetIdentity;
use std::cell::Cell;
use std::path::PathBuf;

pub struct RunContext {
    pub identity: TargetIdentity,
    pub config: ProvisionConfig,
    pub log_file: Option<PathBuf>,
    pub log: ExecutionLog,
    runner: Box<dyn CommandRunner>,
    apt_index_fresh: Cell<bool>,
}

impl RunContext {
    pub fn new(
        identity: TargetIdentity,
        config: ProvisionConfig,
        runner: Box<dyn CommandRunner>,
        log_file: Option<PathBuf>,
    ) -> Self {
        RunContext {
            identity,
            config,
            log_file,
            log: ExecutionLog::default(),
            runner,
            apt_index_fresh: Cell::new(false),
        }
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    /// The target user's shell profile, owned by the target user.
    pub fn profile(&self) -> ShellProfile {
        ShellProfile::new(
            self.identity.expand(&self.config.profile_file),
            Some((self.identity.uid, self.identity.gid)),
        )
    }

    /// Whether `apt-get update` already ran during this process.
    pub fn apt_index_fresh(&self) -> bool {
        self.apt_index_fresh.get()
    }

    pub fn mark_apt_index_fresh(&self) {
        self.apt_index_fresh.set(true);
    }

    /// Substitutes `{version}`, `{arch}`, `{user}`, `{home}` and `{neovim_starter_repo}`.
    ///
    /// `version` is the already-resolved version for the component being rendered.
    pub fn render(&self, template: &str, version: Option<&str>) -> String {
        let mut rendered = template
            .replace("{user}", &self.identity.user)
            .replace("{home}", &self.identity.home.to_string_lossy())
            .replace("{neovim_starter_repo}", &self.config.neovim_starter_repo)
            .replace("{arch}", &detect_architecture());
        if let Some(v) = version {
            rendered = rendered.replace("{version}", v);
        }
        rendered
    }

    pub fn log_file_display(&self) -> String {
        self.log_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(terminal only)".to_string())
    }
}
