// Every subprocess this tool starts goes through `CommandRunner`.
// The production runner launches real processes; tests substitute a scripted fake host.
//
// An `Invocation` says *who* a command runs as. Root invocations run directly (the whole
// process is already privileged). User invocations are wrapped in `runuser -u <user> --`
// with HOME/USER/LOGNAME pointing at the target account, so nothing user-scoped ever ends
// up owned by root.

use crate::libs::errors::TaskError;
use crate::log_debug;
use crate::schemas::identity::TargetIdentity;
use colored::Colorize;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// The account a command is executed as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunAs {
    Root,
    User { name: String, home: PathBuf },
}

/// A fully described command, independent of how it is eventually launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub run_as: RunAs,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    /// A command executed by root.
    pub fn root<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            run_as: RunAs::Root,
            cwd: None,
            env: Vec::new(),
        }
    }

    /// A command executed as the target user, starting in their home directory.
    pub fn user<I, S>(identity: &TargetIdentity, program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            run_as: RunAs::User {
                name: identity.user.clone(),
                home: identity.home.clone(),
            },
            cwd: Some(identity.home.clone()),
            env: Vec::new(),
        }
    }

    /// A `bash -c` script as root.
    pub fn root_script(script: &str) -> Self {
        Invocation::root("bash", ["-c", script])
    }

    /// A `bash -c` script as the target user.
    pub fn user_script(identity: &TargetIdentity, script: &str) -> Self {
        Invocation::user(identity, "bash", ["-c", script])
    }

    pub fn in_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn is_root(&self) -> bool {
        matches!(self.run_as, RunAs::Root)
    }

    /// `program arg1 arg2`, for logs and error messages.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        let line = parts.join(" ");
        match &self.run_as {
            RunAs::Root => line,
            RunAs::User { name, .. } => format!("[as {name}] {line}"),
        }
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn ok(stdout: &str) -> Self {
        CommandOutput {
            status: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: &str) -> Self {
        CommandOutput {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }
}

pub trait CommandRunner {
    /// Runs the command to completion. `Err` only when it could not be started at all.
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput>;
}

/// Launches real processes. Blocks until each one exits; there is no timeout.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        let mut command = match &invocation.run_as {
            RunAs::Root => Command::new(&invocation.program),
            RunAs::User { name, home } => {
                let mut wrapped = Command::new("runuser");
                wrapped
                    .args(["-u", name.as_str(), "--", invocation.program.as_str()])
                    .env("HOME", home)
                    .env("USER", name)
                    .env("LOGNAME", name);
                wrapped
            }
        };
        command.args(&invocation.args);
        if let Some(dir) = &invocation.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &invocation.env {
            command.env(key, value);
        }

        log_debug!("[SDH::Exec] {}", invocation.display().dimmed());
        let output = command.output()?;

        let captured = CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !captured.stdout.trim().is_empty() {
            log_debug!("[SDH::Exec] stdout:\n{}", captured.stdout.trim_end());
        }
        Ok(captured)
    }
}

/// Runs `invocation` and turns a launch failure or non-zero exit into a `TaskError`.
pub fn run_checked(
    runner: &dyn CommandRunner,
    invocation: &Invocation,
) -> Result<CommandOutput, TaskError> {
    let output = runner.run(invocation).map_err(|source| TaskError::Spawn {
        command: invocation.display(),
        source,
    })?;

    if output.success() {
        Ok(output)
    } else {
        Err(TaskError::CommandFailed {
            command: invocation.display(),
            status: output
                .status
                .map(|code| format!("status {code}"))
                .unwrap_or_else(|| "a signal".to_string()),
            stderr: last_lines(&output.stderr, 5),
        })
    }
}

/// Runs `invocation` and only reports whether it exited zero.
pub fn run_succeeds(runner: &dyn CommandRunner, invocation: &Invocation) -> bool {
    runner
        .run(invocation)
        .map(|output| output.success())
        .unwrap_or(false)
}

/// Whether `command` resolves on the PATH of the given account.
///
/// For the target user this runs a login-less `bash -c`, so it sees `/usr/local/bin` and
/// friends but not PATH entries that only the profile adds; callers needing those check the
/// binary's fixed location instead.
pub fn command_exists(
    runner: &dyn CommandRunner,
    identity: Option<&TargetIdentity>,
    command: &str,
) -> bool {
    let lookup = format!("command -v {command}");
    let invocation = match identity {
        Some(id) => Invocation::user_script(id, &lookup),
        None => Invocation::root_script(&lookup),
    };
    run_succeeds(runner, &invocation)
}

fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}
