// Small, data-described actions the recipes are assembled from.
//
// Scripts are templates: `{home}`, `{user}`, `{version}`, `{arch}` and
// `{neovim_starter_repo}` are substituted from the run context before execution.

use crate::libs::errors::TaskError;
use crate::libs::run_context::RunContext;
use crate::libs::utilities::command_runner::{run_checked, Invocation};
use crate::libs::utilities::file_operations::remove_path;
use crate::{log_debug, log_info};
use colored::Colorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    /// `bash -c` as root.
    RootScript(&'static str),
    /// `bash -c` as the target user, in their home directory.
    UserScript(&'static str),
    /// Deletes a file or directory tree; `~` expands to the target's home.
    RemovePath(&'static str),
}

/// One action plus whether its failure may be tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub action: StepAction,
    /// Failures are logged as informational and never fail the task.
    pub best_effort: bool,
}

impl Step {
    pub const fn root(script: &'static str) -> Self {
        Step {
            action: StepAction::RootScript(script),
            best_effort: false,
        }
    }

    pub const fn user(script: &'static str) -> Self {
        Step {
            action: StepAction::UserScript(script),
            best_effort: false,
        }
    }

    pub const fn remove(path: &'static str) -> Self {
        Step {
            action: StepAction::RemovePath(path),
            best_effort: false,
        }
    }

    pub const fn best_effort(self) -> Self {
        Step {
            action: self.action,
            best_effort: true,
        }
    }
}

/// Runs `steps` in order. The first mandatory failure stops the sequence.
///
/// # Arguments
/// * `version` - Substituted for `{version}`; `None` leaves the placeholder untouched.
pub fn run_steps(ctx: &RunContext, steps: &[Step], version: Option<&str>) -> Result<(), TaskError> {
    for step in steps {
        match run_step(ctx, step, version) {
            Ok(()) => {}
            Err(e) if step.best_effort => {
                log_info!(
                    "[SDH::Step] Best-effort step did not complete ({}); continuing",
                    e.to_string().dimmed()
                );
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn run_step(ctx: &RunContext, step: &Step, version: Option<&str>) -> Result<(), TaskError> {
    match step.action {
        StepAction::RootScript(template) => {
            let script = ctx.render(template, version);
            run_checked(ctx.runner(), &Invocation::root_script(&script))?;
        }
        StepAction::UserScript(template) => {
            let script = ctx.render(template, version);
            run_checked(ctx.runner(), &Invocation::user_script(&ctx.identity, &script))?;
        }
        StepAction::RemovePath(template) => {
            let path = ctx.identity.expand(&ctx.render(template, version));
            let removed = remove_path(&path)
                .map_err(|e| TaskError::io(format!("removing {}", path.display()), e))?;
            if removed {
                log_debug!("[SDH::Step] Removed {}", path.display());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::test_support::FakeHost;
    use std::fs;

    #[test]
    fn templates_are_rendered_and_user_steps_run_as_target() {
        let (ctx, host, home) = FakeHost::context();
        let steps = [
            Step::root("echo {version} > /dev/null"),
            Step::user("touch {home}/.marker"),
        ];
        run_steps(&ctx, &steps, Some("1.2.3")).unwrap();

        let calls = host.calls();
        assert_eq!(calls[0], "bash -c echo 1.2.3 > /dev/null");
        assert_eq!(
            calls[1],
            format!("[as dev] bash -c touch {}/.marker", home.path().display())
        );
    }

    #[test]
    fn best_effort_failures_do_not_stop_the_sequence() {
        let (ctx, host, _home) = FakeHost::context();
        host.fail_on("systemctl");
        let steps = [
            Step::root("systemctl disable --now fail2ban").best_effort(),
            Step::root("echo after"),
        ];
        assert!(run_steps(&ctx, &steps, None).is_ok());
        assert_eq!(host.calls_matching("echo after").len(), 1);
    }

    #[test]
    fn mandatory_failure_stops_the_sequence() {
        let (ctx, host, _home) = FakeHost::context();
        host.fail_on("make");
        let steps = [Step::root("make install"), Step::root("echo never")];
        assert!(matches!(
            run_steps(&ctx, &steps, None),
            Err(TaskError::CommandFailed { .. })
        ));
        assert!(host.calls_matching("echo never").is_empty());
    }

    #[test]
    fn remove_path_expands_against_target_home() {
        let (ctx, _host, home) = FakeHost::context();
        let dir = home.path().join(".pyenv/bin");
        fs::create_dir_all(&dir).unwrap();

        run_steps(&ctx, &[Step::remove("~/.pyenv")], None).unwrap();
        assert!(!home.path().join(".pyenv").exists());
        run_steps(&ctx, &[Step::remove("~/.pyenv")], None).unwrap();
    }
}
