// The generic install/uninstall state machine every task goes through.
//
// Recipes (in `installers`) only answer "what is there" and "how to change it"; this module
// decides whether to change anything, reconciles the shell profile, verifies the result and
// records the outcome. A failing task is recorded and the caller moves on to the next one.

use crate::libs::errors::TaskError;
use crate::libs::run_context::RunContext;
use crate::libs::shell_profile::{ProfileEntry, ShellProfile};
use crate::schemas::execution_log::{TaskAction, TaskOutcome, TaskStatus};
use crate::schemas::task::{PresenceState, RefreshPolicy, Task};
use crate::{log_debug, log_error, log_info, log_success, log_warn};
use colored::Colorize;

/// Capabilities of one tool recipe.
///
/// Implementations never record outcomes or decide whether to skip; they detect and mutate.
pub trait Provisioner {
    /// Queries the host for the component's current state.
    fn detect(&self, ctx: &RunContext) -> Result<PresenceState, TaskError>;

    /// Performs the minimal steps that take the component to present.
    fn install(&self, ctx: &RunContext) -> Result<(), TaskError>;

    /// Removes the component. Only called when `detect` reported something.
    fn uninstall(&self, ctx: &RunContext) -> Result<(), TaskError>;

    fn can_uninstall(&self) -> bool {
        true
    }

    /// Runs before the profile entries are ensured, on every install.
    fn prepare_profile(&self, _ctx: &RunContext, _profile: &ShellProfile) -> Result<(), TaskError> {
        Ok(())
    }

    /// The lines this task owns in the target's profile, banner first.
    fn profile_effects(&self, _ctx: &RunContext) -> Vec<ProfileEntry> {
        Vec::new()
    }

    /// Whether the component is usable after `install`.
    fn verify(&self, ctx: &RunContext) -> Result<bool, TaskError> {
        Ok(matches!(self.detect(ctx)?, PresenceState::Present { .. }))
    }

    /// Printed after an uninstall whose cleanup is knowingly incomplete.
    fn best_effort_note(&self) -> Option<&'static str> {
        None
    }
}

/// Installs `task` and records the outcome in `ctx.log`.
pub fn run_install(task: &Task, ctx: &mut RunContext) -> TaskStatus {
    announce(task, TaskAction::Install);
    let status = install_task(task, ctx).unwrap_or_else(|e| TaskStatus::Failed(e.to_string()));
    conclude(task, TaskAction::Install, status, ctx)
}

/// Uninstalls `task` and records the outcome in `ctx.log`.
pub fn run_uninstall(task: &Task, ctx: &mut RunContext) -> TaskStatus {
    announce(task, TaskAction::Uninstall);
    let status = uninstall_task(task, ctx).unwrap_or_else(|e| TaskStatus::Failed(e.to_string()));
    conclude(task, TaskAction::Uninstall, status, ctx)
}

fn install_task(task: &Task, ctx: &RunContext) -> Result<TaskStatus, TaskError> {
    let provisioner = task.provisioner.as_ref();
    let state = provisioner.detect(ctx)?;
    let policy = ctx.config.refresh_policy(task.key, task.default_refresh);
    log_info!(
        "[SDH::Task] {} is {} (refresh policy: {:?})",
        task.label.bold(),
        state.describe().cyan(),
        policy
    );

    let status = match (&state, policy) {
        (PresenceState::Present { .. }, RefreshPolicy::SkipWhenPresent) => {
            log_info!(
                "[SDH::Task] Skipping install of {}; reconciling profile only",
                task.label
            );
            TaskStatus::AlreadyPresent
        }
        _ => {
            provisioner.install(ctx)?;
            TaskStatus::Installed
        }
    };

    let profile = ctx.profile();
    provisioner.prepare_profile(ctx, &profile)?;
    let effects = provisioner.profile_effects(ctx);
    if !effects.is_empty() {
        let inserted = profile.ensure_entries_present(&effects)?;
        log_debug!(
            "[SDH::Task] {} profile line(s) added for {}",
            inserted,
            task.key
        );
    }

    if !provisioner.verify(ctx)? {
        return Err(TaskError::Verification(format!(
            "{} is still not detected after install",
            task.label
        )));
    }
    Ok(status)
}

fn uninstall_task(task: &Task, ctx: &RunContext) -> Result<TaskStatus, TaskError> {
    let provisioner = task.provisioner.as_ref();
    if !provisioner.can_uninstall() {
        return Ok(TaskStatus::Unsupported);
    }

    let state = provisioner.detect(ctx)?;
    let status = if state.is_absent() {
        log_info!(
            "[SDH::Task] {} is not installed; cleaning profile lines only",
            task.label
        );
        TaskStatus::NotPresent
    } else {
        provisioner.uninstall(ctx)?;
        TaskStatus::Removed
    };

    let effects = provisioner.profile_effects(ctx);
    if !effects.is_empty() {
        let removed = ctx.profile().ensure_entries_absent(&effects)?;
        log_debug!(
            "[SDH::Task] {} profile line(s) removed for {}",
            removed,
            task.key
        );
    }

    if status == TaskStatus::Removed {
        if let Some(note) = provisioner.best_effort_note() {
            log_info!("[SDH::Task] Note: {}", note);
        }
    }
    Ok(status)
}

fn announce(task: &Task, action: TaskAction) {
    eprintln!("{}", "=".repeat(72).bright_blue());
    log_info!(
        "[SDH::Task] [{}] {} {} ({})",
        task.id,
        action.to_string().bright_yellow(),
        task.label.bright_blue().bold(),
        task.category
    );
}

fn conclude(task: &Task, action: TaskAction, status: TaskStatus, ctx: &mut RunContext) -> TaskStatus {
    match &status {
        TaskStatus::Installed | TaskStatus::Removed => {
            log_success!("[SDH::Task] {}: {}", task.label, status)
        }
        TaskStatus::AlreadyPresent | TaskStatus::NotPresent => {
            log_info!("[SDH::Task] {}: {}", task.label, status)
        }
        TaskStatus::Unsupported => log_warn!(
            "[SDH::Task] {} has no uninstaller; nothing was changed",
            task.label
        ),
        TaskStatus::Failed(reason) => log_error!(
            "[SDH::Task] {} {} failed: {}",
            task.label,
            action,
            reason.red()
        ),
    }
    ctx.log.record(TaskOutcome {
        key: task.key.to_string(),
        label: task.label.to_string(),
        action,
        status: status.clone(),
    });
    status
}
