use std::fmt;

/// Which half of a task pairing ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Install,
    Uninstall,
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskAction::Install => f.write_str("install"),
            TaskAction::Uninstall => f.write_str("uninstall"),
        }
    }
}

/// How a single task invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// The install recipe ran and verification passed.
    Installed,
    /// Detection reported the component present; only the profile was reconciled.
    AlreadyPresent,
    Removed,
    /// Uninstall requested for a component that was never there.
    NotPresent,
    /// The task has no paired uninstaller.
    Unsupported,
    Failed(String),
}

impl TaskStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::Failed(_))
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Installed => f.write_str("installed"),
            TaskStatus::AlreadyPresent => f.write_str("already present"),
            TaskStatus::Removed => f.write_str("removed"),
            TaskStatus::NotPresent => f.write_str("not present"),
            TaskStatus::Unsupported => f.write_str("no uninstaller"),
            TaskStatus::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub key: String,
    pub label: String,
    pub action: TaskAction,
    pub status: TaskStatus,
}

/// Append-only record of what happened during this process.
///
/// Lives as long as the process; nothing here is persisted (the log file carries the text).
#[derive(Debug, Default)]
pub struct ExecutionLog {
    outcomes: Vec<TaskOutcome>,
    invalid_selectors: Vec<String>,
}

impl ExecutionLog {
    pub fn record(&mut self, outcome: TaskOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn record_invalid(&mut self, selector: &str) {
        self.invalid_selectors.push(selector.to_string());
    }

    pub fn outcomes(&self) -> &[TaskOutcome] {
        &self.outcomes
    }

    pub fn invalid_selectors(&self) -> &[String] {
        &self.invalid_selectors
    }

    /// Outcomes recorded at or after `mark`, for per-round summaries.
    pub fn since(&self, mark: usize) -> &[TaskOutcome] {
        &self.outcomes[mark.min(self.outcomes.len())..]
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Labels of every failed task, in the order they failed.
    pub fn failures(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| o.status.is_failure())
            .map(|o| format!("{} ({})", o.label, o.action))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(key: &str, status: TaskStatus) -> TaskOutcome {
        TaskOutcome {
            key: key.to_string(),
            label: key.to_uppercase(),
            action: TaskAction::Install,
            status,
        }
    }

    #[test]
    fn failures_lists_only_failed_outcomes() {
        let mut log = ExecutionLog::default();
        log.record(outcome("go", TaskStatus::Installed));
        log.record(outcome("tmux", TaskStatus::Failed("make failed".into())));
        log.record(outcome("nvm", TaskStatus::AlreadyPresent));

        assert_eq!(log.failures(), vec!["TMUX (install)".to_string()]);
        assert_eq!(log.since(1).len(), 2);
        assert!(log.since(10).is_empty());
    }
}
