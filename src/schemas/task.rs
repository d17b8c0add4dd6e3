//! # Task Schema
//!
//! A task is one independently selectable unit of provisioning work: a numeric id and a
//! symbolic key for the menu, a label, a category, and the provisioner that knows how to
//! detect, install and remove the component.
//!
//! Tasks are defined statically in `libs::registry`; nothing creates or destroys them at
//! runtime. Their order in the registry is the canonical "install all" order.

use crate::libs::task_executor::Provisioner;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad grouping shown in the menu and in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Category {
    Security,
    Shell,
    DevTool,
    System,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Security => "security",
            Category::Shell => "shell",
            Category::DevTool => "dev-tool",
            Category::System => "system",
        };
        f.write_str(name)
    }
}

/// What a task does when detection reports the component as already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Skip every system-mutating step; only the profile is reconciled.
    #[default]
    SkipWhenPresent,
    /// Re-run the install recipe every time (re-download, rebuild, re-run bootstrap).
    AlwaysRefresh,
}

/// Result of a state query, decoupled from how it was obtained
/// (package database, command lookup, version stamp or version command).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceState {
    Absent,
    Present { version: Option<String> },
    Stale { found: Option<String>, wanted: String },
}

impl PresenceState {
    pub fn is_absent(&self) -> bool {
        matches!(self, PresenceState::Absent)
    }

    pub fn describe(&self) -> String {
        match self {
            PresenceState::Absent => "absent".to_string(),
            PresenceState::Present { version: Some(v) } => format!("present ({v})"),
            PresenceState::Present { version: None } => "present".to_string(),
            PresenceState::Stale { found, wanted } => format!(
                "stale (found {}, want {})",
                found.as_deref().unwrap_or("unknown"),
                wanted
            ),
        }
    }
}

/// One entry of the task catalog.
pub struct Task {
    /// Numeric menu selector, unique across the registry.
    pub id: u8,
    /// Symbolic selector and config key (`zsh`, `go`, ...).
    pub key: &'static str,
    pub label: &'static str,
    pub category: Category,
    /// Used when the config file has no override for `key`.
    pub default_refresh: RefreshPolicy,
    /// Shell command printing the installed version, used by the generated helper script.
    pub version_cmd: Option<&'static str>,
    pub provisioner: Box<dyn Provisioner>,
}

impl Task {
    pub fn can_uninstall(&self) -> bool {
        self.provisioner.can_uninstall()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("label", &self.label)
            .field("category", &self.category)
            .finish()
    }
}
