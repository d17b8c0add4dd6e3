//! # Configuration Schema (`config.yaml`)
//!
//! Optional tuning for a run, read from `~/.setup-devhost/config.yaml` in the *target*
//! user's home (or from `$SDH_CONFIG_PATH`). Every field has a default, so a missing file
//! and an empty file behave the same.
//!
//! ```yaml
//! profile_file: ~/.zshrc
//! log_dir: ~/.setup-devhost/logs
//! versions:
//!   go: 1.22.5
//!   tmux: "3.4"
//! refresh:
//!   tmux: always_refresh
//! checksums:
//!   go: 904b924d435eaea086515bc63235b192ea441bd8c9b198c507e85009e6e4c7f0
//! neovim_starter_repo: https://github.com/nvim-lua/kickstart.nvim.git
//! fallback_shell: /bin/bash
//! handoff_to_shell: true
//! ```

use crate::schemas::task::RefreshPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Versions pinned when the config file does not name one.
pub const DEFAULT_VERSIONS: &[(&str, &str)] = &[
    ("go", "1.22.5"),
    ("neovim", "0.11.0"),
    ("tmux", "3.4"),
    ("nvm", "0.39.7"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Shell startup file every task writes its profile lines into.
    pub profile_file: String,
    /// Directory receiving one timestamped log file per run.
    pub log_dir: String,
    /// Per-component version overrides, keyed like `DEFAULT_VERSIONS`.
    pub versions: BTreeMap<String, String>,
    /// Per-task refresh policy overrides, keyed by task key.
    pub refresh: BTreeMap<String, RefreshPolicy>,
    /// Expected SHA-256 of downloaded archives, keyed by task key.
    pub checksums: BTreeMap<String, String>,
    /// Starter configuration cloned into `~/.config/nvim` when none exists.
    pub neovim_starter_repo: String,
    /// Login shell restored when the zsh task is uninstalled.
    pub fallback_shell: String,
    /// Replace the process with the target user's new login shell after "install all".
    pub handoff_to_shell: bool,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        ProvisionConfig {
            profile_file: "~/.zshrc".to_string(),
            log_dir: "~/.setup-devhost/logs".to_string(),
            versions: BTreeMap::new(),
            refresh: BTreeMap::new(),
            checksums: BTreeMap::new(),
            neovim_starter_repo: "https://github.com/nvim-lua/kickstart.nvim.git".to_string(),
            fallback_shell: "/bin/bash".to_string(),
            handoff_to_shell: true,
        }
    }
}

impl ProvisionConfig {
    /// Returns the configured version for `component`, falling back to the pinned default.
    pub fn version_of(&self, component: &str) -> Option<String> {
        self.versions.get(component).cloned().or_else(|| {
            DEFAULT_VERSIONS
                .iter()
                .find(|(name, _)| *name == component)
                .map(|(_, version)| version.to_string())
        })
    }

    /// The refresh policy in effect for `task_key`.
    pub fn refresh_policy(&self, task_key: &str, default: RefreshPolicy) -> RefreshPolicy {
        self.refresh.get(task_key).copied().unwrap_or(default)
    }

    pub fn checksum_for(&self, task_key: &str) -> Option<&str> {
        self.checksums.get(task_key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults_for_missing_fields() {
        let yaml = "versions:\n  go: 1.23.0\nrefresh:\n  tmux: always_refresh\n";
        let cfg: ProvisionConfig = serde_yaml::from_str(yaml).expect("valid yaml");

        assert_eq!(cfg.profile_file, "~/.zshrc");
        assert_eq!(cfg.version_of("go").as_deref(), Some("1.23.0"));
        assert_eq!(cfg.version_of("neovim").as_deref(), Some("0.11.0"));
        assert_eq!(cfg.version_of("unknown"), None);
        assert_eq!(
            cfg.refresh_policy("tmux", RefreshPolicy::SkipWhenPresent),
            RefreshPolicy::AlwaysRefresh
        );
        assert_eq!(
            cfg.refresh_policy("go", RefreshPolicy::SkipWhenPresent),
            RefreshPolicy::SkipWhenPresent
        );
        assert!(cfg.handoff_to_shell);
    }
}
