use crate::libs::errors::ConfigError;
use crate::schemas::config::ProvisionConfig;
use crate::{log_debug, log_info};
use colored::Colorize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Loads the optional configuration file.
///
/// A missing file means "all defaults". An unreadable or malformed file is an error: the
/// run stops before anything is changed rather than guessing what the operator meant.
///
/// # Arguments
/// * `path`: Already resolved against the target's home (see `paths::resolve_config_path`).
///
/// # Returns
/// * The parsed configuration, with defaults for every field the file leaves out.
pub fn load_config(path: &Path) -> Result<ProvisionConfig, ConfigError> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log_info!(
                "[SDH::Config] No configuration at {}; using defaults",
                path.display().to_string().yellow()
            );
            return Ok(ProvisionConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let config = if contents.trim().is_empty() {
        ProvisionConfig::default()
    } else {
        serde_yaml::from_str::<ProvisionConfig>(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?
    };

    log_info!(
        "[SDH::Config] Loaded configuration from {}",
        path.display().to_string().green()
    );
    if let Ok(pretty) = serde_json::to_string_pretty(&config) {
        log_debug!("[SDH::Config] Effective configuration:\n{}", pretty);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::task::RefreshPolicy;
    use tempfile::TempDir;

    #[test]
    fn missing_and_empty_files_yield_defaults() {
        let dir = TempDir::new().unwrap();
        let missing = load_config(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(missing.profile_file, "~/.zshrc");

        let empty = dir.path().join("empty.yaml");
        fs::write(&empty, "\n").unwrap();
        assert!(load_config(&empty).unwrap().handoff_to_shell);
    }

    #[test]
    fn overrides_are_applied() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "handoff_to_shell: false\nrefresh:\n  go: always_refresh\nversions:\n  tmux: \"3.5\"\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert!(!cfg.handoff_to_shell);
        assert_eq!(cfg.version_of("tmux").as_deref(), Some("3.5"));
        assert_eq!(
            cfg.refresh_policy("go", RefreshPolicy::SkipWhenPresent),
            RefreshPolicy::AlwaysRefresh
        );
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "refresh: [unterminated\n").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Parse { .. })));
    }
}
