use serde::Serialize;
use std::path::PathBuf;

/// The unprivileged account that user-scoped work is performed for.
///
/// Resolved once at startup from the privilege-escalation context and never changed
/// afterwards. System-wide mutations (packages, services, `/usr/local`, `/opt`) run as root;
/// everything below `home` runs as, or is chowned to, this account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetIdentity {
    /// Account name as recorded in the account database.
    pub user: String,
    /// Numeric user id, used to chown files the root process writes for the user.
    pub uid: u32,
    /// Primary group id of the account.
    pub gid: u32,
    /// Home directory from the account database, not from `$HOME`.
    pub home: PathBuf,
    /// Login shell recorded at startup. Live checks query the database again.
    pub login_shell: PathBuf,
}

impl TargetIdentity {
    /// Joins a home-relative path such as `.tmux.conf`.
    pub fn home_path(&self, relative: &str) -> PathBuf {
        self.home.join(relative.trim_start_matches("~/"))
    }

    /// Expands a leading `~` against this account's home directory.
    pub fn expand(&self, path: &str) -> PathBuf {
        let home = self.home.to_string_lossy().into_owned();
        let expanded = shellexpand::tilde_with_context(path, || Some(home.clone()));
        PathBuf::from(expanded.as_ref())
    }
}
