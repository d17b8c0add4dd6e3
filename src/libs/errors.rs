// Typed errors for the layers below the command layer.
// `commands::menu` wraps these with `anyhow` context; tasks turn `TaskError` into a
// recorded failure and the run continues.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why the target identity could not be resolved. Always fatal, before any mutation.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("setup-devhost must be run as root (try: sudo setup-devhost)")]
    NotRoot,
    #[error("account '{0}' does not exist in the account database")]
    UnknownAccount(String),
    #[error("no account has uid {0}")]
    UnknownUid(u32),
    #[error("account database lookup failed: {0}")]
    Lookup(#[from] nix::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read profile {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write profile {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to hand {path} to the target user: {source}")]
    Ownership { path: PathBuf, source: nix::Error },
    #[error("invalid profile line pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// A step inside one task failed. Recorded against the task, never fatal to the run.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("could not launch `{command}`: {source}")]
    Spawn { command: String, source: io::Error },
    #[error("{context}: {source}")]
    Io { context: String, source: io::Error },
    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },
    #[error("checksum mismatch for {url}: expected {expected}, got {actual}")]
    Checksum {
        url: String,
        expected: String,
        actual: String,
    },
    #[error("verification failed: {0}")]
    Verification(String),
    #[error("no version configured for '{0}'")]
    MissingVersion(String),
    #[error("unsupported CPU architecture '{0}'")]
    UnsupportedArch(String),
    #[error("failed to change ownership of {path}: {source}")]
    Ownership { path: PathBuf, source: nix::Error },
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

impl TaskError {
    /// Shorthand for wrapping an `io::Error` with what we were doing at the time.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        TaskError::Io {
            context: context.into(),
            source,
        }
    }
}
