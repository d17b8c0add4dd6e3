use crate::libs::errors::TaskError;
use crate::log_debug;
use crate::schemas::identity::TargetIdentity;
use colored::Colorize;
use nix::unistd::{chown, Gid, Uid};
use std::fs;
use std::io::{BufRead, BufReader};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Reads a text file line by line, preserving comments and blank lines.
///
/// # Returns
/// * `Ok(vec![])` when the file does not exist (treated as a new, empty file).
/// * `Err` when it exists but cannot be read.
pub fn read_lines(path: &Path) -> std::io::Result<Vec<String>> {
    if !path.exists() {
        return Ok(vec![]);
    }
    let file = fs::File::open(path)?;
    BufReader::new(file).lines().collect()
}

/// Writes `lines` back, always ending the file with a newline unless it is empty.
pub fn write_lines(path: &Path, lines: &[String]) -> std::io::Result<()> {
    let content = lines.join("\n");
    let final_content = if content.is_empty() {
        content
    } else {
        format!("{content}\n")
    };
    fs::write(path, final_content)
}

/// Hands `path` to `uid:gid`.
pub fn chown_path(path: &Path, uid: u32, gid: u32) -> nix::Result<()> {
    chown(path, Some(Uid::from_raw(uid)), Some(Gid::from_raw(gid)))
}

/// Creates `dir` (and any missing parents below the target's home) owned by the target user.
///
/// Parents outside the home directory are created too, but left owned by root.
pub fn ensure_user_dir(identity: &TargetIdentity, dir: &Path) -> Result<(), TaskError> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir)
        .map_err(|e| TaskError::io(format!("creating {}", dir.display()), e))?;

    let mut current = Some(dir);
    while let Some(path) = current {
        if !path.starts_with(&identity.home) || path == identity.home {
            break;
        }
        chown_path(path, identity.uid, identity.gid).map_err(|source| TaskError::Ownership {
            path: path.to_path_buf(),
            source,
        })?;
        current = path.parent();
    }
    Ok(())
}

/// Writes a file owned by the target user, creating its directory first.
///
/// # Arguments
/// * `path` - Destination, already expanded against the target's home.
/// * `contents` - Full file contents.
/// * `overwrite` - When `false`, an existing file is left untouched.
///
/// # Returns
/// * `Ok(true)` if the file was written, `Ok(false)` if it already existed and was kept.
pub fn write_user_file(
    identity: &TargetIdentity,
    path: &Path,
    contents: &str,
    overwrite: bool,
) -> Result<bool, TaskError> {
    if path.exists() && !overwrite {
        log_debug!(
            "[SDH::Files] Keeping existing {}",
            path.display().to_string().dimmed()
        );
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        ensure_user_dir(identity, parent)?;
    }
    fs::write(path, contents)
        .map_err(|e| TaskError::io(format!("writing {}", path.display()), e))?;
    chown_path(path, identity.uid, identity.gid).map_err(|source| TaskError::Ownership {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(true)
}

/// Sets Unix permission bits on `path`.
pub fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

/// Removes a file or directory tree. Missing paths are fine.
///
/// # Returns
/// * `Ok(true)` when something was removed.
pub fn remove_path(path: &Path) -> std::io::Result<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(true)
}
