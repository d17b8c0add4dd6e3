// Fetching, verifying and unpacking release archives.
// Only `.tar.gz` is needed: Go, Neovim and tmux all publish one.

use crate::libs::errors::TaskError;
use crate::{log_debug, log_info};
use colored::Colorize;
use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tar::Archive;

/// Downloads `url` into `dest`, streaming straight to disk.
pub fn download_file(url: &str, dest: &Path) -> Result<(), TaskError> {
    log_info!("[SDH::Download] Fetching {}", url.blue());

    let response = ureq::get(url).call().map_err(|e| TaskError::Download {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let mut file =
        File::create(dest).map_err(|e| TaskError::io(format!("creating {}", dest.display()), e))?;
    let mut reader = response.into_reader();
    io::copy(&mut reader, &mut file).map_err(|e| TaskError::Download {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    log_debug!(
        "[SDH::Download] Saved to {}",
        dest.to_string_lossy().green()
    );
    Ok(())
}

/// Lowercase hex SHA-256 of a file's contents.
pub fn sha256_of(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Compares the archive against `expected` when one is configured.
pub fn verify_checksum(path: &Path, url: &str, expected: Option<&str>) -> Result<(), TaskError> {
    let Some(expected) = expected else {
        log_debug!("[SDH::Download] No checksum configured for {}", url);
        return Ok(());
    };
    let actual = sha256_of(path)
        .map_err(|e| TaskError::io(format!("hashing {}", path.display()), e))?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        log_debug!("[SDH::Download] Checksum verified for {}", url);
        Ok(())
    } else {
        Err(TaskError::Checksum {
            url: url.to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Unpacks a `.tar.gz` into `dest` (created if missing).
pub fn extract_tar_gz(src: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    let mut archive = Archive::new(GzDecoder::new(File::open(src)?));
    archive.unpack(dest)?;
    log_debug!(
        "[SDH::Download] Unpacked {} into {}",
        src.display(),
        dest.to_string_lossy().cyan()
    );
    Ok(())
}

/// Release archives wrap everything in one top-level directory (`go/`, `nvim-linux-x86_64/`).
/// Returns that directory, or `dir` itself when the archive was flat.
pub fn archive_root(dir: &Path) -> io::Result<PathBuf> {
    let entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .collect();
    match entries.as_slice() {
        [only] if only.is_dir() => Ok(only.clone()),
        _ => Ok(dir.to_path_buf()),
    }
}

/// Finds the shallowest directory under `root` that contains `file_name`.
pub fn find_dir_containing(root: &Path, file_name: &str) -> Option<PathBuf> {
    walkdir::WalkDir::new(root)
        .max_depth(3)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() == file_name)
        .min_by_key(|e| e.depth())
        .and_then(|e| e.path().parent().map(Path::to_path_buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tempfile::TempDir;

    fn build_tarball(dir: &Path) -> PathBuf {
        let staging = dir.join("staging/tmux-3.4");
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("configure"), "#!/bin/sh\n").unwrap();

        let tarball = dir.join("tmux-3.4.tar.gz");
        let encoder = GzEncoder::new(File::create(&tarball).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.append_dir_all("tmux-3.4", &staging).unwrap();
        builder.into_inner().unwrap().finish().unwrap();
        tarball
    }

    #[test]
    fn checksum_is_hex_sha256() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("abc");
        fs::write(&file, "abc").unwrap();
        assert_eq!(
            sha256_of(&file).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(verify_checksum(&file, "file://abc", None).is_ok());
        assert!(matches!(
            verify_checksum(&file, "file://abc", Some("00")),
            Err(TaskError::Checksum { .. })
        ));
    }

    #[test]
    fn unpacked_tarball_exposes_its_root_and_configure_dir() {
        let dir = TempDir::new().unwrap();
        let tarball = build_tarball(dir.path());
        let out = dir.path().join("out");

        extract_tar_gz(&tarball, &out).unwrap();
        let root = archive_root(&out).unwrap();
        assert_eq!(root, out.join("tmux-3.4"));
        assert_eq!(find_dir_containing(&out, "configure"), Some(root));
        assert_eq!(find_dir_containing(&out, "Makefile"), None);
    }
}
