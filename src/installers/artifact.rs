// Versioned release archives unpacked into a fixed system location (Go, Neovim).
//
// The install directory is replaced wholesale on every install, so a previous version never
// leaks files into the new one. A stamp file inside it records the version we put there.

use crate::installers::steps::{run_steps, Step};
use crate::libs::errors::TaskError;
use crate::libs::run_context::RunContext;
use crate::libs::shell_profile::ProfileEntry;
use crate::libs::task_executor::Provisioner;
use crate::libs::utilities::downloads::{archive_root, download_file, extract_tar_gz, verify_checksum};
use crate::libs::utilities::file_operations::remove_path;
use crate::libs::utilities::platform::{detect_architecture, go_arch, neovim_arch};
use crate::libs::utilities::versions::classify;
use crate::schemas::task::PresenceState;
use crate::{log_debug, log_info};
use colored::Colorize;
use std::fs;
use std::path::Path;

/// Name of the version stamp written into the install directory.
pub const STAMP_FILE: &str = ".setup-devhost-version";

pub struct ArtifactRecipe {
    /// Key into the configured versions and checksums.
    pub component: &'static str,
    /// Download URL with `{version}` and `{release_arch}` placeholders.
    pub url_template: &'static str,
    /// Maps the canonical architecture to the project's own spelling.
    pub release_arch: fn(&str) -> Option<&'static str>,
    pub install_dir: &'static str,
    /// Executable inside `install_dir` whose presence means "installed".
    pub binary: &'static str,
    pub profile_lines: &'static [&'static str],
    pub after_install: &'static [Step],
    pub note: Option<&'static str>,
}

pub const GO: ArtifactRecipe = ArtifactRecipe {
    component: "go",
    url_template: "https://go.dev/dl/go{version}.linux-{release_arch}.tar.gz",
    release_arch: go_arch,
    install_dir: "/usr/local/go",
    binary: "bin/go",
    profile_lines: &[
        "export PATH=$PATH:/usr/local/go/bin",
        "export PATH=$PATH:$HOME/go/bin",
    ],
    after_install: &[],
    note: Some("modules and binaries under ~/go were kept"),
};

pub const NEOVIM: ArtifactRecipe = ArtifactRecipe {
    component: "neovim",
    url_template: "https://github.com/neovim/neovim/releases/download/v{version}/nvim-linux-{release_arch}.tar.gz",
    release_arch: neovim_arch,
    install_dir: "/opt/nvim",
    binary: "bin/nvim",
    profile_lines: &["export PATH=\"$PATH:/opt/nvim/bin\"", "alias vim='nvim'"],
    after_install: &[
        Step::user(
            "if [ ! -e \"{home}/.config/nvim\" ]; then mkdir -p \"{home}/.config\" && git clone --depth 1 \"{neovim_starter_repo}\" \"{home}/.config/nvim\" && touch \"{home}/.config/nvim/.setup-devhost-starter\"; fi",
        )
        .best_effort(),
        Step::user(
            "if [ -f \"{home}/.config/nvim/.setup-devhost-starter\" ]; then rm -rf \"{home}/.config/nvim/.git\" \"{home}/.config/nvim/.setup-devhost-starter\"; fi",
        )
        .best_effort(),
    ],
    note: Some("~/.config/nvim was kept"),
};

impl ArtifactRecipe {
    fn wanted_version(&self, ctx: &RunContext) -> Result<String, TaskError> {
        ctx.config
            .version_of(self.component)
            .ok_or_else(|| TaskError::MissingVersion(self.component.to_string()))
    }

    pub fn download_url(&self, version: &str, arch: &str) -> Result<String, TaskError> {
        let release_arch =
            (self.release_arch)(arch).ok_or_else(|| TaskError::UnsupportedArch(arch.to_string()))?;
        Ok(self
            .url_template
            .replace("{version}", version)
            .replace("{release_arch}", release_arch))
    }

    /// State of an install directory against `wanted`.
    pub fn detect_in(&self, install_dir: &Path, wanted: &str) -> PresenceState {
        if !install_dir.join(self.binary).is_file() {
            return PresenceState::Absent;
        }
        let stamp = fs::read_to_string(install_dir.join(STAMP_FILE))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        classify(stamp.as_deref(), wanted)
    }
}

/// Replaces `install_dir` with the unpacked archive root and stamps it with `version`.
///
/// `unpacked_root` must be on the same filesystem as `install_dir` (it is moved, not copied).
pub fn install_archive(unpacked_root: &Path, install_dir: &Path, version: &str) -> Result<(), TaskError> {
    if remove_path(install_dir)
        .map_err(|e| TaskError::io(format!("removing previous {}", install_dir.display()), e))?
    {
        log_debug!("[SDH::Artifact] Removed previous {}", install_dir.display());
    }
    fs::rename(unpacked_root, install_dir).map_err(|e| {
        TaskError::io(
            format!("moving {} to {}", unpacked_root.display(), install_dir.display()),
            e,
        )
    })?;
    fs::write(install_dir.join(STAMP_FILE), format!("{version}\n"))
        .map_err(|e| TaskError::io(format!("stamping {}", install_dir.display()), e))
}

impl Provisioner for ArtifactRecipe {
    fn detect(&self, ctx: &RunContext) -> Result<PresenceState, TaskError> {
        let wanted = self.wanted_version(ctx)?;
        Ok(self.detect_in(Path::new(self.install_dir), &wanted))
    }

    fn install(&self, ctx: &RunContext) -> Result<(), TaskError> {
        let version = self.wanted_version(ctx)?;
        let url = self.download_url(&version, &detect_architecture())?;
        let install_dir = Path::new(self.install_dir);
        let parent = install_dir.parent().unwrap_or(Path::new("/"));
        fs::create_dir_all(parent)
            .map_err(|e| TaskError::io(format!("creating {}", parent.display()), e))?;

        // Staged beside the destination so the final move is a rename.
        let staging = tempfile::Builder::new()
            .prefix(".setup-devhost-")
            .tempdir_in(parent)
            .map_err(|e| TaskError::io(format!("staging in {}", parent.display()), e))?;
        let archive = staging.path().join("archive.tar.gz");
        download_file(&url, &archive)?;
        verify_checksum(&archive, &url, ctx.config.checksum_for(self.component))?;

        let unpacked = staging.path().join("unpacked");
        extract_tar_gz(&archive, &unpacked)
            .map_err(|e| TaskError::io(format!("unpacking {url}"), e))?;
        let root = archive_root(&unpacked)
            .map_err(|e| TaskError::io(format!("reading {}", unpacked.display()), e))?;

        install_archive(&root, install_dir, &version)?;
        log_info!(
            "[SDH::Artifact] {} {} installed into {}",
            self.component.bold(),
            version,
            install_dir.display().to_string().cyan()
        );
        run_steps(ctx, self.after_install, Some(&version))
    }

    fn uninstall(&self, _ctx: &RunContext) -> Result<(), TaskError> {
        let install_dir = Path::new(self.install_dir);
        remove_path(install_dir)
            .map_err(|e| TaskError::io(format!("removing {}", install_dir.display()), e))?;
        Ok(())
    }

    fn profile_effects(&self, _ctx: &RunContext) -> Vec<ProfileEntry> {
        std::iter::once(ProfileEntry::banner(self.component))
            .chain(self.profile_lines.iter().map(|l| ProfileEntry::line(*l)))
            .collect()
    }

    fn best_effort_note(&self) -> Option<&'static str> {
        self.note
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_release(dir: &Path, binary: &str) -> std::path::PathBuf {
        let root = dir.join("unpacked/go");
        fs::create_dir_all(root.join("bin")).unwrap();
        fs::write(root.join(binary), "#!/bin/sh\n").unwrap();
        root
    }

    #[test]
    fn urls_use_each_projects_arch_spelling() {
        assert_eq!(
            GO.download_url("1.22.5", "x86_64").unwrap(),
            "https://go.dev/dl/go1.22.5.linux-amd64.tar.gz"
        );
        assert_eq!(
            NEOVIM.download_url("0.11.0", "aarch64").unwrap(),
            "https://github.com/neovim/neovim/releases/download/v0.11.0/nvim-linux-arm64.tar.gz"
        );
        assert!(matches!(
            GO.download_url("1.22.5", "s390x"),
            Err(TaskError::UnsupportedArch(_))
        ));
    }

    #[test]
    fn install_archive_replaces_prior_contents_and_stamps_version() {
        let dir = TempDir::new().unwrap();
        let install_dir = dir.path().join("go");
        fs::create_dir_all(install_dir.join("bin")).unwrap();
        fs::write(install_dir.join("leftover"), "old").unwrap();

        let root = fake_release(dir.path(), "bin/go");
        install_archive(&root, &install_dir, "1.22.5").unwrap();

        assert!(!install_dir.join("leftover").exists());
        assert_eq!(
            GO.detect_in(&install_dir, "1.22.5"),
            PresenceState::Present {
                version: Some("1.22.5".into())
            }
        );
        assert!(matches!(
            GO.detect_in(&install_dir, "1.23.0"),
            PresenceState::Stale { .. }
        ));
    }

    #[test]
    fn binary_without_stamp_is_stale_and_empty_dir_absent() {
        let dir = TempDir::new().unwrap();
        assert_eq!(GO.detect_in(dir.path(), "1.22.5"), PresenceState::Absent);

        fs::create_dir_all(dir.path().join("bin")).unwrap();
        fs::write(dir.path().join("bin/go"), "").unwrap();
        assert!(matches!(
            GO.detect_in(dir.path(), "1.22.5"),
            PresenceState::Stale { found: None, .. }
        ));
    }

    #[test]
    fn neovim_profile_block_carries_the_vim_alias() {
        let (ctx, _host, _home) = crate::libs::test_support::FakeHost::context();
        let effects = NEOVIM.profile_effects(&ctx);
        assert_eq!(effects[0], ProfileEntry::banner("neovim"));
        assert!(effects.iter().any(|e| e.content == "alias vim='nvim'"));
    }
}
