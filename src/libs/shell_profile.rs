// Idempotent line-level edits of the target user's shell startup file.
//
// Every operation re-reads the file, so edits made by hand (or by a tool's own installer)
// between two calls are always seen. Whatever is written back is handed to the target
// user's uid/gid.

use crate::libs::errors::ProfileError;
use crate::libs::utilities::file_operations::{chown_path, read_lines, write_lines};
use crate::libs::utilities::timestamps::file_stamp;
use crate::{log_debug, log_info};
use colored::Colorize;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// How a profile line is recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineMatcher {
    /// The line, ignoring surrounding whitespace, equals this text.
    Exact(String),
    /// The line matches this regular expression.
    Pattern(String),
}

enum CompiledMatcher<'a> {
    Exact(&'a str),
    Pattern(Regex),
}

impl CompiledMatcher<'_> {
    fn is_match(&self, line: &str) -> bool {
        match self {
            CompiledMatcher::Exact(text) => line.trim() == *text,
            CompiledMatcher::Pattern(re) => re.is_match(line),
        }
    }
}

impl LineMatcher {
    fn compile(&self) -> Result<CompiledMatcher<'_>, ProfileError> {
        match self {
            LineMatcher::Exact(text) => Ok(CompiledMatcher::Exact(text.trim())),
            LineMatcher::Pattern(pattern) => Regex::new(pattern)
                .map(CompiledMatcher::Pattern)
                .map_err(|source| ProfileError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                }),
        }
    }
}

/// One line a task owns in the profile: how to find it, and what to write when it is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEntry {
    pub matcher: LineMatcher,
    pub content: String,
}

impl ProfileEntry {
    /// An entry recognised by its exact text.
    pub fn line(content: impl Into<String>) -> Self {
        let content = content.into();
        ProfileEntry {
            matcher: LineMatcher::Exact(content.clone()),
            content,
        }
    }

    /// An entry recognised by `pattern`, so older spellings of the same line count as present.
    pub fn matching(pattern: impl Into<String>, content: impl Into<String>) -> Self {
        ProfileEntry {
            matcher: LineMatcher::Pattern(pattern.into()),
            content: content.into(),
        }
    }

    /// The `# --- <name> ---` banner every task's block starts with.
    pub fn banner(name: &str) -> Self {
        ProfileEntry::line(format!("# --- {name} (setup-devhost) ---"))
    }
}

/// The profile document, bound to its path and the account that must own it.
#[derive(Debug, Clone)]
pub struct ShellProfile {
    path: PathBuf,
    owner: Option<(u32, u32)>,
}

impl ShellProfile {
    /// # Arguments
    /// * `path` - Absolute path of the profile file.
    /// * `owner` - `(uid, gid)` to chown to after every write; `None` leaves ownership alone.
    pub fn new(path: PathBuf, owner: Option<(u32, u32)>) -> Self {
        ShellProfile { path, owner }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Appends `content` unless some line already matches.
    ///
    /// `content` may span several lines; a whole block is written in one go this way.
    ///
    /// # Returns
    /// * `Ok(true)` when the line was appended, `Ok(false)` when it was already there.
    pub fn ensure_line_present(
        &self,
        matcher: &LineMatcher,
        content: &str,
    ) -> Result<bool, ProfileError> {
        let compiled = matcher.compile()?;
        let mut lines = self.load()?;
        if lines.iter().any(|l| compiled.is_match(l)) {
            return Ok(false);
        }
        lines.push(content.to_string());
        self.store(&lines)?;
        Ok(true)
    }

    /// Removes every line matching `matcher`.
    ///
    /// # Returns
    /// * The number of lines removed. A missing file removes nothing and is not created.
    pub fn ensure_line_absent(&self, matcher: &LineMatcher) -> Result<usize, ProfileError> {
        if !self.exists() {
            return Ok(0);
        }
        let compiled = matcher.compile()?;
        let lines = self.load()?;
        let before = lines.len();
        let kept: Vec<String> = lines.into_iter().filter(|l| !compiled.is_match(l)).collect();
        let removed = before - kept.len();
        if removed > 0 {
            self.store(&kept)?;
        }
        Ok(removed)
    }

    /// Makes sure a task's block is complete.
    ///
    /// `entries[0]` is the block's banner and owns the lines right below it. Without a banner
    /// the whole block is appended, even if identical lines exist elsewhere: those belong to
    /// the user. A missing member goes directly after the last member already in the block.
    ///
    /// # Returns
    /// * The number of lines inserted.
    pub fn ensure_entries_present(&self, entries: &[ProfileEntry]) -> Result<usize, ProfileError> {
        let Some((banner, members)) = entries.split_first() else {
            return Ok(0);
        };
        let head = banner.matcher.compile()?;
        let compiled = compile_all(members.iter().map(|e| &e.matcher))?;
        let mut lines = self.load()?;

        let Some(start) = lines.iter().position(|l| head.is_match(l)) else {
            let block: Vec<&str> = entries.iter().map(|e| e.content.as_str()).collect();
            self.ensure_line_present(&banner.matcher, &block.join("\n"))?;
            log_debug!(
                "[SDH::Profile] Appended block '{}' to {}",
                banner.content,
                self.path.display().to_string().cyan()
            );
            return Ok(entries.len());
        };

        let mut end = block_end(&lines, start, &compiled);
        let mut anchor = start;
        let mut inserted = 0;
        for (entry, matcher) in members.iter().zip(&compiled) {
            if let Some(found) = (start + 1..end).find(|&i| matcher.is_match(&lines[i])) {
                anchor = found;
                continue;
            }
            anchor += 1;
            lines.insert(anchor, entry.content.clone());
            end += 1;
            inserted += 1;
        }

        if inserted > 0 {
            self.store(&lines)?;
            log_debug!(
                "[SDH::Profile] Inserted {} line(s) into {}",
                inserted,
                self.path.display().to_string().cyan()
            );
        }
        Ok(inserted)
    }

    /// Removes a task's block: every banner copy and the members directly below it.
    /// Matching lines outside a block are the user's and stay.
    pub fn ensure_entries_absent(&self, entries: &[ProfileEntry]) -> Result<usize, ProfileError> {
        let Some((banner, members)) = entries.split_first() else {
            return Ok(0);
        };
        if !self.exists() {
            return Ok(0);
        }
        let (kept, members_removed) = self.without_blocks(banner, members, true)?;
        if members_removed > 0 {
            self.store(&kept)?;
        }
        let removed = members_removed + self.ensure_line_absent(&banner.matcher)?;
        if removed > 0 {
            log_debug!(
                "[SDH::Profile] Removed {} line(s) from {}",
                removed,
                self.path.display().to_string().cyan()
            );
        }
        Ok(removed)
    }

    /// Copies the profile to `<name>.setup-devhost-<stamp>.bak` beside it.
    ///
    /// Nothing is copied when the newest existing backup already has the same contents.
    ///
    /// # Returns
    /// * `Ok(Some(path))` of the backup, or `Ok(None)` when there is no profile to back up.
    pub fn backup(&self) -> Result<Option<PathBuf>, ProfileError> {
        if !self.exists() {
            return Ok(None);
        }
        let current = fs::read(&self.path).map_err(|source| ProfileError::Read {
            path: self.path.clone(),
            source,
        })?;
        if let Some(latest) = self.latest_backup() {
            if fs::read(&latest).is_ok_and(|previous| previous == current) {
                log_debug!(
                    "[SDH::Profile] {} is unchanged since {}",
                    self.path.display(),
                    latest.display()
                );
                return Ok(Some(latest));
            }
        }

        let backup = backup_path_for(&self.path, &file_stamp());
        fs::write(&backup, &current).map_err(|source| ProfileError::Write {
            path: backup.clone(),
            source,
        })?;
        self.hand_over(&backup)?;
        log_info!(
            "[SDH::Profile] Backed up {} to {}",
            self.path.display(),
            backup.display().to_string().cyan()
        );
        Ok(Some(backup))
    }

    /// Removes the block headed by `entries[0]` wherever it is and puts it, fresh, at the top.
    /// Lines outside the block keep their relative order, even when they match a member.
    pub fn rewrite_with_leading_block(&self, entries: &[ProfileEntry]) -> Result<(), ProfileError> {
        let Some((banner, members)) = entries.split_first() else {
            return Ok(());
        };
        let (rest, _) = self.without_blocks(banner, members, false)?;
        let mut lines: Vec<String> = entries.iter().map(|e| e.content.clone()).collect();
        lines.extend(rest);
        self.store(&lines)
    }

    /// The current lines minus the members of every block headed by `banner`.
    /// Banners stay when `keep_banner` is set. Also returns how many members were dropped.
    fn without_blocks(
        &self,
        banner: &ProfileEntry,
        members: &[ProfileEntry],
        keep_banner: bool,
    ) -> Result<(Vec<String>, usize), ProfileError> {
        let head = banner.matcher.compile()?;
        let compiled = compile_all(members.iter().map(|e| &e.matcher))?;
        let lines = self.load()?;

        let mut kept = Vec::with_capacity(lines.len());
        let mut dropped = 0;
        let mut i = 0;
        while i < lines.len() {
            if head.is_match(&lines[i]) {
                let end = block_end(&lines, i, &compiled);
                if keep_banner {
                    kept.push(lines[i].clone());
                }
                dropped += end - i - 1;
                i = end;
            } else {
                kept.push(lines[i].clone());
                i += 1;
            }
        }
        Ok((kept, dropped))
    }

    /// Newest `<name>.setup-devhost-<stamp>.bak` beside the profile. Stamps sort by time.
    fn latest_backup(&self) -> Option<PathBuf> {
        let dir = self.path.parent()?;
        let name = self.path.file_name()?.to_string_lossy().into_owned();
        let prefix = format!("{name}.setup-devhost-");
        fs::read_dir(dir)
            .ok()?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy())
                    .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".bak"))
            })
            .max()
    }

    fn load(&self) -> Result<Vec<String>, ProfileError> {
        read_lines(&self.path).map_err(|source| ProfileError::Read {
            path: self.path.clone(),
            source,
        })
    }

    fn store(&self, lines: &[String]) -> Result<(), ProfileError> {
        write_lines(&self.path, lines).map_err(|source| ProfileError::Write {
            path: self.path.clone(),
            source,
        })?;
        self.hand_over(&self.path)
    }

    fn hand_over(&self, path: &Path) -> Result<(), ProfileError> {
        let Some((uid, gid)) = self.owner else {
            return Ok(());
        };
        chown_path(path, uid, gid).map_err(|source| ProfileError::Ownership {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// End (exclusive) of the block whose banner sits at `start`: the banner plus the lines right
/// after it that each match a member not matched yet.
fn block_end(lines: &[String], start: usize, members: &[CompiledMatcher]) -> usize {
    let mut claimed = vec![false; members.len()];
    let mut end = start + 1;
    while let Some(line) = lines.get(end) {
        match (0..members.len()).find(|&m| !claimed[m] && members[m].is_match(line)) {
            Some(m) => {
                claimed[m] = true;
                end += 1;
            }
            None => break,
        }
    }
    end
}

fn compile_all<'a>(
    matchers: impl Iterator<Item = &'a LineMatcher>,
) -> Result<Vec<CompiledMatcher<'a>>, ProfileError> {
    matchers.map(LineMatcher::compile).collect()
}

/// `~/.zshrc` + `20240101-120000` → `~/.zshrc.setup-devhost-20240101-120000.bak`
pub fn backup_path_for(path: &Path, stamp: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "profile".to_string());
    path.with_file_name(format!("{name}.setup-devhost-{stamp}.bak"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::MetadataExt;
    use tempfile::TempDir;

    fn profile_in(dir: &TempDir, initial: Option<&str>) -> ShellProfile {
        let path = dir.path().join(".zshrc");
        if let Some(text) = initial {
            fs::write(&path, text).unwrap();
        }
        ShellProfile::new(path, None)
    }

    fn contents(profile: &ShellProfile) -> String {
        fs::read_to_string(profile.path()).unwrap_or_default()
    }

    fn go_entries() -> Vec<ProfileEntry> {
        vec![
            ProfileEntry::banner("go"),
            ProfileEntry::line("export PATH=$PATH:/usr/local/go/bin"),
            ProfileEntry::line("export PATH=$PATH:$HOME/go/bin"),
        ]
    }

    #[test]
    fn line_is_written_once_no_matter_how_often_ensured() {
        let dir = TempDir::new().unwrap();
        let profile = profile_in(&dir, Some("export EDITOR=vi\n"));
        let matcher = LineMatcher::Exact("alias vim='nvim'".into());

        assert!(profile.ensure_line_present(&matcher, "alias vim='nvim'").unwrap());
        for _ in 0..3 {
            assert!(!profile.ensure_line_present(&matcher, "alias vim='nvim'").unwrap());
        }
        assert_eq!(contents(&profile), "export EDITOR=vi\nalias vim='nvim'\n");
    }

    #[test]
    fn pattern_matcher_accepts_existing_variants() {
        let dir = TempDir::new().unwrap();
        let profile = profile_in(&dir, Some("eval \"$(starship init zsh)\"   # prompt\n"));
        let matcher = LineMatcher::Pattern(r#"^\s*eval "\$\(starship init zsh\)""#.into());

        assert!(!profile
            .ensure_line_present(&matcher, "eval \"$(starship init zsh)\"")
            .unwrap());
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let dir = TempDir::new().unwrap();
        let profile = profile_in(&dir, Some(""));
        let err = profile
            .ensure_line_present(&LineMatcher::Pattern("(".into()), "x")
            .unwrap_err();
        assert!(matches!(err, ProfileError::InvalidPattern { .. }));
    }

    #[test]
    fn absent_removes_every_duplicate() {
        let dir = TempDir::new().unwrap();
        let profile = profile_in(&dir, Some("a\nalias vim='nvim'\nb\n  alias vim='nvim'\n"));
        let removed = profile
            .ensure_line_absent(&LineMatcher::Exact("alias vim='nvim'".into()))
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(contents(&profile), "a\nb\n");
    }

    #[test]
    fn absent_on_missing_file_does_not_create_it() {
        let dir = TempDir::new().unwrap();
        let profile = profile_in(&dir, None);
        assert_eq!(profile.ensure_entries_absent(&go_entries()).unwrap(), 0);
        assert!(!profile.exists());
    }

    #[test]
    fn missing_group_entry_lands_after_last_present_sibling() {
        let dir = TempDir::new().unwrap();
        let profile = profile_in(
            &dir,
            Some("# --- go (setup-devhost) ---\nexport PATH=$PATH:/usr/local/go/bin\nalias ll='ls -l'\n"),
        );

        assert_eq!(profile.ensure_entries_present(&go_entries()).unwrap(), 1);
        assert_eq!(
            contents(&profile),
            "# --- go (setup-devhost) ---\nexport PATH=$PATH:/usr/local/go/bin\nexport PATH=$PATH:$HOME/go/bin\nalias ll='ls -l'\n"
        );
        assert_eq!(profile.ensure_entries_present(&go_entries()).unwrap(), 0);
    }

    #[test]
    fn install_then_uninstall_restores_the_original_lines() {
        let dir = TempDir::new().unwrap();
        let original = "export EDITOR=vi\n# keep me\n";
        let profile = profile_in(&dir, Some(original));

        profile.ensure_entries_present(&go_entries()).unwrap();
        profile.ensure_entries_present(&go_entries()).unwrap();
        assert_eq!(profile.ensure_entries_absent(&go_entries()).unwrap(), 3);
        assert_eq!(contents(&profile), original);
    }

    #[test]
    fn leading_block_moves_to_top_and_keeps_the_rest() {
        let dir = TempDir::new().unwrap();
        let profile = profile_in(
            &dir,
            Some("alias g=git\n# --- zsh (setup-devhost) ---\nexport ZSH=old\nexport ZSH=mine\n"),
        );
        let block = vec![
            ProfileEntry::banner("zsh"),
            ProfileEntry::matching(r"^export ZSH=", "export ZSH=\"$HOME/.oh-my-zsh\""),
        ];

        profile.rewrite_with_leading_block(&block).unwrap();
        profile.rewrite_with_leading_block(&block).unwrap();
        assert_eq!(
            contents(&profile),
            "# --- zsh (setup-devhost) ---\nexport ZSH=\"$HOME/.oh-my-zsh\"\nalias g=git\nexport ZSH=mine\n"
        );
    }

    #[test]
    fn leading_block_leaves_matching_user_lines_in_place() {
        let dir = TempDir::new().unwrap();
        let original = "alias g=git\nexport HISTSIZE=10000\n";
        let profile = profile_in(&dir, Some(original));
        let block = vec![
            ProfileEntry::banner("zsh"),
            ProfileEntry::line("export HISTSIZE=10000"),
        ];

        profile.rewrite_with_leading_block(&block).unwrap();
        assert_eq!(
            contents(&profile),
            "# --- zsh (setup-devhost) ---\nexport HISTSIZE=10000\nalias g=git\nexport HISTSIZE=10000\n"
        );
        assert_eq!(profile.ensure_entries_absent(&block).unwrap(), 2);
        assert_eq!(contents(&profile), original);
    }

    #[test]
    fn user_copy_of_a_block_line_survives_install_and_uninstall() {
        let dir = TempDir::new().unwrap();
        let original = "export PATH=$PATH:/usr/local/go/bin\nalias ll='ls -l'\n";
        let profile = profile_in(&dir, Some(original));

        assert_eq!(profile.ensure_entries_present(&go_entries()).unwrap(), 3);
        assert_eq!(profile.ensure_entries_absent(&go_entries()).unwrap(), 3);
        assert_eq!(contents(&profile), original);
    }

    #[test]
    fn lines_without_a_banner_are_never_removed() {
        let dir = TempDir::new().unwrap();
        let original = "export PATH=$PATH:/usr/local/go/bin\nexport PATH=$PATH:$HOME/go/bin\n";
        let profile = profile_in(&dir, Some(original));

        assert_eq!(profile.ensure_entries_absent(&go_entries()).unwrap(), 0);
        assert_eq!(contents(&profile), original);
    }

    #[test]
    fn block_ends_at_the_first_repeated_member() {
        let dir = TempDir::new().unwrap();
        let profile = profile_in(
            &dir,
            Some("# --- go (setup-devhost) ---\nexport PATH=$PATH:/usr/local/go/bin\nexport PATH=$PATH:/usr/local/go/bin\n"),
        );

        assert_eq!(profile.ensure_entries_present(&go_entries()).unwrap(), 1);
        assert_eq!(profile.ensure_entries_absent(&go_entries()).unwrap(), 3);
        assert_eq!(contents(&profile), "export PATH=$PATH:/usr/local/go/bin\n");
    }

    #[test]
    fn unchanged_profile_is_not_backed_up_again() {
        let dir = TempDir::new().unwrap();
        let profile = profile_in(&dir, Some("line\n"));
        let first = profile.backup().unwrap().expect("backup made");
        let second = profile.backup().unwrap().expect("backup reused");
        assert_eq!(first, second);

        fs::write(profile.path(), "line\nmore\n").unwrap();
        let third = profile.backup().unwrap().expect("backup made");
        assert_eq!(fs::read_to_string(&third).unwrap(), "line\nmore\n");

        let backups = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".bak"))
            .count();
        assert!(backups <= 2);
    }

    #[test]
    fn backup_copies_current_contents() {
        let dir = TempDir::new().unwrap();
        let profile = profile_in(&dir, Some("line\n"));
        let backup = profile.backup().unwrap().expect("backup made");

        assert_eq!(fs::read_to_string(&backup).unwrap(), "line\n");
        let name = backup.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".zshrc.setup-devhost-") && name.ends_with(".bak"));
        assert!(profile_in(&TempDir::new().unwrap(), None).backup().unwrap().is_none());
    }

    #[test]
    fn writes_are_handed_to_the_owner() {
        let dir = TempDir::new().unwrap();
        let uid = nix::unistd::getuid().as_raw();
        let gid = nix::unistd::getgid().as_raw();
        let profile = ShellProfile::new(dir.path().join(".zshrc"), Some((uid, gid)));

        profile.ensure_entries_present(&go_entries()).unwrap();
        let meta = fs::metadata(profile.path()).unwrap();
        assert_eq!((meta.uid(), meta.gid()), (uid, gid));
    }

    #[test]
    fn backup_name_is_built_beside_the_profile() {
        assert_eq!(
            backup_path_for(Path::new("/home/dev/.zshrc"), "20240101-120000"),
            PathBuf::from("/home/dev/.zshrc.setup-devhost-20240101-120000.bak")
        );
    }
}
