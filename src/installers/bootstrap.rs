// Tools installed by their upstream bootstrap scripts: starship, rustup, pyenv, nvm, Poetry.
//
// The scripts are external collaborators; we only decide when to run them, as whom, and
// which profile lines they need. Every one of them is told not to edit the profile itself.

use crate::installers::steps::{run_steps, Step};
use crate::libs::errors::TaskError;
use crate::libs::run_context::RunContext;
use crate::libs::shell_profile::ProfileEntry;
use crate::libs::task_executor::Provisioner;
use crate::libs::utilities::command_runner::command_exists;
use crate::schemas::task::PresenceState;

/// A profile line, optionally recognised by a pattern instead of its exact text.
#[derive(Debug, Clone, Copy)]
pub struct ProfileLine {
    pub content: &'static str,
    pub pattern: Option<&'static str>,
}

impl ProfileLine {
    pub const fn exact(content: &'static str) -> Self {
        ProfileLine {
            content,
            pattern: None,
        }
    }

    pub const fn matching(pattern: &'static str, content: &'static str) -> Self {
        ProfileLine {
            content,
            pattern: Some(pattern),
        }
    }

    fn entry(&self) -> ProfileEntry {
        match self.pattern {
            Some(p) => ProfileEntry::matching(p, self.content),
            None => ProfileEntry::line(self.content),
        }
    }
}

pub struct BootstrapRecipe {
    pub name: &'static str,
    /// File whose existence means installed; `~` is the target's home.
    pub marker: &'static str,
    /// Command that also counts as installed when it resolves on the target's PATH.
    pub command: Option<&'static str>,
    /// Config key for `{version}` in the scripts, if the tool is pinned.
    pub version_key: Option<&'static str>,
    pub install: &'static [Step],
    pub uninstall: &'static [Step],
    pub profile_lines: &'static [ProfileLine],
    pub note: Option<&'static str>,
}

pub const STARSHIP: BootstrapRecipe = BootstrapRecipe {
    name: "starship",
    marker: "/usr/local/bin/starship",
    command: Some("starship"),
    version_key: None,
    install: &[Step::root(
        "curl -fsSL https://starship.rs/install.sh | sh -s -- --yes --bin-dir /usr/local/bin",
    )],
    uninstall: &[Step::remove("/usr/local/bin/starship")],
    profile_lines: &[ProfileLine::matching(
        r#"^\s*eval "\$\(starship init zsh\)""#,
        "eval \"$(starship init zsh)\"",
    )],
    note: Some("~/.config/starship.toml, if any, was kept"),
};

pub const RUSTUP: BootstrapRecipe = BootstrapRecipe {
    name: "rustup",
    marker: "~/.cargo/bin/rustup",
    command: Some("rustup"),
    version_key: None,
    install: &[Step::user(
        "curl --proto '=https' --tlsv1.2 -sSf https://sh.rustup.rs | sh -s -- -y --no-modify-path",
    )],
    uninstall: &[Step::user("\"$HOME/.cargo/bin/rustup\" self uninstall -y")],
    profile_lines: &[ProfileLine::exact(". \"$HOME/.cargo/env\"")],
    note: None,
};

pub const PYENV: BootstrapRecipe = BootstrapRecipe {
    name: "pyenv",
    marker: "~/.pyenv/bin/pyenv",
    command: Some("pyenv"),
    version_key: None,
    install: &[Step::user("curl -fsSL https://pyenv.run | bash")],
    uninstall: &[Step::remove("~/.pyenv")],
    profile_lines: &[
        ProfileLine::exact("export PYENV_ROOT=\"$HOME/.pyenv\""),
        ProfileLine::exact("[[ -d $PYENV_ROOT/bin ]] && export PATH=\"$PYENV_ROOT/bin:$PATH\""),
        ProfileLine::matching(r#"^\s*eval "\$\(pyenv init -"#, "eval \"$(pyenv init - zsh)\""),
    ],
    note: Some("Python build dependencies installed through apt were kept"),
};

pub const NVM: BootstrapRecipe = BootstrapRecipe {
    name: "nvm",
    marker: "~/.nvm/nvm.sh",
    command: None,
    version_key: Some("nvm"),
    install: &[Step::user(
        "curl -fsSL https://raw.githubusercontent.com/nvm-sh/nvm/v{version}/install.sh | PROFILE=/dev/null bash",
    )],
    uninstall: &[Step::remove("~/.nvm")],
    profile_lines: &[
        ProfileLine::exact("export NVM_DIR=\"$HOME/.nvm\""),
        ProfileLine::exact("[ -s \"$NVM_DIR/nvm.sh\" ] && \\. \"$NVM_DIR/nvm.sh\""),
    ],
    note: Some("Node versions are removed together with ~/.nvm"),
};

pub const POETRY: BootstrapRecipe = BootstrapRecipe {
    name: "poetry",
    marker: "~/.local/bin/poetry",
    command: Some("poetry"),
    version_key: None,
    install: &[Step::user(
        "curl -sSL https://install.python-poetry.org | python3 -",
    )],
    uninstall: &[Step::user(
        "curl -sSL https://install.python-poetry.org | python3 - --uninstall",
    )],
    profile_lines: &[ProfileLine::exact("export PATH=\"$HOME/.local/bin:$PATH\"")],
    note: None,
};

impl BootstrapRecipe {
    fn version(&self, ctx: &RunContext) -> Result<Option<String>, TaskError> {
        match self.version_key {
            Some(key) => ctx
                .config
                .version_of(key)
                .map(Some)
                .ok_or_else(|| TaskError::MissingVersion(key.to_string())),
            None => Ok(None),
        }
    }
}

impl Provisioner for BootstrapRecipe {
    fn detect(&self, ctx: &RunContext) -> Result<PresenceState, TaskError> {
        let on_path = self
            .command
            .is_some_and(|cmd| command_exists(ctx.runner(), Some(&ctx.identity), cmd));
        if ctx.identity.expand(self.marker).exists() || on_path {
            Ok(PresenceState::Present {
                version: self.version(ctx)?,
            })
        } else {
            Ok(PresenceState::Absent)
        }
    }

    fn install(&self, ctx: &RunContext) -> Result<(), TaskError> {
        let version = self.version(ctx)?;
        run_steps(ctx, self.install, version.as_deref())
    }

    fn uninstall(&self, ctx: &RunContext) -> Result<(), TaskError> {
        let version = self.version(ctx)?;
        run_steps(ctx, self.uninstall, version.as_deref())
    }

    fn profile_effects(&self, _ctx: &RunContext) -> Vec<ProfileEntry> {
        std::iter::once(ProfileEntry::banner(self.name))
            .chain(self.profile_lines.iter().map(ProfileLine::entry))
            .collect()
    }

    fn best_effort_note(&self) -> Option<&'static str> {
        self.note
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::task_executor::{run_install, run_uninstall};
    use crate::libs::test_support::FakeHost;
    use crate::schemas::execution_log::TaskStatus;
    use crate::schemas::task::{Category, RefreshPolicy, Task};
    use std::fs;

    fn task(recipe: BootstrapRecipe) -> Task {
        Task {
            id: 11,
            key: recipe.name,
            label: recipe.name,
            category: Category::DevTool,
            default_refresh: RefreshPolicy::SkipWhenPresent,
            version_cmd: None,
            provisioner: Box::new(recipe),
        }
    }

    #[test]
    fn marker_in_target_home_means_present() {
        let (ctx, _host, home) = FakeHost::context();
        assert!(PYENV.detect(&ctx).unwrap().is_absent());

        fs::create_dir_all(home.path().join(".pyenv/bin")).unwrap();
        fs::write(home.path().join(".pyenv/bin/pyenv"), "").unwrap();
        assert!(!PYENV.detect(&ctx).unwrap().is_absent());
    }

    #[test]
    fn command_on_target_path_means_present() {
        let (ctx, host, _home) = FakeHost::context();
        host.add_command("poetry");

        assert!(!POETRY.detect(&ctx).unwrap().is_absent());
        let lookups = host.calls_matching("command -v poetry");
        assert_eq!(lookups.len(), 1);
        assert!(lookups[0].starts_with("[as dev]"));
    }

    #[test]
    fn nvm_script_runs_as_target_with_pinned_version() {
        let (ctx, host, _home) = FakeHost::context();
        NVM.install(&ctx).unwrap();

        let calls = host.invocations();
        let call = calls.last().unwrap();
        assert!(!call.is_root());
        assert!(call.args[1].contains("nvm-sh/nvm/v0.39.7/install.sh"));
        assert!(call.args[1].contains("PROFILE=/dev/null"));
    }

    #[test]
    fn present_tool_is_skipped_but_profile_reconciled() {
        let (mut ctx, host, home) = FakeHost::context();
        fs::create_dir_all(home.path().join(".nvm")).unwrap();
        fs::write(home.path().join(".nvm/nvm.sh"), "").unwrap();

        assert_eq!(run_install(&task(NVM), &mut ctx), TaskStatus::AlreadyPresent);
        assert!(host.calls_matching("install.sh").is_empty());
        let text = fs::read_to_string(home.path().join(".zshrc")).unwrap();
        assert!(text.contains("export NVM_DIR=\"$HOME/.nvm\""));
    }

    #[test]
    fn uninstall_removes_tree_and_profile_lines() {
        let (mut ctx, _host, home) = FakeHost::context();
        fs::create_dir_all(home.path().join(".pyenv/bin")).unwrap();
        fs::write(home.path().join(".pyenv/bin/pyenv"), "").unwrap();
        fs::write(home.path().join(".zshrc"), "alias ll='ls -l'\n").unwrap();
        run_install(&task(PYENV), &mut ctx);

        assert_eq!(run_uninstall(&task(PYENV), &mut ctx), TaskStatus::Removed);
        assert!(!home.path().join(".pyenv").exists());
        assert_eq!(
            fs::read_to_string(home.path().join(".zshrc")).unwrap(),
            "alias ll='ls -l'\n"
        );
    }

    #[test]
    fn older_pyenv_init_spelling_is_recognised() {
        let (ctx, _host, _home) = FakeHost::context();
        let effects = PYENV.profile_effects(&ctx);
        let profile = ctx.profile();
        fs::write(
            profile.path(),
            "# --- pyenv (setup-devhost) ---\n\
             export PYENV_ROOT=\"$HOME/.pyenv\"\n\
             [[ -d $PYENV_ROOT/bin ]] && export PATH=\"$PYENV_ROOT/bin:$PATH\"\n\
             eval \"$(pyenv init -)\"\n",
        )
        .unwrap();

        assert_eq!(profile.ensure_entries_present(&effects).unwrap(), 0);
        let text = fs::read_to_string(profile.path()).unwrap();
        assert!(!text.contains("pyenv init - zsh"));
    }

    #[test]
    fn uninstall_never_installed_keeps_users_own_path_line() {
        let (mut ctx, _host, home) = FakeHost::context();
        let original = "export PATH=\"$HOME/.local/bin:$PATH\"\nalias g=git\n";
        fs::write(home.path().join(".zshrc"), original).unwrap();

        assert_eq!(run_uninstall(&task(POETRY), &mut ctx), TaskStatus::NotPresent);
        assert_eq!(fs::read_to_string(home.path().join(".zshrc")).unwrap(), original);
    }
}
