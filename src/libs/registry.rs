// The fixed task catalog.
//
// Position in `build_registry()` is the canonical "install all" order: security first, then
// zsh (which owns the top of the profile), then everything that appends to the profile.

use crate::installers::apt_packages::{ESSENTIALS, FAIL2BAN, UFW};
use crate::installers::artifact::{GO, NEOVIM};
use crate::installers::bootstrap::{NVM, POETRY, PYENV, RUSTUP, STARSHIP};
use crate::installers::login_shell::ZSH;
use crate::installers::source_build::TMUX;
use crate::schemas::task::{Category, RefreshPolicy, Task};

pub fn build_registry() -> Vec<Task> {
    vec![
        Task {
            id: 1,
            key: "ufw",
            label: "UFW firewall",
            category: Category::Security,
            default_refresh: RefreshPolicy::SkipWhenPresent,
            version_cmd: Some("ufw version | head -n1"),
            provisioner: Box::new(UFW),
        },
        Task {
            id: 2,
            key: "fail2ban",
            label: "Fail2ban",
            category: Category::Security,
            default_refresh: RefreshPolicy::SkipWhenPresent,
            version_cmd: Some("fail2ban-client --version | head -n1"),
            provisioner: Box::new(FAIL2BAN),
        },
        Task {
            id: 3,
            key: "essentials",
            label: "Build essentials",
            category: Category::System,
            default_refresh: RefreshPolicy::SkipWhenPresent,
            version_cmd: Some("gcc --version | head -n1"),
            provisioner: Box::new(ESSENTIALS),
        },
        Task {
            id: 4,
            key: "zsh",
            label: "Zsh (login shell)",
            category: Category::Shell,
            default_refresh: RefreshPolicy::SkipWhenPresent,
            version_cmd: Some("zsh --version"),
            provisioner: Box::new(ZSH),
        },
        Task {
            id: 5,
            key: "starship",
            label: "Starship prompt",
            category: Category::Shell,
            default_refresh: RefreshPolicy::SkipWhenPresent,
            version_cmd: Some("starship --version | head -n1"),
            provisioner: Box::new(STARSHIP),
        },
        Task {
            id: 6,
            key: "tmux",
            label: "tmux (from source)",
            category: Category::DevTool,
            default_refresh: RefreshPolicy::SkipWhenPresent,
            version_cmd: Some("tmux -V"),
            provisioner: Box::new(TMUX),
        },
        Task {
            id: 7,
            key: "neovim",
            label: "Neovim",
            category: Category::DevTool,
            default_refresh: RefreshPolicy::SkipWhenPresent,
            version_cmd: Some("/opt/nvim/bin/nvim --version | head -n1"),
            provisioner: Box::new(NEOVIM),
        },
        Task {
            id: 8,
            key: "go",
            label: "Go toolchain",
            category: Category::DevTool,
            default_refresh: RefreshPolicy::SkipWhenPresent,
            version_cmd: Some("/usr/local/go/bin/go version"),
            provisioner: Box::new(GO),
        },
        Task {
            id: 9,
            key: "rustup",
            label: "Rust (rustup)",
            category: Category::DevTool,
            default_refresh: RefreshPolicy::SkipWhenPresent,
            version_cmd: Some("$HOME/.cargo/bin/rustc --version"),
            provisioner: Box::new(RUSTUP),
        },
        Task {
            id: 10,
            key: "pyenv",
            label: "pyenv",
            category: Category::DevTool,
            default_refresh: RefreshPolicy::SkipWhenPresent,
            version_cmd: Some("$HOME/.pyenv/bin/pyenv --version"),
            provisioner: Box::new(PYENV),
        },
        Task {
            id: 11,
            key: "nvm",
            label: "nvm (Node version manager)",
            category: Category::DevTool,
            default_refresh: RefreshPolicy::SkipWhenPresent,
            version_cmd: Some(". \"$HOME/.nvm/nvm.sh\" && nvm --version"),
            provisioner: Box::new(NVM),
        },
        Task {
            id: 12,
            key: "poetry",
            label: "Poetry",
            category: Category::DevTool,
            default_refresh: RefreshPolicy::SkipWhenPresent,
            version_cmd: Some("$HOME/.local/bin/poetry --version"),
            provisioner: Box::new(POETRY),
        },
    ]
}

/// Looks a task up by numeric id or symbolic key.
pub fn find<'a>(registry: &'a [Task], selector: &str) -> Option<&'a Task> {
    if !selector.is_empty() && selector.bytes().all(|b| b.is_ascii_digit()) {
        let id = selector.parse::<u8>().ok()?;
        return registry.iter().find(|t| t.id == id);
    }
    registry
        .iter()
        .find(|t| t.key.eq_ignore_ascii_case(selector))
}

/// Every task, in canonical order.
pub fn install_all_order(registry: &[Task]) -> Vec<&Task> {
    registry.iter().collect()
}

/// Uninstallable tasks, in reverse canonical order.
pub fn uninstall_all_order(registry: &[Task]) -> Vec<&Task> {
    registry.iter().rev().filter(|t| t.can_uninstall()).collect()
}
