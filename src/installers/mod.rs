// This module is the home of every provisioning recipe.
//
// Each submodule implements `Provisioner` once, generically, and exposes one `const`
// instance per tool. The registry (`libs::registry`) binds those instances to menu entries.

/// Building blocks shared by the recipes: root/user scripts and path removal,
/// each optionally best-effort.
pub(crate) mod steps;

/// Plain apt packages plus their system configuration (ufw, fail2ban, build essentials).
pub(crate) mod apt_packages;

/// zsh as the login shell, owning the leading block of the profile.
pub(crate) mod login_shell;

/// Versioned release archives unpacked into `/usr/local/go` and `/opt/nvim`.
pub(crate) mod artifact;

/// Upstream bootstrap scripts run as the target user (rustup, pyenv, nvm, Poetry) or root (starship).
pub(crate) mod bootstrap;

/// tmux compiled from its release tarball.
pub(crate) mod source_build;
