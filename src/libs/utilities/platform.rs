// Our custom logging macros to give us nicely formatted (and colored!) output.
use crate::log_warn;
use colored::Colorize;

/// Detects the current machine's CPU architecture as a canonical string ("x86_64" or "arm64").
///
/// `std::env::consts::ARCH` is the architecture this binary was compiled for, which on the
/// hosts we provision is the architecture of the machine itself.
pub fn detect_architecture() -> String {
    normalize_arch(std::env::consts::ARCH)
}

/// Normalizes the many spellings of a CPU architecture into "x86_64" / "arm64".
///
/// # Arguments
/// * `arch`: An input string (e.g., "AARCH64", "x86_64", "amd64").
///
/// # Returns
/// * `String`: The normalized architecture, or the lowercase input when it is not a known alias.
pub fn normalize_arch(arch: &str) -> String {
    match arch.to_lowercase().as_str() {
        "aarch64" | "arm64" => "arm64".to_string(),
        "amd64" | "x86_64" => "x86_64".to_string(),
        other => {
            log_warn!(
                "[SDH::Platform] Unknown ARCH variant '{}', using as-is. Release downloads may not exist for it.",
                other.purple()
            );
            other.to_string()
        }
    }
}

/// Maps a canonical architecture to the spelling Go release archives use.
///
/// # Returns
/// * `Some("amd64")` / `Some("arm64")`, or `None` for architectures Go does not publish.
pub fn go_arch(arch: &str) -> Option<&'static str> {
    match normalize_arch(arch).as_str() {
        "x86_64" => Some("amd64"),
        "arm64" => Some("arm64"),
        _ => None,
    }
}

/// Maps a canonical architecture to the spelling Neovim release archives use.
pub fn neovim_arch(arch: &str) -> Option<&'static str> {
    match normalize_arch(arch).as_str() {
        "x86_64" => Some("x86_64"),
        "arm64" => Some("arm64"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_arch_folds_aliases() {
        assert_eq!(normalize_arch("AARCH64"), "arm64");
        assert_eq!(normalize_arch("amd64"), "x86_64");
        assert_eq!(normalize_arch("riscv64"), "riscv64");
    }

    #[test]
    fn release_spellings_differ_per_project() {
        assert_eq!(go_arch("x86_64"), Some("amd64"));
        assert_eq!(neovim_arch("aarch64"), Some("arm64"));
        assert_eq!(go_arch("armv7l"), None);
    }
}
