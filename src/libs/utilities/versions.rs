// Version comparison between what a version command reports and what the config wants.

use crate::schemas::task::PresenceState;
use semver::Version;

/// Parses loosely formatted versions: `go1.22.5`, `v0.10.2`, `3.4`, `tmux 3.3a`.
///
/// Missing minor/patch components become zero; trailing letters are dropped.
pub fn parse_lenient(raw: &str) -> Option<Version> {
    let start = raw.find(|c: char| c.is_ascii_digit())?;
    let core: String = raw[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let mut parts = core.trim_end_matches('.').split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().map_or(Some(0), |p| p.parse().ok())?;
    let patch = parts.next().map_or(Some(0), |p| p.parse().ok())?;
    Some(Version::new(major, minor, patch))
}

/// Classifies a found version against the wanted one.
///
/// A newer version than wanted counts as present; versions that cannot be parsed are
/// compared as plain strings.
pub fn classify(found: Option<&str>, wanted: &str) -> PresenceState {
    let Some(found) = found else {
        return PresenceState::Stale {
            found: None,
            wanted: wanted.to_string(),
        };
    };

    let satisfied = match (parse_lenient(found), parse_lenient(wanted)) {
        (Some(f), Some(w)) => f >= w,
        _ => found.trim() == wanted.trim(),
    };
    if satisfied {
        PresenceState::Present {
            version: Some(found.to_string()),
        }
    } else {
        PresenceState::Stale {
            found: Some(found.to_string()),
            wanted: wanted.to_string(),
        }
    }
}
