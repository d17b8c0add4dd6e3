// Parsing of one line of menu input.
//
// The parser only classifies tokens; whether `7` or `u:zsh` names a real task is decided
// against the registry at dispatch time.

/// One whitespace-separated token of a multi-item selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// `<id>` or `<key>`.
    Install(String),
    /// `u<id>` or `u:<key>`, carrying the id or key.
    Uninstall(String),
    /// A token that can never name a task (e.g. `u:` or a menu word mixed with items).
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Empty,
    Quit,
    InstallAll,
    UninstallAll,
    Items(Vec<Selector>),
}

/// Classifies a line of operator input.
///
/// `q`, `a`/`all` and `ua` are only recognized as the whole line; mixed with other tokens
/// they are reported back as invalid.
pub fn parse_selection(input: &str) -> Selection {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    match tokens.as_slice() {
        [] => Selection::Empty,
        [only] => match *only {
            "q" | "Q" => Selection::Quit,
            word if word.eq_ignore_ascii_case("a") || word.eq_ignore_ascii_case("all") => {
                Selection::InstallAll
            }
            word if word.eq_ignore_ascii_case("ua") => Selection::UninstallAll,
            token => Selection::Items(vec![parse_token(token)]),
        },
        many => Selection::Items(many.iter().map(|t| parse_token(t)).collect()),
    }
}

fn parse_token(token: &str) -> Selector {
    let lowered = token.to_ascii_lowercase();
    if matches!(lowered.as_str(), "q" | "a" | "all" | "ua") {
        return Selector::Invalid(token.to_string());
    }

    if let Some(key) = lowered.strip_prefix("u:") {
        return if key.is_empty() {
            Selector::Invalid(token.to_string())
        } else {
            Selector::Uninstall(key.to_string())
        };
    }

    // `u7` uninstalls id 7; `ufw` is still the firewall's key.
    if let Some(digits) = lowered.strip_prefix('u') {
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return Selector::Uninstall(digits.to_string());
        }
    }
    Selector::Install(lowered)
}
