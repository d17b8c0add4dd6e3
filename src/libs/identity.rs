// Resolves the unprivileged account sitting underneath sudo/doas/pkexec.
//
// The whole process runs as root, but dotfiles, version managers and per-user binaries
// belong to this account. Its home and login shell come from the account database, never
// from `$HOME`, which is stale or caller-controlled inside an escalated environment.

use crate::libs::errors::IdentityError;
use crate::schemas::identity::TargetIdentity;
use crate::{log_debug, log_info};
use colored::Colorize;
use nix::unistd::{geteuid, getuid, Uid, User};
use std::env;

/// The environment variables privilege-escalation wrappers leave behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EscalationIndicators {
    pub sudo_user: Option<String>,
    pub doas_user: Option<String>,
    pub pkexec_uid: Option<String>,
}

impl EscalationIndicators {
    pub fn from_env() -> Self {
        EscalationIndicators {
            sudo_user: env::var("SUDO_USER").ok(),
            doas_user: env::var("DOAS_USER").ok(),
            pkexec_uid: env::var("PKEXEC_UID").ok(),
        }
    }
}

/// Which account to look up in the account database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountRef {
    Name(String),
    Uid(u32),
}

/// Picks the target account from the escalation indicators.
///
/// `SUDO_USER`, then `DOAS_USER`, then `PKEXEC_UID` win in that order; empty values are
/// ignored. With no indicator the invoking account itself (`real_uid`) is the target.
pub fn select_target_account(indicators: &EscalationIndicators, real_uid: u32) -> AccountRef {
    let named = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    if let Some(name) = named(&indicators.sudo_user) {
        return AccountRef::Name(name);
    }
    if let Some(name) = named(&indicators.doas_user) {
        return AccountRef::Name(name);
    }
    if let Some(uid) = named(&indicators.pkexec_uid).and_then(|v| v.parse::<u32>().ok()) {
        return AccountRef::Uid(uid);
    }
    AccountRef::Uid(real_uid)
}

/// Resolves the target identity for this run.
///
/// # Returns
/// * `Err(IdentityError::NotRoot)` when the effective uid is not 0; nothing has been touched yet.
/// * `Err(UnknownAccount | UnknownUid)` when the selected account is not in the database.
pub fn resolve_target_identity() -> Result<TargetIdentity, IdentityError> {
    if !geteuid().is_root() {
        return Err(IdentityError::NotRoot);
    }

    let indicators = EscalationIndicators::from_env();
    log_debug!("[SDH::Identity] Escalation indicators: {:?}", indicators);

    let account = select_target_account(&indicators, getuid().as_raw());
    let user = lookup(&account)?;
    let identity = TargetIdentity {
        user: user.name,
        uid: user.uid.as_raw(),
        gid: user.gid.as_raw(),
        home: user.dir,
        login_shell: user.shell,
    };

    log_info!(
        "[SDH::Identity] Provisioning for {} (uid {}, home {}, login shell {})",
        identity.user.bold(),
        identity.uid,
        identity.home.display().to_string().cyan(),
        identity.login_shell.display()
    );
    if identity.uid == 0 {
        log_info!(
            "[SDH::Identity] No escalation wrapper detected; user-scoped tools will be installed for root"
        );
    }
    Ok(identity)
}

fn lookup(account: &AccountRef) -> Result<User, IdentityError> {
    match account {
        AccountRef::Name(name) => {
            User::from_name(name)?.ok_or_else(|| IdentityError::UnknownAccount(name.clone()))
        }
        AccountRef::Uid(uid) => {
            User::from_uid(Uid::from_raw(*uid))?.ok_or(IdentityError::UnknownUid(*uid))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indicators(sudo: Option<&str>, doas: Option<&str>, pkexec: Option<&str>) -> EscalationIndicators {
        EscalationIndicators {
            sudo_user: sudo.map(String::from),
            doas_user: doas.map(String::from),
            pkexec_uid: pkexec.map(String::from),
        }
    }

    #[test]
    fn sudo_user_names_the_target() {
        let ind = indicators(Some("alice"), Some("bob"), Some("1002"));
        assert_eq!(select_target_account(&ind, 0), AccountRef::Name("alice".into()));
    }

    #[test]
    fn doas_then_pkexec_are_consulted_in_order() {
        assert_eq!(
            select_target_account(&indicators(None, Some("bob"), Some("1002")), 0),
            AccountRef::Name("bob".into())
        );
        assert_eq!(
            select_target_account(&indicators(Some(""), None, Some("1002")), 0),
            AccountRef::Uid(1002)
        );
    }

    #[test]
    fn without_indicators_the_invoking_account_is_the_target() {
        assert_eq!(select_target_account(&indicators(None, None, None), 0), AccountRef::Uid(0));
        assert_eq!(
            select_target_account(&indicators(None, None, Some("not-a-uid")), 1000),
            AccountRef::Uid(1000)
        );
    }

    #[test]
    fn lookup_of_missing_account_is_an_error() {
        let err = lookup(&AccountRef::Name("sdh-no-such-user-xyz".into())).unwrap_err();
        assert!(matches!(err, IdentityError::UnknownAccount(_)));
    }
}
