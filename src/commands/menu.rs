// This file contains the interactive menu: the only command `setup-devhost` has.
// It resolves who is being provisioned, loads the optional configuration, opens the per-run
// log file and then loops over "show menu, read a line, dispatch" until the operator quits
// or a full install hands the terminal over to the new login shell.

use crate::libs::config_loading::load_config;
use crate::libs::identity::resolve_target_identity;
use crate::libs::paths::{prepare_log_file, resolve_config_path};
use crate::libs::registry::{build_registry, find, install_all_order, uninstall_all_order};
use crate::libs::report::{print_final_summary, print_round_summary, write_report};
use crate::libs::run_context::RunContext;
use crate::libs::selection::{parse_selection, Selection, Selector};
use crate::libs::task_executor::{run_install, run_uninstall};
use crate::libs::utilities::command_runner::SystemRunner;
use crate::libs::utilities::file_operations::chown_path;
use crate::schemas::identity::TargetIdentity;
use crate::schemas::task::Task;
use crate::{log_debug, log_error, log_info, log_warn, logger};
use anyhow::{Context, Result};
use chrono::Local;
use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Input;
use std::env;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Command;

/// Source of operator input. The terminal in production, a script in tests.
pub trait Prompter {
    fn read_line(&mut self, prompt: &str) -> Result<String>;
}

pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .context("reading from the terminal")
    }
}

/// What the loop does after a dispatched round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    Continue,
    Quit,
    HandOff,
}

/// Entry point for `setup-devhost`.
///
/// Everything up to the first prompt is pre-flight: a failure there (not root, unknown
/// account, malformed config) returns an error before anything on the host is changed.
pub fn run(debug: bool) -> Result<()> {
    logger::init(debug);
    log_debug!("Entered menu::run()");

    let identity = resolve_target_identity().context("resolving the account to provision")?;

    let override_path = env::var("SDH_CONFIG_PATH").ok();
    let config_path = resolve_config_path(&identity, override_path.as_deref());
    let config = load_config(&config_path).context("loading configuration")?;

    let log_file = open_log_file(&identity, &config.log_dir);
    let mut ctx = RunContext::new(identity, config, Box::new(SystemRunner), log_file);
    let registry = build_registry();
    let mut prompter = DialoguerPrompter;

    loop {
        render_menu(&registry);
        let line = prompter.read_line("Selection")?;

        let mark = ctx.log.len();
        let started = Local::now();
        let outcome = dispatch(parse_selection(&line), &registry, &mut ctx, &mut prompter)?;
        print_round_summary(ctx.log.since(mark), Local::now() - started);

        match outcome {
            RoundOutcome::Continue => {}
            RoundOutcome::Quit => {
                print_final_summary(&ctx);
                return Ok(());
            }
            RoundOutcome::HandOff => {
                print_final_summary(&ctx);
                return hand_off_to_shell(&ctx.identity);
            }
        }
    }
}

/// Creates the log directory and mirrors logging into this run's file.
/// A log file that cannot be opened only costs the file copy; the run goes on.
fn open_log_file(identity: &TargetIdentity, log_dir: &str) -> Option<PathBuf> {
    let path = match prepare_log_file(identity, log_dir) {
        Ok(path) => path,
        Err(e) => {
            log_warn!("[SDH::Log] Could not prepare log directory: {}", e);
            return None;
        }
    };
    if let Err(e) = logger::attach_log_file(&path) {
        log_warn!(
            "[SDH::Log] Could not open {}: {}",
            path.display().to_string().yellow(),
            e
        );
        return None;
    }
    if let Err(e) = chown_path(&path, identity.uid, identity.gid) {
        log_debug!("[SDH::Log] Could not chown {}: {}", path.display(), e);
    }
    log_info!(
        "[SDH::Log] Logging to {}",
        path.display().to_string().cyan()
    );
    Some(path)
}

fn render_menu(registry: &[Task]) {
    eprintln!();
    eprintln!("{}", "setup-devhost".bright_blue().bold());
    for task in registry {
        eprintln!(
            "  {:>2}) {:<12} {:<30} {}",
            task.id.to_string().bright_yellow(),
            task.key,
            task.label,
            task.category.to_string().dimmed()
        );
    }
    eprintln!();
    eprintln!(
        "  {})  install everything      {}) uninstall everything      {})  quit",
        "a".bright_yellow(),
        "ua".bright_yellow(),
        "q".bright_yellow()
    );
    eprintln!(
        "  {}",
        "Several items at once: '4 7 go'. Uninstall one: 'u7' or 'u:neovim'.".dimmed()
    );
}

/// Executes one parsed line of input against the registry.
pub fn dispatch(
    selection: Selection,
    registry: &[Task],
    ctx: &mut RunContext,
    prompter: &mut dyn Prompter,
) -> Result<RoundOutcome> {
    match selection {
        Selection::Empty => {
            log_info!("[SDH::Menu] Nothing selected");
            Ok(RoundOutcome::Continue)
        }
        Selection::Quit => Ok(RoundOutcome::Quit),
        Selection::InstallAll => install_everything(registry, ctx),
        Selection::UninstallAll => {
            let answer = prompter.read_line("Uninstall every component? [y/N]")?;
            if matches!(answer.trim(), "y" | "Y") {
                for task in uninstall_all_order(registry) {
                    run_uninstall(task, ctx);
                }
            } else {
                log_info!("[SDH::Menu] Uninstall of everything cancelled");
            }
            Ok(RoundOutcome::Continue)
        }
        Selection::Items(selectors) => {
            for selector in selectors {
                match selector {
                    Selector::Install(wanted) => match find(registry, &wanted) {
                        Some(task) => {
                            run_install(task, ctx);
                        }
                        None => reject(ctx, &wanted),
                    },
                    Selector::Uninstall(wanted) => match find(registry, &wanted) {
                        Some(task) => {
                            run_uninstall(task, ctx);
                        }
                        None => reject(ctx, &uninstall_token(&wanted)),
                    },
                    Selector::Invalid(token) => reject(ctx, &token),
                }
            }
            Ok(RoundOutcome::Continue)
        }
    }
}

fn install_everything(registry: &[Task], ctx: &mut RunContext) -> Result<RoundOutcome> {
    let mark = ctx.log.len();
    for task in install_all_order(registry) {
        run_install(task, ctx);
    }

    if let Err(e) = write_report(ctx, registry) {
        log_warn!("[SDH::Report] Could not write the report: {}", e);
    }

    let shell_ready = ctx
        .log
        .since(mark)
        .iter()
        .any(|o| o.key == "zsh" && !o.status.is_failure());
    if ctx.config.handoff_to_shell && shell_ready {
        Ok(RoundOutcome::HandOff)
    } else {
        Ok(RoundOutcome::Continue)
    }
}

fn reject(ctx: &mut RunContext, token: &str) {
    log_error!("[SDH::Menu] Invalid choice: {}", token.red());
    ctx.log.record_invalid(token);
}

fn uninstall_token(wanted: &str) -> String {
    if wanted.chars().all(|c| c.is_ascii_digit()) {
        format!("u{wanted}")
    } else {
        format!("u:{wanted}")
    }
}

/// Replaces this process with a login shell of the target user.
/// Only returns if the exec itself failed.
fn hand_off_to_shell(identity: &TargetIdentity) -> Result<()> {
    log_info!(
        "[SDH::Menu] Starting a login shell for {}",
        identity.user.bold()
    );
    let error = Command::new("runuser").args(["-l", &identity.user]).exec();
    Err(error).with_context(|| format!("starting a login shell for {}", identity.user))
}
