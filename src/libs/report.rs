// End-of-round and end-of-run reporting: console summaries, the report file written into the
// target's home after a full install, and a small helper script that prints installed versions.

use crate::libs::errors::TaskError;
use crate::libs::paths::{CHECK_SCRIPT, REPORT_FILE};
use crate::libs::run_context::RunContext;
use crate::libs::utilities::file_operations::{set_mode, write_user_file};
use crate::libs::utilities::timestamps::{current_timestamp, format_elapsed};
use crate::schemas::execution_log::TaskOutcome;
use crate::schemas::task::Task;
use crate::{log_error, log_info, log_success, log_warn};
use chrono::TimeDelta;
use colored::Colorize;
use prettytable::{format, row, Table};
use std::path::PathBuf;

/// Outcome table, one row per task invocation.
pub fn outcome_table(outcomes: &[TaskOutcome]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(row!["Task", "Action", "Result"]);
    for outcome in outcomes {
        table.add_row(row![outcome.label, outcome.action, outcome.status]);
    }
    table
}

/// Plain-text report of everything this process did.
pub fn render_report(ctx: &RunContext) -> String {
    let mut report = String::new();
    report.push_str("setup-devhost report\n");
    report.push_str(&format!("Generated: {}\n", current_timestamp()));
    report.push_str(&format!(
        "Account:   {} (uid {}, home {})\n",
        ctx.identity.user,
        ctx.identity.uid,
        ctx.identity.home.display()
    ));
    report.push_str(&format!("Log file:  {}\n\n", ctx.log_file_display()));
    report.push_str(&outcome_table(ctx.log.outcomes()).to_string());

    let failures = ctx.log.failures();
    report.push('\n');
    if failures.is_empty() {
        report.push_str("All tasks completed without failures.\n");
    } else {
        report.push_str(&format!("Failed: {}\n", failures.join(", ")));
    }
    if !ctx.log.invalid_selectors().is_empty() {
        report.push_str(&format!(
            "Ignored selectors: {}\n",
            ctx.log.invalid_selectors().join(" ")
        ));
    }
    report.push_str(&format!(
        "\nRun ~/{CHECK_SCRIPT} to print the installed version of each component.\n"
    ));
    report
}

/// A bash script that runs each task's version command.
pub fn render_check_script(registry: &[Task]) -> String {
    let mut script = String::from(
        "#!/usr/bin/env bash\n\
         # Generated by setup-devhost. Prints the version of each provisioned component.\n\
         check() {\n  \
           local label=\"$1\" cmd=\"$2\" out\n  \
           if out=$(bash -c \"$cmd\" 2>/dev/null) && [ -n \"$out\" ]; then\n    \
             printf '%-28s %s\\n' \"$label\" \"$out\"\n  \
           else\n    \
             printf '%-28s %s\\n' \"$label\" \"not found\"\n  \
           fi\n\
         }\n\n",
    );
    for task in registry {
        if let Some(cmd) = task.version_cmd {
            script.push_str(&format!(
                "check {} {}\n",
                single_quoted(task.label),
                single_quoted(cmd)
            ));
        }
    }
    script
}

fn single_quoted(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// Writes the report and the helper script into the target's home, owned by the target.
pub fn write_report(ctx: &RunContext, registry: &[Task]) -> Result<(PathBuf, PathBuf), TaskError> {
    let report_path = ctx.identity.home_path(REPORT_FILE);
    write_user_file(&ctx.identity, &report_path, &render_report(ctx), true)?;

    let script_path = ctx.identity.home_path(CHECK_SCRIPT);
    write_user_file(&ctx.identity, &script_path, &render_check_script(registry), true)?;
    set_mode(&script_path, 0o755)
        .map_err(|e| TaskError::io(format!("making {} executable", script_path.display()), e))?;

    log_info!(
        "[SDH::Report] Report written to {} (helper: {})",
        report_path.display().to_string().cyan(),
        script_path.display().to_string().cyan()
    );
    Ok((report_path, script_path))
}

/// Printed after every dispatched round.
pub fn print_round_summary(outcomes: &[TaskOutcome], elapsed: TimeDelta) {
    if outcomes.is_empty() {
        return;
    }
    eprintln!();
    outcome_table(outcomes).printstd();
    let failed = outcomes.iter().filter(|o| o.status.is_failure()).count();
    if failed == 0 {
        log_success!(
            "[SDH::Summary] {} task(s) done in {}",
            outcomes.len(),
            format_elapsed(elapsed)
        );
    } else {
        log_warn!(
            "[SDH::Summary] {} of {} task(s) failed ({})",
            failed,
            outcomes.len(),
            format_elapsed(elapsed)
        );
    }
}

/// Printed once, when the operator quits or control is handed to the new shell.
pub fn print_final_summary(ctx: &RunContext) {
    let failures = ctx.log.failures();
    if ctx.log.len() == 0 {
        log_info!("[SDH::Summary] Nothing was run. Bye.");
    } else if failures.is_empty() {
        log_success!(
            "[SDH::Summary] All {} task run(s) succeeded",
            ctx.log.len()
        );
    } else {
        log_error!(
            "[SDH::Summary] Failed: {}",
            failures.join(", ").red()
        );
    }
    log_info!("[SDH::Summary] Full log: {}", ctx.log_file_display().cyan());
}
