// Core logic of `setup-devhost`, below the command layer.

pub mod config_loading;
pub mod errors;
// Which account is being provisioned.
pub mod identity;
pub mod paths;
// The fixed catalog of tasks and their canonical order.
pub mod registry;
pub mod report;
pub mod run_context;
// Parsing of menu input.
pub mod selection;
// Idempotent edits of the target's shell profile.
pub mod shell_profile;
// The install/uninstall state machine shared by every task.
pub mod task_executor;
#[cfg(test)]
pub mod test_support;
pub mod utilities;
