// Data shapes shared across the crate.

// Optional `config.yaml` tuning a run.
pub mod config;
// Outcomes collected for end-of-run reporting.
pub mod execution_log;
// The resolved target account.
pub mod identity;
// Tasks, categories, presence states and refresh policy.
pub mod task;
