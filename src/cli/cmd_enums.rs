use clap::Parser;

/// Defines the command-line interface (CLI) for 'setup-devhost'.
/// There are no subcommands: everything else happens in the interactive menu.
#[derive(Parser)]
#[command(name = "setup-devhost")]
#[command(version, about = "Menu-driven provisioning of a Debian/Ubuntu development host")]
pub struct Cli {
    /// Enables detailed debug output for troubleshooting.
    #[arg(short, long, env = "SDH_DEBUG")]
    pub(crate) debug: bool,
}
