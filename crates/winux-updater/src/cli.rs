//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// winux-update - keep the WINUX binary up to date
#[derive(Parser, Debug)]
#[command(name = "winux-update")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to an update.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Directory holding the WINUX binary (default: next to this executable)
    #[arg(long, global = true, value_name = "DIR")]
    pub install_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check whether a newer release is available
    Check(CheckArgs),

    /// Download, verify and install the latest release
    Apply,

    /// Reinstall the latest release even if it is not newer
    Force,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Run the check in the background after a delay. Without SECS the
    /// configured notification.check-delay-secs is used.
    #[arg(long, value_name = "SECS", num_args = 0..=1)]
    pub delay: Option<Option<u64>>,
}
