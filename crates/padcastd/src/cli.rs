use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

#[derive(Debug, Subcommand, PartialEq)]
pub(crate) enum Command {
    /// Replay a scripted device session through the registry.
    Replay {
        /// The script to replay
        script: PathBuf,
        /// Dispatcher config file
        #[clap(short, long)]
        config: Option<PathBuf>,
        /// Drop frames for devices that are not attached
        #[clap(long)]
        strict: bool,
        /// Keep device records current with every frame
        #[clap(long)]
        track_state: bool,
        /// Replay the script in a loop until interrupted
        #[clap(short, long)]
        repeat: bool,
    },
    /// Validate a script and print a summary.
    Check {
        /// The script to check
        script: PathBuf,
    },
}

/// Controller state fan-out for streaming clients.
#[derive(Parser)]
#[command(version, about, long_about = None)]
pub(crate) struct Cli {
    /// Turn debugging information on
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// The command to run
    #[clap(subcommand)]
    pub command: Command,
}
