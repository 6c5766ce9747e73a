use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "reelforged", about = "Harvest short clips and publish compiled episodes", version)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the whole pipeline: harvest, compile and dispatch.
    Run {
        /// Channels to process; all configured channels when omitted.
        channels: Vec<String>,
    },
    /// Harvest clips for one channel without compiling them.
    Harvest {
        channel: String,
        /// Duration budget in seconds, overriding the channel's configured one.
        #[arg(short, long)]
        budget: Option<u64>,
    },
    /// Compile an existing harvest folder into a single artifact.
    Compile {
        folder: PathBuf,
        /// Channel to queue the artifact under; compile only when omitted.
        #[arg(long)]
        channel: Option<String>,
    },
    /// Publish everything waiting in the batch queue.
    Dispatch,
    /// Report which external tools are available.
    CheckTools,
    /// Load and validate the configuration, then exit.
    Validate,
    /// Print the version and exit.
    Version,
}
