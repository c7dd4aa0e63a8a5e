use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rip, encode and tag an album described by an album data file
    Rip {
        /// Album data file (JSON)
        #[arg(short, long)]
        album: PathBuf,

        /// First track to rip
        #[arg(short, long)]
        begin: Option<u32>,

        /// Last track to rip (defaults to the last track, or to --begin if given)
        #[arg(short, long)]
        end: Option<u32>,

        /// Reuse tracks that were already ripped by an earlier run
        #[arg(long = "continue")]
        continue_rip: bool,

        /// Keep the rip directory after a successful rip
        #[arg(long)]
        keep_ripdir: bool,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Validate the configuration and locate the external programs
    Check,

    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write the default configuration to the configuration path
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
