use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

pub const DEFAULT_SOURCE: &str = "ui/snapshots";
pub const DEFAULT_INTERVAL_MS: u64 = 500;
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Parser)]
#[command(
    name = "htplay",
    version,
    about = "Replay hash-table snapshots written by an external producer"
)]
pub struct Cli {
    /// Snapshot directory or http(s) base URL holding manifest.json
    #[arg(long, global = true, default_value = DEFAULT_SOURCE)]
    pub source: String,

    /// Delay between frames in milliseconds (minimum 50)
    #[arg(long, global = true, default_value_t = DEFAULT_INTERVAL_MS)]
    pub interval: u64,

    /// Connect/read timeout for HTTP sources in milliseconds
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout: u64,

    /// Log file path (defaults to the user data directory)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Log filter directive, e.g. `debug` or `htplay=trace`
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open the player (default)
    Play,
    /// Print the snapshot identifiers currently listed in the manifest
    List,
    /// Print the summary and bucket grid of one snapshot
    Show {
        /// Manifest index or snapshot identifier
        target: String,
    },
}

impl Cli {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout.max(1))
    }

    pub fn runs_player(&self) -> bool {
        matches!(self.command, None | Some(Command::Play))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_play_and_the_default_open_the_player() {
        assert!(Cli::parse_from(["htplay"]).runs_player());
        assert!(Cli::parse_from(["htplay", "play"]).runs_player());
        assert!(!Cli::parse_from(["htplay", "list"]).runs_player());
        assert!(!Cli::parse_from(["htplay", "show", "3"]).runs_player());
    }
}
