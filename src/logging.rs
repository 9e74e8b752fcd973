use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::paths::log_file_path;

// The player owns the terminal, so it needs the file log. One-shot commands
// fall back to stderr when the file cannot be opened.
pub fn init(cli: &Cli) -> Result<()> {
    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log filter '{}'", cli.log_level))?;

    match open_log_file(cli.log_file.as_deref()) {
        Ok((path, file)) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .try_init()
                .map_err(|err| anyhow!("failed to install log subscriber: {err}"))?;
            tracing::info!(log_file = %path.display(), source = %cli.source, "htplay starting");
        }
        Err(err) if !cli.runs_player() => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .with_target(false)
                .try_init()
                .map_err(|install| anyhow!("failed to install log subscriber: {install}"))?;
            let reason = format!("{err:#}");
            tracing::warn!(error = %reason, "file log unavailable, logging to stderr");
        }
        Err(err) => return Err(err),
    }
    Ok(())
}

fn open_log_file(configured: Option<&Path>) -> Result<(PathBuf, File)> {
    let path = match configured {
        Some(path) => path.to_path_buf(),
        None => log_file_path()?,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    Ok((path, file))
}
