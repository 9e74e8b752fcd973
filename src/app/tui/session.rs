use std::io;

use anyhow::{Context, Result};
use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use tracing::debug;

// Raw mode plus alternate screen for the lifetime of the player. Dropping the
// session restores the terminal even when the draw loop bails out with `?`.
pub(super) struct PlayerSession {
    active: bool,
}

impl PlayerSession {
    pub(super) fn enter() -> Result<Self> {
        enable_raw_mode().context("failed to enable raw mode")?;
        execute!(io::stdout(), EnterAlternateScreen, Hide)
            .context("failed to enter alternate screen")?;
        debug!("terminal session entered");
        Ok(Self { active: true })
    }

    pub(super) fn leave(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode().context("failed to disable raw mode")?;
        execute!(io::stdout(), Show, LeaveAlternateScreen)
            .context("failed to leave alternate screen")?;
        debug!("terminal session restored");
        Ok(())
    }
}

impl Drop for PlayerSession {
    fn drop(&mut self) {
        if self.active {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
        }
    }
}
