mod actions;
mod render;
mod session;

use std::io;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::info;

use super::playback::{Phase, PlayerEvent, StatusReport, spawn_worker, status_info};
use super::source::{Origin, ProducerManifest, ProducerSnapshots, Snapshot};

use self::actions::drain_player_events;
pub(crate) use self::actions::{KeyAction, key_action};
#[cfg(test)]
pub(crate) use self::actions::{apply_player_event, step_interval};
use self::render::draw_player;
use self::session::PlayerSession;

#[derive(Debug, Clone)]
pub(crate) struct FrameView {
    pub(crate) snapshot: Snapshot,
    pub(crate) summary: String,
    pub(crate) received_at: DateTime<Local>,
}

#[derive(Debug, Clone)]
pub(crate) struct ViewerModel {
    pub(crate) source: String,
    pub(crate) frame: Option<FrameView>,
    pub(crate) frames_shown: usize,
    pub(crate) status: StatusReport,
}

impl ViewerModel {
    pub(crate) fn new(source: String, interval: Duration) -> Self {
        Self {
            source,
            frame: None,
            frames_shown: 0,
            status: StatusReport {
                phase: Phase::Idle,
                position: 0,
                known: 0,
                interval,
                message: status_info("Looking for snapshots..."),
            },
        }
    }
}

pub(crate) fn run_player(origin: Origin, interval: Duration) -> Result<()> {
    info!(source = %origin.describe(), interval_ms = interval.as_millis() as u64, "opening player");
    let (events_tx, events_rx) = mpsc::channel::<PlayerEvent>();
    let handle = spawn_worker(
        ProducerManifest::new(origin.clone()),
        ProducerSnapshots::new(origin.clone()),
        interval,
        events_tx,
    )?;

    let mut session = PlayerSession::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
        .context("failed to initialize terminal backend")?;
    terminal.clear()?;

    let mut model = ViewerModel::new(origin.describe(), interval);

    loop {
        drain_player_events(&events_rx, &mut model);
        terminal.draw(|frame| draw_player(frame, &model))?;

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key_action(key, model.status.interval) {
            Some(KeyAction::Quit) => break,
            Some(KeyAction::Command(command)) => handle.send(command),
            None => {}
        }
    }

    handle.shutdown();
    terminal.show_cursor()?;
    session.leave()?;
    info!(frames = model.frames_shown, "player closed");
    Ok(())
}
