use std::sync::mpsc;
use std::time::Duration;

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::super::playback::{MIN_TICK_INTERVAL, PlayerCommand, PlayerEvent};
use super::{FrameView, ViewerModel};

pub(crate) const INTERVAL_STEP_MS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyAction {
    Command(PlayerCommand),
    Quit,
}

// Space toggles against the worker's live phase.
pub(crate) fn key_action(key: KeyEvent, interval: Duration) -> Option<KeyAction> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(KeyAction::Quit);
    }

    let command = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Some(KeyAction::Quit),
        KeyCode::Char('p') => PlayerCommand::Start,
        KeyCode::Char('s') => PlayerCommand::Stop,
        KeyCode::Char(' ') => PlayerCommand::Toggle,
        KeyCode::Char('r') => PlayerCommand::Rewind,
        KeyCode::Char('+') | KeyCode::Char('=') => {
            PlayerCommand::SetInterval(step_interval(interval, false))
        }
        KeyCode::Char('-') | KeyCode::Char('_') => {
            PlayerCommand::SetInterval(step_interval(interval, true))
        }
        _ => return None,
    };
    Some(KeyAction::Command(command))
}

// `+` slows playback down (longer interval), `-` speeds it up.
pub(crate) fn step_interval(current: Duration, faster: bool) -> u64 {
    let current_ms = current.as_millis() as u64;
    let floor = MIN_TICK_INTERVAL.as_millis() as u64;
    if faster {
        current_ms.saturating_sub(INTERVAL_STEP_MS).max(floor)
    } else {
        current_ms.saturating_add(INTERVAL_STEP_MS)
    }
}

pub(super) fn drain_player_events(rx: &mpsc::Receiver<PlayerEvent>, model: &mut ViewerModel) {
    while let Ok(event) = rx.try_recv() {
        apply_player_event(model, event);
    }
}

pub(crate) fn apply_player_event(model: &mut ViewerModel, event: PlayerEvent) {
    match event {
        PlayerEvent::Frame { snapshot, summary } => {
            model.frames_shown += 1;
            model.frame = Some(FrameView {
                snapshot,
                summary,
                received_at: Local::now(),
            });
        }
        PlayerEvent::Status(report) => model.status = report,
    }
}
