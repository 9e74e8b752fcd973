use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, trace};

use super::super::source::{ManifestSource, Snapshot, SnapshotSource};
use super::{PlaybackController, RenderSink, StatusReport, TickScheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlayerCommand {
    Start,
    Stop,
    Toggle,
    SetInterval(u64),
    Rewind,
    Shutdown,
}

impl PlayerCommand {
    fn halts_playback(self) -> bool {
        matches!(self, Self::Stop | Self::Toggle | Self::Shutdown)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum PlayerEvent {
    Frame { snapshot: Snapshot, summary: String },
    Status(StatusReport),
}

struct ChannelSink {
    tx: Sender<PlayerEvent>,
}

impl RenderSink for ChannelSink {
    fn render(&mut self, snapshot: &Snapshot, summary: &str) {
        let _ = self.tx.send(PlayerEvent::Frame {
            snapshot: snapshot.clone(),
            summary: summary.to_string(),
        });
    }

    fn status(&mut self, report: &StatusReport) {
        let _ = self.tx.send(PlayerEvent::Status(report.clone()));
    }
}

pub(crate) struct PlaybackHandle {
    commands: Sender<PlayerCommand>,
    join_handle: Option<JoinHandle<()>>,
}

impl PlaybackHandle {
    pub(crate) fn send(&self, command: PlayerCommand) {
        if self.commands.send(command).is_err() {
            debug!(?command, "playback worker already gone");
        }
    }

    pub(crate) fn shutdown(mut self) {
        self.join();
    }

    fn join(&mut self) {
        let _ = self.commands.send(PlayerCommand::Shutdown);
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        self.join();
    }
}

pub(crate) fn spawn_worker<M, S>(
    manifests: M,
    snapshots: S,
    tick_interval: Duration,
    events: Sender<PlayerEvent>,
) -> Result<PlaybackHandle>
where
    M: ManifestSource + Send + 'static,
    S: SnapshotSource + Send + 'static,
{
    let (commands_tx, commands_rx) = mpsc::channel::<PlayerCommand>();
    let worker = Worker {
        controller: PlaybackController::new(manifests, snapshots, tick_interval),
        commands: commands_rx,
        backlog: VecDeque::new(),
        scheduler: TickScheduler::new(),
        sink: ChannelSink { tx: events },
    };
    let join_handle = thread::Builder::new()
        .name("playback".to_string())
        .spawn(move || worker.run())
        .context("failed to spawn playback worker")?;

    Ok(PlaybackHandle {
        commands: commands_tx,
        join_handle: Some(join_handle),
    })
}

struct Worker<M, S> {
    controller: PlaybackController<M, S>,
    commands: Receiver<PlayerCommand>,
    backlog: VecDeque<PlayerCommand>,
    scheduler: TickScheduler,
    sink: ChannelSink,
}

impl<M: ManifestSource, S: SnapshotSource> Worker<M, S> {
    fn run(mut self) {
        self.controller.probe(&mut self.sink);

        loop {
            let next = match self.backlog.pop_front() {
                Some(command) => Some(command),
                None => match self.scheduler.wait_time(Instant::now()) {
                    Some(wait) => match self.commands.recv_timeout(wait) {
                        Ok(command) => Some(command),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    },
                    None => match self.commands.recv() {
                        Ok(command) => Some(command),
                        Err(_) => break,
                    },
                },
            };

            match next {
                Some(PlayerCommand::Shutdown) => break,
                Some(command) => self.apply(command),
                None => self.run_tick(),
            }
            self.sync_clock();
        }
        debug!("playback worker stopped");
    }

    fn apply(&mut self, command: PlayerCommand) {
        trace!(?command, "playback command");
        match command {
            PlayerCommand::Start => self.start(),
            PlayerCommand::Stop => self.controller.stop(&mut self.sink),
            PlayerCommand::Toggle => {
                if self.controller.state().is_playing() {
                    self.controller.stop(&mut self.sink);
                } else {
                    self.start();
                }
            }
            PlayerCommand::SetInterval(ms) => self.controller.set_interval(ms, &mut self.sink),
            PlayerCommand::Rewind => self.controller.rewind(&mut self.sink),
            PlayerCommand::Shutdown => {}
        }
    }

    fn start(&mut self) {
        if let Err(err) = self.controller.start(&mut self.sink) {
            debug!(error = %err, "start declined");
        }
    }

    fn sync_clock(&mut self) {
        let state = self.controller.state();
        if state.is_playing() {
            self.scheduler.arm(Instant::now(), state.tick_interval);
        } else {
            self.scheduler.disarm();
        }
    }

    fn run_tick(&mut self) {
        if !self.scheduler.begin(Instant::now()) {
            return;
        }

        let Self {
            controller,
            commands,
            backlog,
            sink,
            ..
        } = self;
        let outcome = controller.tick(sink, || {
            while let Ok(command) = commands.try_recv() {
                backlog.push_back(command);
            }
            backlog.iter().any(|command| command.halts_playback())
        });
        trace!(?outcome, "tick finished");

        let state = self.controller.state();
        self.scheduler.complete(Instant::now(), state.tick_interval, state.is_playing());
    }
}
