mod scheduler;
mod worker;

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::source::{Manifest, ManifestSource, Snapshot, SnapshotSource, SourceError};

pub(crate) use scheduler::TickScheduler;
pub(crate) use worker::{PlayerCommand, PlayerEvent, spawn_worker};

pub(crate) const MIN_TICK_INTERVAL: Duration = Duration::from_millis(50);
pub(crate) const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);

pub(crate) fn clamp_interval_ms(ms: u64) -> Duration {
    if ms == 0 {
        return DEFAULT_TICK_INTERVAL;
    }
    Duration::from_millis(ms).max(MIN_TICK_INTERVAL)
}

pub(crate) fn status_info(msg: &str) -> String {
    format!("INFO: {msg}")
}

pub(crate) fn status_error(msg: &str) -> String {
    format!("ERROR: {msg}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Idle,
    Loading,
    Playing,
    Paused,
    Halted,
}

impl Phase {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Loading => "LOADING",
            Self::Playing => "PLAYING",
            Self::Paused => "PAUSED",
            Self::Halted => "FINISHED",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PlaybackState {
    pub(crate) position: usize,
    pub(crate) manifest: Manifest,
    pub(crate) phase: Phase,
    pub(crate) tick_interval: Duration,
}

impl PlaybackState {
    fn new(tick_interval: Duration) -> Self {
        Self {
            position: 0,
            manifest: Manifest::default(),
            phase: Phase::Idle,
            tick_interval,
        }
    }

    pub(crate) fn is_playing(&self) -> bool {
        self.phase == Phase::Playing
    }

    fn exhausted(&self) -> bool {
        self.position >= self.manifest.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StatusReport {
    pub(crate) phase: Phase,
    pub(crate) position: usize,
    pub(crate) known: usize,
    pub(crate) interval: Duration,
    pub(crate) message: String,
}

pub(crate) trait RenderSink {
    fn render(&mut self, snapshot: &Snapshot, summary: &str);

    fn status(&mut self, report: &StatusReport);
}

#[derive(Debug, Error)]
pub(crate) enum PlaybackError {
    #[error("no manifest yet: {0}")]
    ManifestUnavailable(#[source] SourceError),
    #[error("manifest lists no snapshots")]
    NothingToPlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    NotPlaying,
    Rendered { position: usize },
    Skipped { position: usize },
    Discarded { position: usize },
    Grew { known: usize },
    Halted,
}

pub(crate) struct PlaybackController<M, S> {
    manifests: M,
    snapshots: S,
    state: PlaybackState,
    message: String,
}

impl<M: ManifestSource, S: SnapshotSource> PlaybackController<M, S> {
    pub(crate) fn new(manifests: M, snapshots: S, tick_interval: Duration) -> Self {
        Self {
            manifests,
            snapshots,
            state: PlaybackState::new(tick_interval.max(MIN_TICK_INTERVAL)),
            message: status_info("Ready."),
        }
    }

    pub(crate) fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub(crate) fn status_report(&self) -> StatusReport {
        StatusReport {
            phase: self.state.phase,
            position: self.state.position,
            known: self.state.manifest.len(),
            interval: self.state.tick_interval,
            message: self.message.clone(),
        }
    }

    fn announce(&mut self, sink: &mut impl RenderSink, message: String) {
        self.message = message;
        sink.status(&self.status_report());
    }

    // The producer only appends, so a shorter listing is a stale read and the
    // cached manifest is kept.
    fn adopt(&mut self, manifest: Manifest) {
        if manifest.len() >= self.state.manifest.len() {
            self.state.manifest = manifest;
        }
    }

    // Initial discovery when the session opens; never starts playback.
    pub(crate) fn probe(&mut self, sink: &mut impl RenderSink) {
        match self.manifests.refresh() {
            Ok(manifest) => {
                self.adopt(manifest);
                let known = self.state.manifest.len();
                info!(known, "manifest discovered");
                let message = if known == 0 {
                    status_info("No snapshots yet.")
                } else {
                    status_info(&format!("Found {known} snapshots."))
                };
                self.announce(sink, message);
            }
            Err(err) => {
                warn!(error = %err, "initial manifest load failed");
                self.announce(
                    sink,
                    status_error("No manifest yet (start the producer to write snapshots)."),
                );
            }
        }
    }

    pub(crate) fn start(&mut self, sink: &mut impl RenderSink) -> Result<(), PlaybackError> {
        match self.state.phase {
            Phase::Playing | Phase::Loading => return Ok(()),
            Phase::Paused | Phase::Halted => {}
            Phase::Idle if !self.state.manifest.is_empty() => {}
            Phase::Idle => self.load_for_start(sink)?,
        }

        self.state.phase = Phase::Playing;
        info!(position = self.state.position, "playback started");
        self.announce(sink, status_info("Playing..."));
        Ok(())
    }

    fn load_for_start(&mut self, sink: &mut impl RenderSink) -> Result<(), PlaybackError> {
        self.state.phase = Phase::Loading;
        self.announce(sink, status_info("Loading manifest..."));

        let refreshed = self.manifests.refresh();
        self.state.phase = Phase::Idle;
        match refreshed {
            Ok(manifest) => {
                self.adopt(manifest);
                if self.state.manifest.is_empty() {
                    self.announce(sink, status_info("No snapshots yet."));
                    return Err(PlaybackError::NothingToPlay);
                }
                let known = self.state.manifest.len();
                info!(known, "manifest loaded");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "manifest load failed");
                self.announce(
                    sink,
                    status_error("No manifest yet (start the producer to write snapshots)."),
                );
                Err(PlaybackError::ManifestUnavailable(err))
            }
        }
    }

    pub(crate) fn stop(&mut self, sink: &mut impl RenderSink) {
        if !self.state.is_playing() {
            return;
        }
        self.state.phase = Phase::Paused;
        info!(position = self.state.position, "playback paused");
        self.announce(sink, status_info("Paused"));
    }

    pub(crate) fn set_interval(&mut self, ms: u64, sink: &mut impl RenderSink) {
        let interval = clamp_interval_ms(ms);
        if interval == self.state.tick_interval {
            return;
        }
        self.state.tick_interval = interval;
        debug!(interval_ms = interval.as_millis() as u64, "tick interval changed");
        self.announce(
            sink,
            status_info(&format!("Interval set to {} ms.", interval.as_millis())),
        );
    }

    pub(crate) fn rewind(&mut self, sink: &mut impl RenderSink) {
        self.state.position = 0;
        if self.state.phase == Phase::Halted {
            self.state.phase = Phase::Paused;
        }
        info!("playback rewound");
        self.announce(sink, status_info("Rewound to the first snapshot."));
    }

    // One iteration of the playback clock. `stop_requested` is consulted after
    // the fetch returns: a stop that raced the fetch drops the frame and keeps
    // the position, so resuming shows that frame instead of skipping it.
    pub(crate) fn tick(
        &mut self,
        sink: &mut impl RenderSink,
        mut stop_requested: impl FnMut() -> bool,
    ) -> TickOutcome {
        if !self.state.is_playing() {
            return TickOutcome::NotPlaying;
        }

        if self.state.exhausted() {
            return self.poll_for_growth(sink);
        }

        let position = self.state.position;
        let Some(id) = self.state.manifest.get(position).map(str::to_string) else {
            return TickOutcome::NotPlaying;
        };
        debug!(position, id = %id, "fetching snapshot");
        let snapshot = self.snapshots.fetch(&id);

        if stop_requested() {
            debug!(position, "stop arrived during fetch; frame discarded");
            return TickOutcome::Discarded { position };
        }

        self.state.position += 1;
        let outcome = match snapshot {
            Some(snapshot) => {
                sink.render(&snapshot, &snapshot.summary());
                self.message = status_info("Playing...");
                TickOutcome::Rendered { position }
            }
            None => {
                self.message = status_info(&format!("Skipped snapshot {} ({id}).", position + 1));
                TickOutcome::Skipped { position }
            }
        };
        sink.status(&self.status_report());
        outcome
    }

    fn poll_for_growth(&mut self, sink: &mut impl RenderSink) -> TickOutcome {
        let known_before = self.state.manifest.len();
        match self.manifests.refresh() {
            Ok(manifest) => {
                self.adopt(manifest);
                if !self.state.exhausted() {
                    let known = self.state.manifest.len();
                    info!(known, added = known - known_before, "manifest grew");
                    self.announce(sink, status_info(&format!("Found {known} snapshots.")));
                    return TickOutcome::Grew { known };
                }
            }
            Err(err) => warn!(error = %err, "manifest refresh failed; treating as no growth"),
        }

        self.state.phase = Phase::Halted;
        let known = self.state.manifest.len();
        info!(known, "playback reached the end");
        self.announce(
            sink,
            status_info(&format!("Finished: no new snapshots after {known}.")),
        );
        TickOutcome::Halted
    }
}
