use std::time::{Duration, Instant};

// Deadline bookkeeping for the playback clock. The next deadline is only
// computed once the previous tick has completed, so ticks never overlap and a
// slow fetch pushes the following frame back instead of piling ticks up.
#[derive(Debug, Default)]
pub(crate) struct TickScheduler {
    next_due: Option<Instant>,
    in_flight: bool,
}

impl TickScheduler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn arm(&mut self, now: Instant, interval: Duration) {
        if self.next_due.is_none() && !self.in_flight {
            self.next_due = Some(now + interval);
        }
    }

    pub(crate) fn disarm(&mut self) {
        self.next_due = None;
    }

    // None means nothing is scheduled and the caller may block indefinitely.
    pub(crate) fn wait_time(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }

    pub(crate) fn begin(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if !self.in_flight && due <= now => {
                self.next_due = None;
                self.in_flight = true;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn complete(&mut self, now: Instant, interval: Duration, keep_going: bool) {
        self.in_flight = false;
        self.next_due = keep_going.then(|| now + interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(100);

    #[test]
    fn tick_is_not_due_before_the_interval_elapses() {
        let start = Instant::now();
        let mut scheduler = TickScheduler::new();
        scheduler.arm(start, INTERVAL);

        assert_eq!(scheduler.wait_time(start), Some(INTERVAL));
        assert!(!scheduler.begin(start + Duration::from_millis(99)));
        assert!(scheduler.begin(start + INTERVAL));
    }

    #[test]
    fn in_flight_tick_blocks_rearming_until_completion() {
        let start = Instant::now();
        let mut scheduler = TickScheduler::new();
        scheduler.arm(start, INTERVAL);
        assert!(scheduler.begin(start + INTERVAL));

        scheduler.arm(start + INTERVAL, INTERVAL);
        assert_eq!(scheduler.wait_time(start + INTERVAL), None);
        assert!(!scheduler.begin(start + INTERVAL * 5));

        let finished = start + INTERVAL * 3;
        scheduler.complete(finished, INTERVAL, true);
        assert_eq!(scheduler.wait_time(finished), Some(INTERVAL));
        assert!(scheduler.begin(finished + INTERVAL));
    }

    #[test]
    fn completion_without_keep_going_leaves_clock_idle() {
        let start = Instant::now();
        let mut scheduler = TickScheduler::new();
        scheduler.arm(start, INTERVAL);
        assert!(scheduler.begin(start + INTERVAL));

        scheduler.complete(start + INTERVAL, INTERVAL, false);
        assert_eq!(scheduler.wait_time(start + INTERVAL), None);
    }

    #[test]
    fn arming_twice_keeps_the_first_deadline() {
        let start = Instant::now();
        let mut scheduler = TickScheduler::new();
        scheduler.arm(start, INTERVAL);
        scheduler.arm(start + Duration::from_millis(50), INTERVAL);

        assert_eq!(scheduler.wait_time(start), Some(INTERVAL));
        scheduler.disarm();
        assert_eq!(scheduler.wait_time(start), None);
    }
}
