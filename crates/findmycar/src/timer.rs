//! Parking countdown timer.
//!
//! [`CountdownTimer`] is a small state machine:
//!
//! ```text
//! Idle --start--> Running --tick (remaining == 0)--> Expired
//!                    |
//!                    +--stop--> Stopped
//! ```
//!
//! `Expired` and `Stopped` go straight back to `Running` on the next `start`.
//! Remaining time is always recomputed from the injected clock, so ticks can
//! be late or skipped without drifting.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

use crate::clock::Clock;

/// Remaining time at which the one-off warning fires (15 minutes).
pub const WARNING_THRESHOLD_SECS: u64 = 15 * 60;

/// Cadence of the periodic tick while the timer runs.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Errors raised by the countdown timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimerError {
    /// Durations must be at least one second.
    #[error("duration must be at least 1 second")]
    InvalidDuration,
}

/// Lifecycle phase of the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerPhase {
    /// Never started.
    #[default]
    Idle,
    /// Counting down.
    Running,
    /// Ran out of time.
    Expired,
    /// Stopped by the user before expiry.
    Stopped,
}

impl fmt::Display for TimerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Expired => write!(f, "expired"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Something worth telling the user about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Remaining time dropped to the warning threshold.
    Warning {
        /// Seconds left when the warning fired.
        remaining_secs: u64,
    },
    /// Time is up; the timer has stopped itself.
    Expired,
}

/// A point-in-time view of a running timer, for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerSnapshot {
    /// Seconds left.
    pub remaining_secs: u64,
    /// Total duration in seconds.
    pub duration_secs: u64,
    /// How much of the duration has elapsed, 0 to 100.
    pub progress_percent: f64,
}

impl TimerSnapshot {
    /// Remaining time as `m:ss`.
    #[must_use]
    pub fn remaining_display(&self) -> String {
        format_remaining(self.remaining_secs)
    }
}

#[derive(Debug, Clone, Copy)]
struct Run {
    started_at: Instant,
    duration: Duration,
    warning_fired: bool,
}

/// Countdown against a parking time limit.
#[derive(Debug)]
pub struct CountdownTimer {
    clock: Arc<dyn Clock>,
    phase: TimerPhase,
    run: Option<Run>,
}

impl CountdownTimer {
    /// Create an idle timer reading time from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            phase: TimerPhase::Idle,
            run: None,
        }
    }

    /// Start (or restart) the countdown.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::InvalidDuration`] if `duration_secs` is zero; the
    /// timer is left as it was.
    pub fn start(&mut self, duration_secs: u64) -> Result<(), TimerError> {
        if duration_secs < 1 {
            return Err(TimerError::InvalidDuration);
        }

        self.run = Some(Run {
            started_at: self.clock.instant(),
            duration: Duration::from_secs(duration_secs),
            warning_fired: false,
        });
        self.phase = TimerPhase::Running;
        info!(duration_secs, "Parking timer started");
        Ok(())
    }

    /// Advance the state machine to "now".
    ///
    /// Returns at most one event. No-op unless running.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if self.phase != TimerPhase::Running {
            return None;
        }
        let remaining = self.remaining_seconds();
        let run = self.run.as_mut()?;

        if remaining == 0 {
            self.run = None;
            self.phase = TimerPhase::Expired;
            info!("Parking timer expired");
            return Some(TimerEvent::Expired);
        }

        if remaining <= WARNING_THRESHOLD_SECS && !run.warning_fired {
            run.warning_fired = true;
            debug!(remaining, "Parking timer warning threshold reached");
            return Some(TimerEvent::Warning {
                remaining_secs: remaining,
            });
        }

        None
    }

    /// Stop a running countdown. Does nothing in any other phase.
    pub fn stop(&mut self) {
        if self.phase != TimerPhase::Running {
            return;
        }
        self.run = None;
        self.phase = TimerPhase::Stopped;
        info!("Parking timer stopped");
    }

    /// Seconds left, rounded up to the next whole second; 0 unless running.
    ///
    /// Any fraction of a second still to go counts as a full second, so the
    /// warning and expiry never fire before their moment.
    #[must_use]
    pub fn remaining_seconds(&self) -> u64 {
        match (self.phase, &self.run) {
            (TimerPhase::Running, Some(run)) => {
                let elapsed = self
                    .clock
                    .instant()
                    .saturating_duration_since(run.started_at);
                let remaining = run.duration.saturating_sub(elapsed);
                remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
            }
            _ => 0,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    /// Check if the timer is counting down.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    /// Whether the warning has fired in the current run.
    #[must_use]
    pub fn warning_fired(&self) -> bool {
        self.run.is_some_and(|run| run.warning_fired)
    }

    /// Duration of the current run in seconds.
    #[must_use]
    pub fn duration_seconds(&self) -> Option<u64> {
        self.run.map(|run| run.duration.as_secs())
    }

    /// Display snapshot of the current run, if running.
    #[must_use]
    pub fn snapshot(&self) -> Option<TimerSnapshot> {
        let duration_secs = self.duration_seconds()?;
        let remaining_secs = self.remaining_seconds();
        #[allow(clippy::cast_precision_loss)]
        let progress_percent =
            (duration_secs - remaining_secs) as f64 / duration_secs as f64 * 100.0;
        Some(TimerSnapshot {
            remaining_secs,
            duration_secs,
            progress_percent: progress_percent.clamp(0.0, 100.0),
        })
    }
}

/// Format seconds as `m:ss` (minutes are not wrapped into hours).
#[must_use]
pub fn format_remaining(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn timer() -> (CountdownTimer, ManualClock) {
        let clock = ManualClock::new();
        (CountdownTimer::new(Arc::new(clock.clone())), clock)
    }

    /// Tick once per simulated second until `secs` have passed, collecting events.
    fn run_for(timer: &mut CountdownTimer, clock: &ManualClock, secs: u64) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        for _ in 0..secs {
            clock.advance_secs(1);
            events.extend(timer.tick());
        }
        events
    }

    #[test]
    fn test_new_timer_is_idle() {
        let (timer, _) = timer();
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert_eq!(timer.remaining_seconds(), 0);
        assert!(timer.snapshot().is_none());
    }

    #[test]
    fn test_start_rejects_zero() {
        let (mut timer, _) = timer();
        assert_eq!(timer.start(0), Err(TimerError::InvalidDuration));
        assert_eq!(timer.phase(), TimerPhase::Idle);
    }

    #[test]
    fn test_start_runs() {
        let (mut timer, clock) = timer();
        timer.start(3600).unwrap();

        assert!(timer.is_running());
        assert_eq!(timer.remaining_seconds(), 3600);

        clock.advance_secs(600);
        assert_eq!(timer.remaining_seconds(), 3000);
    }

    #[test]
    fn test_expires_exactly_once_for_various_durations() {
        for duration in [1, 2, 59, 900, 901, 3600] {
            let (mut timer, clock) = timer();
            timer.start(duration).unwrap();

            let events = run_for(&mut timer, &clock, duration + 5);
            let expired = events
                .iter()
                .filter(|e| **e == TimerEvent::Expired)
                .count();

            assert_eq!(expired, 1, "duration {duration}");
            assert_eq!(timer.phase(), TimerPhase::Expired);
            assert_eq!(timer.remaining_seconds(), 0);
        }
    }

    #[test]
    fn test_expiry_after_jump() {
        let (mut timer, clock) = timer();
        timer.start(120).unwrap();

        clock.advance_secs(120);
        assert_eq!(timer.tick(), Some(TimerEvent::Expired));
        assert_eq!(timer.tick(), None);
    }

    #[test]
    fn test_warning_fires_once_at_threshold() {
        let (mut timer, clock) = timer();
        timer.start(1000).unwrap();

        // 99 seconds in: 901 left, no warning yet.
        let events = run_for(&mut timer, &clock, 99);
        assert!(events.is_empty());
        assert!(!timer.warning_fired());

        // One more second crosses to 900.
        let events = run_for(&mut timer, &clock, 1);
        assert_eq!(
            events,
            vec![TimerEvent::Warning {
                remaining_secs: 900
            }]
        );
        assert!(timer.warning_fired());

        // Nothing else until expiry.
        let events = run_for(&mut timer, &clock, 899);
        assert!(events.is_empty());

        let events = run_for(&mut timer, &clock, 1);
        assert_eq!(events, vec![TimerEvent::Expired]);
    }

    #[test]
    fn test_partial_second_left_does_not_expire() {
        let (mut timer, clock) = timer();
        timer.start(2).unwrap();

        clock.advance(Duration::from_millis(1500));
        assert_eq!(timer.remaining_seconds(), 1);
        assert_eq!(timer.tick(), None);
        assert_eq!(timer.phase(), TimerPhase::Running);

        clock.advance(Duration::from_millis(499));
        assert_eq!(timer.tick(), None);

        clock.advance(Duration::from_millis(1));
        assert_eq!(timer.tick(), Some(TimerEvent::Expired));
    }

    #[test]
    fn test_warning_waits_for_threshold_to_be_reached() {
        let (mut timer, clock) = timer();
        timer.start(1000).unwrap();

        // 900.5 seconds still to go.
        clock.advance(Duration::from_millis(99_500));
        assert_eq!(timer.remaining_seconds(), 901);
        assert_eq!(timer.tick(), None);
        assert!(!timer.warning_fired());

        clock.advance(Duration::from_millis(500));
        assert_eq!(
            timer.tick(),
            Some(TimerEvent::Warning {
                remaining_secs: 900
            })
        );
    }

    #[test]
    fn test_short_duration_warns_on_first_tick() {
        let (mut timer, _clock) = timer();
        timer.start(600).unwrap();

        assert_eq!(
            timer.tick(),
            Some(TimerEvent::Warning {
                remaining_secs: 600
            })
        );
        assert_eq!(timer.tick(), None);
    }

    #[test]
    fn test_restart_resets_warning() {
        let (mut timer, clock) = timer();
        timer.start(600).unwrap();
        assert!(timer.tick().is_some());
        clock.advance_secs(600);
        assert_eq!(timer.tick(), Some(TimerEvent::Expired));

        timer.start(300).unwrap();
        assert!(!timer.warning_fired());
        assert!(matches!(timer.tick(), Some(TimerEvent::Warning { .. })));
    }

    #[test]
    fn test_stop_from_running() {
        let (mut timer, clock) = timer();
        timer.start(3600).unwrap();
        clock.advance_secs(10);

        timer.stop();

        assert_eq!(timer.phase(), TimerPhase::Stopped);
        assert_eq!(timer.remaining_seconds(), 0);
        assert!(timer.duration_seconds().is_none());
        assert_eq!(timer.tick(), None);
    }

    #[test]
    fn test_stop_is_noop_when_not_running() {
        let (mut timer, clock) = timer();
        timer.stop();
        assert_eq!(timer.phase(), TimerPhase::Idle);

        timer.start(1).unwrap();
        clock.advance_secs(1);
        timer.tick();
        timer.stop();
        assert_eq!(timer.phase(), TimerPhase::Expired);
    }

    #[test]
    fn test_ticks_ignore_late_delivery() {
        let (mut timer, clock) = timer();
        timer.start(3600).unwrap();

        // A backgrounded process misses half an hour of ticks.
        clock.advance_secs(1800);
        assert!(timer.tick().is_none());
        assert_eq!(timer.remaining_seconds(), 1800);
    }

    #[test]
    fn test_snapshot_progress() {
        let (mut timer, clock) = timer();
        timer.start(200).unwrap();
        clock.advance_secs(50);

        let snap = timer.snapshot().unwrap();
        assert_eq!(snap.remaining_secs, 150);
        assert_eq!(snap.duration_secs, 200);
        assert!((snap.progress_percent - 25.0).abs() < f64::EPSILON);
        assert_eq!(snap.remaining_display(), "2:30");
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(0), "0:00");
        assert_eq!(format_remaining(59), "0:59");
        assert_eq!(format_remaining(900), "15:00");
        assert_eq!(format_remaining(7261), "121:01");
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(TimerPhase::Idle.to_string(), "idle");
        assert_eq!(TimerPhase::Running.to_string(), "running");
        assert_eq!(TimerPhase::Expired.to_string(), "expired");
        assert_eq!(TimerPhase::Stopped.to_string(), "stopped");
    }
}
