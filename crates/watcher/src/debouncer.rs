//! Per-file readiness state machine
//!
//! A [`TrackedFile`] turns the stream of change events for one file name
//! into ready declarations. While a file is `Updating`, every event pushes
//! the deadline out by the current interval. When the deadline passes the
//! file is declared ready and moves to `Settling`. The next event then
//! either continues the same episode (it arrived within the permitted gap)
//! or starts a new one with a longer interval.
//!
//! The type is plain data driven by explicit instants; the registry owns
//! the timer that calls [`TrackedFile::settle`].

use crate::config::DebounceTimings;
use crate::events::FileReady;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::time::Instant;

/// Stand-in deadline for intervals too large to add to an instant
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline_after(now: Instant, interval: Duration) -> Instant {
    now.checked_add(interval).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Phase of a tracked file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// A write episode is in progress and the countdown is running
    Updating,
    /// Ready was declared; waiting to see whether related activity follows
    Settling,
}

/// How an event changed a tracked file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The running countdown was pushed out
    Extended,
    /// Activity shortly after a ready declaration resumed the same episode
    Continued,
    /// Activity long after a ready declaration started a new, longer episode
    Escalated,
}

/// Point-in-time view of a tracked file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    pub name: String,
    pub full_path: PathBuf,
    pub state: FileState,
    pub deadline: Instant,
    pub ready_at: Option<Instant>,
    pub interval: Duration,
    pub ready_count: u64,
}

/// Debounce state for one file name
#[derive(Debug, Clone)]
pub struct TrackedFile {
    name: String,
    full_path: PathBuf,
    state: FileState,
    deadline: Instant,
    ready_at: Option<Instant>,
    interval: Duration,
    ready_count: u64,
}

impl TrackedFile {
    /// Start tracking a file from its first event
    pub fn new(
        name: impl Into<String>,
        full_path: impl Into<PathBuf>,
        now: Instant,
        timings: &DebounceTimings,
    ) -> Self {
        let interval = timings.initial_interval;
        Self {
            name: name.into(),
            full_path: full_path.into(),
            state: FileState::Updating,
            deadline: deadline_after(now, interval),
            ready_at: None,
            interval,
            ready_count: 0,
        }
    }

    /// Apply a change event observed at `now`
    pub fn record_event(
        &mut self,
        full_path: PathBuf,
        now: Instant,
        timings: &DebounceTimings,
    ) -> EventOutcome {
        self.full_path = full_path;

        let outcome = match self.state {
            FileState::Updating => EventOutcome::Extended,
            FileState::Settling if self.within_permitted_gap(now, timings.permitted_gap) => {
                EventOutcome::Continued
            }
            FileState::Settling => {
                self.interval = self.interval.saturating_add(timings.interval_addition);
                EventOutcome::Escalated
            }
        };

        self.state = FileState::Updating;
        // A late-delivered event never moves the deadline backwards
        self.deadline = self.deadline.max(deadline_after(now, self.interval));
        outcome
    }

    fn within_permitted_gap(&self, now: Instant, permitted_gap: Duration) -> bool {
        self.ready_at
            .is_some_and(|ready_at| now.saturating_duration_since(ready_at) <= permitted_gap)
    }

    /// Deadline of the running countdown, if there is one
    pub fn pending_deadline(&self) -> Option<Instant> {
        match self.state {
            FileState::Updating => Some(self.deadline),
            FileState::Settling => None,
        }
    }

    /// Declare the file ready if its countdown has run out by `now`
    ///
    /// Returns `None` while the countdown is still running and for a file
    /// that is already settling, so each episode yields at most one event.
    pub fn settle(&mut self, now: Instant) -> Option<FileReady> {
        if self.state != FileState::Updating || now < self.deadline {
            return None;
        }

        self.state = FileState::Settling;
        self.ready_at = Some(now);
        self.ready_count += 1;

        Some(FileReady {
            full_path: self.full_path.clone(),
            name: self.name.clone(),
            timestamp: SystemTime::now(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    pub fn state(&self) -> FileState {
        self.state
    }

    /// Interval currently applied to new events
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn ready_at(&self) -> Option<Instant> {
        self.ready_at
    }

    pub fn snapshot(&self) -> FileSnapshot {
        FileSnapshot {
            name: self.name.clone(),
            full_path: self.full_path.clone(),
            state: self.state,
            deadline: self.deadline,
            ready_at: self.ready_at,
            interval: self.interval,
            ready_count: self.ready_count,
        }
    }
}
