//! Readiness registry
//!
//! Maps each file name to a dedicated tracker task that owns the file's
//! [`TrackedFile`] and its timer. All events for one name go through that
//! task's queue, so transitions for a file never interleave, while files
//! with different names are handled fully in parallel. Trackers live until
//! the registry is shut down.

use crate::config::{DebounceTimings, WatcherConfig};
use crate::debouncer::{EventOutcome, FileSnapshot, TrackedFile};
use crate::events::{FileReady, RawEvent};
use crate::fanout::Notifications;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace, warn};

/// Result of routing one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// First sighting of the name; a tracker was created from this event
    Created,
    /// Handed to the existing tracker for the name
    Forwarded,
    /// The registry is shut down and the event was dropped
    Closed,
}

enum TrackerCommand {
    Event(RawEvent),
    Snapshot(oneshot::Sender<FileSnapshot>),
}

struct TrackerHandle {
    tx: mpsc::UnboundedSender<TrackerCommand>,
    task: JoinHandle<()>,
}

/// Shared, read-only context for tracker tasks
struct TrackerContext {
    timings: DebounceTimings,
    notifications: Notifications,
    log_ready_events: bool,
}

/// Weak reference to one file's tracker
///
/// Holding it does not keep the tracker alive across shutdown.
#[derive(Debug, Clone)]
pub struct FileTracker {
    name: String,
    tx: mpsc::WeakUnboundedSender<TrackerCommand>,
}

impl std::fmt::Debug for TrackerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Event(event) => f.debug_tuple("Event").field(event).finish(),
            Self::Snapshot(_) => f.write_str("Snapshot"),
        }
    }
}

impl FileTracker {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state of the tracked file, or `None` once the tracker stopped
    pub async fn snapshot(&self) -> Option<FileSnapshot> {
        let tx = self.tx.upgrade()?;
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(TrackerCommand::Snapshot(reply_tx)).ok()?;
        drop(tx);
        reply_rx.await.ok()
    }
}

/// Owner of every tracked file in a watch session
pub struct ReadinessRegistry {
    files: DashMap<String, TrackerHandle>,
    context: Arc<TrackerContext>,
    log_raw_events: bool,
    closed: AtomicBool,
}

impl ReadinessRegistry {
    /// Create an empty registry publishing through `notifications`
    pub fn new(config: &WatcherConfig, notifications: Notifications) -> Self {
        Self {
            files: DashMap::new(),
            context: Arc::new(TrackerContext {
                timings: config.timings,
                notifications,
                log_ready_events: config.log_ready_events,
            }),
            log_raw_events: config.log_raw_events,
            closed: AtomicBool::new(false),
        }
    }

    /// Route an event to the tracker for its file name
    ///
    /// This is the lookup-or-create step: the first event for a name creates
    /// its tracker atomically, later events are queued to it in order. Must
    /// be called from within a tokio runtime.
    pub fn dispatch(&self, event: RawEvent) -> Dispatch {
        if self.closed.load(Ordering::Acquire) {
            trace!("Registry closed, dropping event for {}", event.name);
            return Dispatch::Closed;
        }

        if self.log_raw_events {
            info!(
                "ChangeType: {:<9} FileName: {:<50} Path: {}",
                format!("{:?}", event.kind),
                event.name,
                event.full_path.display()
            );
        }

        match self.files.entry(event.name.clone()) {
            Entry::Occupied(entry) => {
                if let Err(mpsc::error::SendError(TrackerCommand::Event(event))) =
                    entry.get().tx.send(TrackerCommand::Event(event))
                {
                    warn!("Tracker for {} is gone, dropping event", event.name);
                }
                Dispatch::Forwarded
            }
            Entry::Vacant(entry) => {
                debug!("Tracking new file: {}", event.name);
                let file = TrackedFile::new(
                    event.name.clone(),
                    event.full_path,
                    event.observed_at,
                    &self.context.timings,
                );
                entry.insert(spawn_tracker(file, Arc::clone(&self.context)));
                Dispatch::Created
            }
        }
    }

    /// Look up the tracker for a file name
    pub fn tracker(&self, name: &str) -> Option<FileTracker> {
        self.files.get(name).map(|handle| FileTracker {
            name: name.to_string(),
            tx: handle.tx.downgrade(),
        })
    }

    /// Number of file names tracked so far
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Stop every tracker
    ///
    /// Events already queued are applied before each tracker exits; running
    /// countdowns are abandoned without a ready event. Later dispatches are
    /// dropped.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);

        let names: Vec<String> = self.files.iter().map(|entry| entry.key().clone()).collect();
        let mut tasks = Vec::with_capacity(names.len());
        for name in names {
            if let Some((_, handle)) = self.files.remove(&name) {
                drop(handle.tx);
                tasks.push((name, handle.task));
            }
        }

        let count = tasks.len();
        for (name, task) in tasks {
            if let Err(e) = task.await {
                warn!("Tracker for {name} ended abnormally: {e}");
            }
        }
        debug!("Readiness registry shut down ({count} trackers)");
    }
}

impl Drop for ReadinessRegistry {
    fn drop(&mut self) {
        for entry in self.files.iter() {
            entry.value().task.abort();
        }
    }
}

fn spawn_tracker(file: TrackedFile, context: Arc<TrackerContext>) -> TrackerHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run_tracker(file, rx, context));
    TrackerHandle { tx, task }
}

/// Sequential owner of one file's state and timer
async fn run_tracker(
    mut file: TrackedFile,
    mut rx: mpsc::UnboundedReceiver<TrackerCommand>,
    context: Arc<TrackerContext>,
) {
    loop {
        let deadline = file.pending_deadline();

        tokio::select! {
            // Queued events are older than any deadline that elapses meanwhile
            biased;

            command = rx.recv() => match command {
                Some(TrackerCommand::Event(event)) => context.apply(&mut file, event),
                Some(TrackerCommand::Snapshot(reply)) => {
                    let _ = reply.send(file.snapshot());
                }
                None => break,
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Some(ready) = file.settle(Instant::now()) {
                    context.announce(ready);
                }
            }
        }
    }

    trace!("Tracker for {} stopped", file.name());
}

impl TrackerContext {
    fn apply(&self, file: &mut TrackedFile, event: RawEvent) {
        match file.record_event(event.full_path, event.observed_at, &self.timings) {
            EventOutcome::Extended => {
                trace!("{}: countdown extended", file.name());
            }
            EventOutcome::Continued => {
                let text = format!("FileName: {} restarting count again.", file.name());
                info!("{text}");
                self.notifications.publish_message(text);
            }
            EventOutcome::Escalated => {
                debug!(
                    "{}: new write episode, interval now {:?}",
                    file.name(),
                    file.interval()
                );
            }
        }
    }

    fn announce(&self, ready: FileReady) {
        if self.log_ready_events {
            info!("File: {:<50} ready.", ready.name);
        }
        self.notifications.publish_ready(ready);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debouncer::FileState;
    use crate::events::ChangeKind;
    use std::time::Duration;
    use tokio::sync::broadcast;
    use tokio::time::timeout;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn registry() -> (ReadinessRegistry, Notifications) {
        let config = WatcherConfig::builder()
            .add_file_extension(".csv")
            .initial_interval(secs(5))
            .interval_addition(secs(1))
            .permitted_gap(secs(60))
            .build();
        let notifications = Notifications::new(64);
        (
            ReadinessRegistry::new(&config, notifications.clone()),
            notifications,
        )
    }

    fn event(path: &str) -> RawEvent {
        RawEvent::new(path, ChangeKind::Modified).expect("path has a file name")
    }

    async fn next_ready(rx: &mut broadcast::Receiver<FileReady>) -> FileReady {
        timeout(secs(600), rx.recv())
            .await
            .expect("ready event within timeout")
            .expect("channel open")
    }

    fn assert_near(actual: Duration, expected: Duration) {
        let delta = actual.abs_diff(expected);
        assert!(
            delta < Duration::from_millis(50),
            "expected ~{expected:?}, got {actual:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_event_becomes_ready_after_interval() {
        let (registry, notifications) = registry();
        let mut ready_rx = notifications.subscribe_ready();
        let start = Instant::now();

        assert_eq!(registry.dispatch(event("/in/a.csv")), Dispatch::Created);

        let ready = next_ready(&mut ready_rx).await;
        assert_eq!(ready.name, "a.csv");
        assert_near(start.elapsed(), secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_into_one_ready() {
        let (registry, notifications) = registry();
        let mut ready_rx = notifications.subscribe_ready();
        let start = Instant::now();

        registry.dispatch(event("/in/a.csv"));
        tokio::time::sleep(secs(3)).await;
        assert_eq!(registry.dispatch(event("/in/a.csv")), Dispatch::Forwarded);

        next_ready(&mut ready_rx).await;
        assert_near(start.elapsed(), secs(8));

        // Nothing else for this episode
        tokio::time::sleep(secs(120)).await;
        assert!(ready_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_many_events_within_interval_yield_single_ready() {
        let (registry, notifications) = registry();
        let mut ready_rx = notifications.subscribe_ready();
        let start = Instant::now();

        for _ in 0..10 {
            registry.dispatch(event("/in/a.csv"));
            tokio::time::sleep(secs(4)).await;
        }

        // Last event at t=36
        next_ready(&mut ready_rx).await;
        assert_near(start.elapsed(), secs(41));
        tokio::time::sleep(secs(30)).await;
        assert!(ready_rx.try_recv().is_err());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_up_within_gap_restarts_countdown() {
        let (registry, notifications) = registry();
        let mut ready_rx = notifications.subscribe_ready();
        let mut message_rx = notifications.subscribe_messages();
        let start = Instant::now();

        tokio::time::sleep(secs(5)).await;
        registry.dispatch(event("/in/a.csv"));
        next_ready(&mut ready_rx).await;
        assert_near(start.elapsed(), secs(10));

        tokio::time::sleep_until(start + secs(40)).await;
        registry.dispatch(event("/in/a.csv"));

        let message = timeout(secs(1), message_rx.recv())
            .await
            .expect("diagnostic raised")
            .expect("channel open");
        assert_eq!(message.text, "FileName: a.csv restarting count again.");
        assert!(ready_rx.try_recv().is_err());

        next_ready(&mut ready_rx).await;
        assert_near(start.elapsed(), secs(45));

        let snapshot = registry
            .tracker("a.csv")
            .expect("tracked")
            .snapshot()
            .await
            .expect("tracker running");
        assert_eq!(snapshot.interval, secs(5));
        assert_eq!(snapshot.ready_count, 2);
        assert_eq!(snapshot.state, FileState::Settling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_gap_escalates_interval() {
        let (registry, notifications) = registry();
        let mut ready_rx = notifications.subscribe_ready();
        let mut message_rx = notifications.subscribe_messages();
        let start = Instant::now();

        tokio::time::sleep(secs(5)).await;
        registry.dispatch(event("/in/a.csv"));
        next_ready(&mut ready_rx).await;

        tokio::time::sleep_until(start + secs(100)).await;
        registry.dispatch(event("/in/a.csv"));

        let tracker = registry.tracker("a.csv").expect("tracked");
        let snapshot = tracker.snapshot().await.expect("tracker running");
        assert_eq!(snapshot.interval, secs(6));
        assert_eq!(snapshot.state, FileState::Updating);

        next_ready(&mut ready_rx).await;
        assert_near(start.elapsed(), secs(106));
        assert!(message_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_files_are_independent() {
        let (registry, notifications) = registry();
        let mut ready_rx = notifications.subscribe_ready();
        let start = Instant::now();

        registry.dispatch(event("/in/a.csv"));
        tokio::time::sleep(secs(1)).await;
        registry.dispatch(event("/in/b.csv"));
        tokio::time::sleep(secs(2)).await;
        registry.dispatch(event("/in/b.csv"));

        // b's activity does not hold a back, and a's ready does not touch b
        let first = next_ready(&mut ready_rx).await;
        assert_eq!(first.name, "a.csv");
        assert_near(start.elapsed(), secs(5));

        let second = next_ready(&mut ready_rx).await;
        assert_eq!(second.name, "b.csv");
        assert_near(start.elapsed(), secs(8));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_name_in_different_directories_is_merged() {
        let (registry, notifications) = registry();
        let mut ready_rx = notifications.subscribe_ready();

        assert_eq!(registry.dispatch(event("/in/x/a.csv")), Dispatch::Created);
        assert_eq!(registry.dispatch(event("/in/y/a.csv")), Dispatch::Forwarded);

        let ready = next_ready(&mut ready_rx).await;
        assert_eq!(ready.full_path, std::path::PathBuf::from("/in/y/a.csv"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_dispatch_creates_one_tracker() {
        let (registry, notifications) = registry();
        let registry = Arc::new(registry);
        let mut ready_rx = notifications.subscribe_ready();

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                registry.dispatch(event("/in/a.csv"))
            }));
        }

        let mut created = 0;
        for task in tasks {
            if task.await.expect("dispatch task") == Dispatch::Created {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(registry.len(), 1);

        next_ready(&mut ready_rx).await;
        tokio::time::sleep(secs(30)).await;
        assert!(ready_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_trackers_without_ready() {
        let (registry, notifications) = registry();
        let mut ready_rx = notifications.subscribe_ready();

        registry.dispatch(event("/in/a.csv"));
        let tracker = registry.tracker("a.csv").expect("tracked");

        registry.shutdown().await;
        assert!(registry.is_empty());
        assert!(tracker.snapshot().await.is_none());
        assert_eq!(registry.dispatch(event("/in/b.csv")), Dispatch::Closed);

        tokio::time::sleep(secs(30)).await;
        assert!(ready_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_keeps_tracker_alive() {
        let config = WatcherConfig::builder()
            .add_file_extension(".csv")
            .initial_interval(Duration::MAX)
            .build();
        let registry = ReadinessRegistry::new(&config, Notifications::new(8));

        assert_eq!(registry.dispatch(event("/in/a.csv")), Dispatch::Created);
        assert_eq!(registry.dispatch(event("/in/a.csv")), Dispatch::Forwarded);

        let snapshot = registry
            .tracker("a.csv")
            .expect("tracked")
            .snapshot()
            .await
            .expect("tracker still running");
        assert_eq!(snapshot.state, FileState::Updating);
        assert_eq!(snapshot.interval, Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_name_has_no_tracker() {
        let (registry, _notifications) = registry();
        assert!(registry.tracker("missing.csv").is_none());
        assert!(registry.is_empty());
    }
}
