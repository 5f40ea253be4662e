//! Core file system watcher implementation
//!
//! This module connects the notify crate to the readiness registry: OS
//! callbacks push raw events into a bounded buffer, and a single processor
//! task filters them, checks the paths still exist and dispatches them.

use crate::{
    config::WatcherConfig,
    events::{ChangeKind, DiagnosticMessage, FileReady, RawEvent},
    fanout::Notifications,
    filter::EventFilter,
    registry::ReadinessRegistry,
};
use notify::{
    Config as NotifyConfig, Event as NotifyEvent, EventKind, RecommendedWatcher, RecursiveMode,
    Watcher as NotifyWatcher,
};
use settlewatch_core::error::{Error, Result, ResultExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// Main file system watcher
pub struct FileWatcher {
    /// Configuration
    config: Arc<WatcherConfig>,
    /// File name filter
    filter: Arc<EventFilter>,
    /// Ready and diagnostic channels
    notifications: Notifications,
    /// Per-file trackers
    registry: Arc<ReadinessRegistry>,
    /// Active notify watcher
    watcher: Option<RecommendedWatcher>,
    /// Raw event processor task
    processor: Option<JoinHandle<()>>,
    /// Root being watched
    watched_root: Option<PathBuf>,
}

impl FileWatcher {
    /// Create a new file watcher
    pub fn new(config: WatcherConfig) -> Result<Self> {
        let filter = EventFilter::from_config(&config)?;
        if filter.is_pattern() {
            info!("Filtering file names by pattern");
        } else {
            info!("Filtering file extensions: {:?}", config.file_extensions);
        }
        let notifications = Notifications::new(config.notification_capacity);
        let registry = ReadinessRegistry::new(&config, notifications.clone());

        Ok(Self {
            config: Arc::new(config),
            filter: Arc::new(filter),
            notifications,
            registry: Arc::new(registry),
            watcher: None,
            processor: None,
            watched_root: None,
        })
    }

    /// Notification channels of this watcher
    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    /// Subscribe to ready events
    pub fn subscribe_ready(&self) -> broadcast::Receiver<FileReady> {
        self.notifications.subscribe_ready()
    }

    /// Subscribe to diagnostic messages
    pub fn subscribe_messages(&self) -> broadcast::Receiver<DiagnosticMessage> {
        self.notifications.subscribe_messages()
    }

    /// Registry of tracked files
    pub fn registry(&self) -> &Arc<ReadinessRegistry> {
        &self.registry
    }

    /// Start watching `root` recursively
    pub async fn watch(&mut self, root: impl AsRef<Path>) -> Result<()> {
        let root = root.as_ref().to_path_buf();

        if self.watcher.is_some() {
            return Err(Error::watcher(format!(
                "Already watching {:?}",
                self.watched_root
            )));
        }
        if !root.is_dir() {
            return Err(Error::watcher(format!(
                "Watch root {} does not exist or is not a directory",
                root.display()
            )));
        }

        let (notify_tx, notify_rx) = mpsc::channel(self.config.event_buffer_capacity);

        self.processor = Some(self.start_event_processor(notify_rx));

        let mut watcher = Self::create_notify_watcher(notify_tx)?;
        watcher
            .watch(&root, RecursiveMode::Recursive)
            .context(format!("Failed to watch path {}", root.display()))?;

        info!("Watching folder: {}", root.display());
        self.watcher = Some(watcher);
        self.watched_root = Some(root);
        Ok(())
    }

    /// Create a notify watcher feeding the bounded raw event buffer
    fn create_notify_watcher(tx: mpsc::Sender<NotifyEvent>) -> Result<RecommendedWatcher> {
        let config = NotifyConfig::default().with_compare_contents(false);

        RecommendedWatcher::new(
            move |res: std::result::Result<NotifyEvent, notify::Error>| match res {
                Ok(event) => match tx.try_send(event) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(event)) => {
                        error!("Raw event buffer full, dropping event for {:?}", event.paths);
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        trace!("Event processor stopped, dropping raw event");
                    }
                },
                Err(e) => {
                    error!("Notify error: {}", e);
                }
            },
            config,
        )
        .context("Failed to create watcher")
    }

    /// Start the event processor
    fn start_event_processor(&self, mut notify_rx: mpsc::Receiver<NotifyEvent>) -> JoinHandle<()> {
        let filter = Arc::clone(&self.filter);
        let registry = Arc::clone(&self.registry);

        tokio::spawn(async move {
            while let Some(event) = notify_rx.recv().await {
                trace!("Received notify event: {:?}", event);

                for raw in Self::convert_notify_event(event, &filter).await {
                    registry.dispatch(raw);
                }
            }
            debug!("Event processor stopped");
        })
    }

    /// Convert a notify event into the raw events worth tracking
    async fn convert_notify_event(event: NotifyEvent, filter: &EventFilter) -> Vec<RawEvent> {
        let observed_at = Instant::now();
        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Modify(_) => ChangeKind::Modified,
            _ => return Vec::new(),
        };

        let mut accepted = Vec::new();
        for path in event.paths {
            let Some(raw) = RawEvent::observed_at(path, kind, observed_at) else {
                continue;
            };
            if !filter.accepts(&raw.name) {
                continue;
            }

            match tokio::fs::metadata(&raw.full_path).await {
                Ok(metadata) if metadata.is_dir() => {
                    trace!("Skipping directory: {:?}", raw.full_path);
                }
                Ok(_) => accepted.push(raw),
                Err(e) => {
                    warn!(
                        "Dropping event for {}: cannot inspect path ({e})",
                        raw.full_path.display()
                    );
                }
            }
        }
        accepted
    }

    /// Stop watching
    ///
    /// Raw delivery stops first, queued raw events are drained, and then the
    /// trackers are shut down.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(watcher) = self.watcher.take() else {
            return Ok(());
        };
        drop(watcher);

        if let Some(processor) = self.processor.take() {
            processor.await.context("Event processor failed")?;
        }

        self.registry.shutdown().await;
        self.watched_root = None;
        info!("File watcher stopped");
        Ok(())
    }

    /// Get the currently watched root
    pub fn watched_root(&self) -> Option<&Path> {
        self.watched_root.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};
    use tempfile::TempDir;

    fn setup_test_watcher() -> (TempDir, FileWatcher) {
        let temp_dir = TempDir::new().expect("test setup failed");
        let config = WatcherConfig::builder().add_file_extension(".csv").build();
        let watcher = FileWatcher::new(config).expect("test setup failed");
        (temp_dir, watcher)
    }

    #[tokio::test]
    async fn test_watcher_initialization() {
        let (_temp_dir, watcher) = setup_test_watcher();
        assert!(watcher.watched_root().is_none());
        assert!(watcher.registry().is_empty());
    }

    #[tokio::test]
    async fn test_new_rejects_config_without_filter() {
        assert!(FileWatcher::new(WatcherConfig::default()).is_err());
    }

    #[tokio::test]
    async fn test_watch_path() {
        let (temp_dir, mut watcher) = setup_test_watcher();
        watcher.watch(temp_dir.path()).await.expect("test setup failed");

        assert_eq!(watcher.watched_root(), Some(temp_dir.path()));

        watcher.stop().await.expect("stop");
        assert!(watcher.watched_root().is_none());
    }

    #[tokio::test]
    async fn test_watch_missing_root_fails() {
        let (temp_dir, mut watcher) = setup_test_watcher();
        let missing = temp_dir.path().join("does-not-exist");
        let err = watcher.watch(&missing).await.unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_convert_keeps_create_and_modify_only() {
        let temp_dir = TempDir::new().expect("test setup failed");
        let file = temp_dir.path().join("a.csv");
        std::fs::write(&file, "x").expect("test setup failed");
        let filter = EventFilter::extensions([".csv"]);

        let create = NotifyEvent::new(EventKind::Create(CreateKind::File)).add_path(file.clone());
        let converted = FileWatcher::convert_notify_event(create, &filter).await;
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].kind, ChangeKind::Created);
        assert_eq!(converted[0].name, "a.csv");

        let modify =
            NotifyEvent::new(EventKind::Modify(ModifyKind::Any)).add_path(file.clone());
        let converted = FileWatcher::convert_notify_event(modify, &filter).await;
        assert_eq!(converted[0].kind, ChangeKind::Modified);

        let remove = NotifyEvent::new(EventKind::Remove(RemoveKind::File)).add_path(file.clone());
        assert!(FileWatcher::convert_notify_event(remove, &filter)
            .await
            .is_empty());

        let access = NotifyEvent::new(EventKind::Access(AccessKind::Any)).add_path(file);
        assert!(FileWatcher::convert_notify_event(access, &filter)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_convert_drops_filtered_vanished_and_directories() {
        let temp_dir = TempDir::new().expect("test setup failed");
        let dir = temp_dir.path().join("batch.csv");
        std::fs::create_dir(&dir).expect("test setup failed");
        let other = temp_dir.path().join("notes.txt");
        std::fs::write(&other, "x").expect("test setup failed");
        let vanished = temp_dir.path().join("gone.csv");
        let filter = EventFilter::extensions([".csv"]);

        let event = NotifyEvent::new(EventKind::Modify(ModifyKind::Any))
            .add_path(dir)
            .add_path(other)
            .add_path(vanished);
        assert!(FileWatcher::convert_notify_event(event, &filter)
            .await
            .is_empty());
    }
}
