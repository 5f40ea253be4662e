//! A running watch session: watcher plus its consumers

use anyhow::{Context, Result};
use settlewatch_core::config::Config;
use settlewatch_notifier::WebhookNotifier;
use settlewatch_watcher::{FileWatcher, WatcherConfig};
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// How long consumers get to drain after the watcher stops
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Watcher started on the configured root, with console and webhook consumers
pub struct WatchSession {
    watcher: FileWatcher,
    consumers: Vec<JoinHandle<()>>,
}

impl WatchSession {
    /// Validate `config` and start watching its root
    pub async fn start(config: &Config) -> Result<Self> {
        config.validate()?;
        config.log_summary();

        let root = config
            .watch
            .root
            .as_deref()
            .context("watch.root is not set")?;

        let mut watcher = FileWatcher::new(WatcherConfig::from_settings(&config.watch))
            .context("Failed to create file watcher")?;

        let mut consumers = vec![
            watcher.notifications().on_message(|message| async move {
                println!("{message}");
            }),
            watcher.notifications().on_ready(|ready| async move {
                println!("File ready: {}", ready.full_path.display());
            }),
        ];

        if let Some(notifier) = WebhookNotifier::from_config(&config.notifier)
            .context("Failed to create webhook notifier")?
        {
            consumers.push(tokio::spawn(notifier.run(watcher.subscribe_ready())));
        }

        watcher
            .watch(root)
            .await
            .with_context(|| format!("Failed to watch {}", root.display()))?;

        Ok(Self { watcher, consumers })
    }

    /// Root this session watches
    pub fn root(&self) -> Option<&Path> {
        self.watcher.watched_root()
    }

    pub fn watcher(&self) -> &FileWatcher {
        &self.watcher
    }

    /// Stop watching and wait for consumers to finish delivering
    pub async fn shutdown(self) -> Result<()> {
        let Self {
            mut watcher,
            consumers,
        } = self;

        watcher.stop().await.context("Failed to stop watcher")?;
        // Dropping the watcher closes the notification channels
        drop(watcher);

        for consumer in consumers {
            match tokio::time::timeout(DRAIN_TIMEOUT, consumer).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Consumer task failed: {e}"),
                Err(_) => warn!(
                    "Consumer did not finish within {} seconds",
                    DRAIN_TIMEOUT.as_secs()
                ),
            }
        }

        info!("Watch session stopped");
        Ok(())
    }
}
