//! Polling helpers for waiting on builds

use std::sync::Arc;

use tokio::{
    sync::broadcast,
    time::{sleep, Instant},
};
use tracing::{debug, info, instrument};

use super::{
    api::JobsClient,
    config::PollingConfig,
    error::{ClientError, Result},
};
use crate::{
    domain::BuildDetail,
    id::{BuildNumber, QueueItemId},
};

/// Polls build status and console output until a build finishes
///
/// All waits started from one watcher stop when its shutdown signal fires.
#[derive(Debug)]
pub struct BuildWatcher {
    api: Arc<JobsClient>,
    config: PollingConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl BuildWatcher {
    /// Create a new watcher
    pub fn new(api: Arc<JobsClient>, config: PollingConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self { api, config, shutdown_tx }
    }

    /// Create a watcher using the client's own polling configuration
    pub fn from_api(api: Arc<JobsClient>) -> Self {
        let config = api.config().polling.clone();
        Self::new(api, config)
    }

    /// Wait for a queued build to be assigned to an executor
    ///
    /// Returns the number of the build the queue item became.
    #[instrument(skip(self), fields(queue_item = %id))]
    pub async fn wait_for_start(&self, id: QueueItemId) -> Result<BuildNumber> {
        let deadline = Instant::now() + self.config.wait_timeout;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            let item = self.api.get_queue_item(id).await?;
            if let Some(number) = item.build_number() {
                debug!(build = %number, "Queue item started");
                return Ok(number);
            }
            if item.cancelled {
                return Err(ClientError::QueueItemCancelled { id: id.value() });
            }
            debug!(why = ?item.why, "Still queued");

            self.pause(deadline, &mut shutdown_rx).await?;
        }
    }

    /// Wait until `number` is no longer building
    ///
    /// A freshly triggered build sits in the queue before it exists, so
    /// not-found responses are retried until the wait times out.
    #[instrument(skip(self), fields(job = %name, build = %number))]
    pub async fn wait_for_completion(&self, name: &str, number: BuildNumber) -> Result<BuildDetail> {
        info!(interval = ?self.config.build_interval, "Waiting for build to finish");

        let deadline = Instant::now() + self.config.wait_timeout;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            match self.api.get_build_details(name, number).await {
                Ok(detail) if !detail.building => {
                    debug!(result = ?detail.result, "Build finished");
                    return Ok(detail);
                },
                Ok(_) => debug!("Build still running"),
                Err(e) if e.is_not_found() => debug!("Build not started yet"),
                Err(e) => return Err(e),
            }

            self.pause(deadline, &mut shutdown_rx).await?;
        }
    }

    /// Stream the console log of a build to `sink` until it ends
    ///
    /// The build may not exist yet, so not-found responses are retried. The
    /// timeout counts from the last time new output arrived, letting long
    /// builds stream for as long as they keep logging. Returns the final log
    /// offset.
    #[instrument(skip(self, sink), fields(job = %name, build = %number))]
    pub async fn follow_log<F>(&self, name: &str, number: BuildNumber, mut sink: F) -> Result<u64>
    where
        F: FnMut(&str),
    {
        let mut deadline = Instant::now() + self.config.wait_timeout;
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut offset = 0;

        loop {
            let chunk = match self.api.get_log_progressive(name, number, offset).await {
                Ok(chunk) => chunk,
                Err(e) if e.is_not_found() => {
                    debug!("Build not started yet");
                    self.pause(deadline, &mut shutdown_rx).await?;
                    continue;
                },
                Err(e) => return Err(e),
            };
            if !chunk.text.is_empty() {
                sink(&chunk.text);
                deadline = Instant::now() + self.config.wait_timeout;
            }
            offset = chunk.next_offset;

            if !chunk.has_more {
                debug!(offset = offset, "Console log complete");
                return Ok(offset);
            }

            self.pause(deadline, &mut shutdown_rx).await?;
        }
    }

    /// Send shutdown signal to stop running waits
    pub fn shutdown(&self) {
        debug!("Sending shutdown signal to build watcher");
        let _ = self.shutdown_tx.send(());
    }

    /// Get a shutdown sender for external shutdown control
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Get current polling configuration
    pub fn config(&self) -> &PollingConfig {
        &self.config
    }

    /// Sleep one polling interval unless the deadline passed or shutdown fired
    async fn pause(&self, deadline: Instant, shutdown_rx: &mut broadcast::Receiver<()>) -> Result<()> {
        if Instant::now() >= deadline {
            return Err(ClientError::Timeout);
        }

        tokio::select! {
            _ = sleep(self.config.build_interval) => Ok(()),
            _ = shutdown_rx.recv() => {
                debug!("Build watcher received shutdown signal");
                Err(ClientError::Cancelled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::client::config::ClientConfig;

    fn test_api() -> Arc<JobsClient> {
        let config = ClientConfig::new("https://ci.example.com", "admin", "test-token");
        Arc::new(JobsClient::new(config).unwrap())
    }

    #[test]
    fn test_watcher_uses_client_polling_config() {
        let watcher = BuildWatcher::from_api(test_api());

        assert_eq!(watcher.config().build_interval, Duration::from_secs(2));
        assert_eq!(watcher.config().wait_timeout, Duration::from_secs(600));
    }

    #[tokio::test]
    async fn test_pause_times_out_after_deadline() {
        let watcher = BuildWatcher::new(test_api(), PollingConfig::default());
        let mut shutdown_rx = watcher.shutdown_sender().subscribe();

        let deadline = Instant::now() - Duration::from_millis(1);
        let result = watcher.pause(deadline, &mut shutdown_rx).await;
        assert!(matches!(result, Err(ClientError::Timeout)));
    }

    #[tokio::test]
    async fn test_pause_cancelled_by_shutdown() {
        let config = PollingConfig {
            build_interval: Duration::from_secs(60),
            wait_timeout: Duration::from_secs(600),
        };
        let watcher = BuildWatcher::new(test_api(), config);
        let mut shutdown_rx = watcher.shutdown_sender().subscribe();

        watcher.shutdown();

        let deadline = Instant::now() + Duration::from_secs(600);
        let result = tokio::time::timeout(
            Duration::from_secs(1),
            watcher.pause(deadline, &mut shutdown_rx),
        )
        .await;
        assert!(matches!(result, Ok(Err(ClientError::Cancelled))));
    }
}
