//! Periodic ingestion scheduler

use super::Ingestor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Convert a configured interval in minutes, clamping to at least one minute
pub fn interval_from_minutes(minutes: i64) -> Duration {
    let minutes = if minutes <= 0 { 1 } else { minutes as u64 };
    Duration::from_secs(minutes * 60)
}

/// Drives an [`Ingestor`] on a fixed interval
///
/// The first pass runs immediately. Ticks that fire while a pass is still
/// running are dropped rather than queued.
pub struct Scheduler {
    ingestor: Arc<Ingestor>,
    interval: Duration,
}

/// Handle to a running scheduler task
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal shutdown and wait for the loop to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Scheduler task panicked");
        }
    }

    /// Whether the scheduler loop has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Scheduler {
    /// Create a scheduler; a zero interval is raised to one minute
    pub fn new(ingestor: Arc<Ingestor>, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            interval_from_minutes(1)
        } else {
            interval
        };
        Self { ingestor, interval }
    }

    /// Get the tick interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the poll loop on the current runtime
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        SchedulerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    /// Run the poll loop until shutdown is signalled
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(interval_secs = self.interval.as_secs(), "Scheduler started");

        loop {
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => break,
                outcome = self.ingestor.run_pass() => {
                    tracing::debug!(?outcome, "Scheduled pass finished");
                }
            }
        }

        tracing::info!("Scheduler stopped");
    }
}

/// Resolve once shutdown is requested; never resolves if the sender is gone
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
