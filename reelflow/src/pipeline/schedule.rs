//! Repeating run driver.

use super::orchestrator::Orchestrator;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Runs an orchestrator repeatedly, waiting `interval` between runs.
///
/// Runs never overlap. [`stop`](Self::stop) takes effect between runs: an
/// in-flight run is allowed to finish.
#[derive(Debug)]
pub struct PipelineScheduler {
    orchestrator: Arc<Orchestrator>,
    interval: Duration,
    runs_completed: Arc<AtomicU64>,
    worker: Mutex<Option<Worker>>,
}

#[derive(Debug)]
struct Worker {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PipelineScheduler {
    /// Creates a stopped scheduler.
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>, interval: Duration) -> Self {
        Self {
            orchestrator,
            interval,
            runs_completed: Arc::new(AtomicU64::new(0)),
            worker: Mutex::new(None),
        }
    }

    /// Returns the interval between runs.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts the run loop. Returns false if it is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        let mut worker = self.worker.lock();
        if worker.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            return false;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.orchestrator),
            self.interval,
            Arc::clone(&self.runs_completed),
            stop_rx,
        ));
        *worker = Some(Worker { stop_tx, handle });
        info!(interval = ?self.interval, "scheduler started");
        true
    }

    /// Stops the run loop and waits for the current run to finish.
    pub async fn stop(&self) {
        let worker = self.worker.lock().take();
        let Some(worker) = worker else {
            return;
        };
        // The loop may already have exited; a closed channel is fine.
        let _ = worker.stop_tx.send(true);
        if let Err(err) = worker.handle.await {
            error!(error = %err, "scheduler task ended abnormally");
        }
        info!(runs = self.runs_completed(), "scheduler stopped");
    }

    /// Returns true while the run loop is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }

    /// Number of runs finished since creation, whatever their outcome.
    #[must_use]
    pub fn runs_completed(&self) -> u64 {
        self.runs_completed.load(Ordering::Acquire)
    }
}

async fn run_loop(
    orchestrator: Arc<Orchestrator>,
    interval: Duration,
    runs_completed: Arc<AtomicU64>,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        if *stop_rx.borrow() {
            break;
        }

        match orchestrator.run().await {
            Ok(summary) => info!(
                run_id = %summary.run_id,
                status = %summary.status,
                published = summary.published(),
                "scheduled run finished"
            ),
            Err(err) => error!(error = %err, "scheduled run failed"),
        }
        runs_completed.fetch_add(1, Ordering::AcqRel);

        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            changed = stop_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPipeline;

    #[tokio::test]
    async fn test_start_and_stop() {
        let pipeline = MockPipeline::new(2);
        let scheduler = PipelineScheduler::new(Arc::new(pipeline.orchestrator()), Duration::from_millis(10));

        assert!(!scheduler.is_running());
        assert!(scheduler.start());
        assert!(scheduler.is_running());
        assert!(!scheduler.start());

        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.stop().await;

        assert!(!scheduler.is_running());
        let runs = scheduler.runs_completed();
        assert!(runs >= 1);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(scheduler.runs_completed(), runs);
    }

    #[tokio::test]
    async fn test_stop_when_not_started() {
        let pipeline = MockPipeline::new(1);
        let scheduler = PipelineScheduler::new(Arc::new(pipeline.orchestrator()), Duration::from_secs(60));
        scheduler.stop().await;
        assert_eq!(scheduler.runs_completed(), 0);
    }

    #[tokio::test]
    async fn test_stop_interrupts_wait() {
        let pipeline = MockPipeline::new(1);
        let scheduler = PipelineScheduler::new(Arc::new(pipeline.orchestrator()), Duration::from_secs(3600));

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(20)).await;
        tokio::time::timeout(Duration::from_secs(5), scheduler.stop())
            .await
            .unwrap();

        assert_eq!(scheduler.runs_completed(), 1);
    }
}
