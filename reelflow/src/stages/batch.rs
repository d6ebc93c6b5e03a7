//! Bounded, order-preserving per-item execution shared by adapters.

use crate::core::ItemResult;
use crate::errors::{ServiceUnavailable, StageFault};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::num::NonZeroUsize;
use std::time::Duration;
use tracing::{debug, warn};

/// Runs a per-item operation over a batch.
///
/// At most `max_concurrency` items are in flight; results come back in input
/// order regardless of completion order. Item errors become
/// [`ItemResult::Failed`] and are logged, never returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRunner {
    max_concurrency: usize,
    item_timeout: Option<Duration>,
}

impl Default for BatchRunner {
    fn default() -> Self {
        let parallelism = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
        Self::new(parallelism)
    }
}

impl BatchRunner {
    /// Creates a runner with the given concurrency bound (minimum 1).
    #[must_use]
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            item_timeout: None,
        }
    }

    /// Creates a runner that processes one item at a time.
    #[must_use]
    pub fn sequential() -> Self {
        Self::new(1)
    }

    /// Fails any item that takes longer than `timeout`.
    #[must_use]
    pub fn with_item_timeout(mut self, timeout: Duration) -> Self {
        self.item_timeout = Some(timeout);
        self
    }

    /// Sets or clears the per-item timeout.
    #[must_use]
    pub fn with_optional_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.item_timeout = timeout;
        self
    }

    /// Returns the concurrency bound.
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Returns the per-item timeout, if any.
    #[must_use]
    pub fn item_timeout(&self) -> Option<Duration> {
        self.item_timeout
    }

    async fn execute<I, O, F, Fut>(&self, inputs: impl IntoIterator<Item = I>, op: F) -> Vec<anyhow::Result<O>>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = anyhow::Result<O>>,
    {
        let timeout = self.item_timeout;
        let pending: Vec<_> = inputs
            .into_iter()
            .map(|input| {
                let fut = op(input);
                async move {
                    match timeout {
                        Some(limit) => tokio::time::timeout(limit, fut)
                            .await
                            .unwrap_or_else(|_| Err(anyhow::anyhow!("timed out after {limit:?}"))),
                        None => fut.await,
                    }
                }
            })
            .collect();

        stream::iter(pending).buffered(self.max_concurrency).collect().await
    }

    fn report<O>(stage: &str, results: &[ItemResult<O>]) {
        for (index, result) in results.iter().enumerate() {
            if let Some(cause) = result.cause() {
                warn!(stage, index, cause, "item failed");
            }
        }
        debug!(
            stage,
            total = results.len(),
            succeeded = results.iter().filter(|r| r.is_success()).count(),
            "batch finished"
        );
    }

    /// Applies `op` to every input and returns one result per input, in order.
    pub async fn run<I, O, F, Fut>(
        &self,
        stage: &str,
        inputs: impl IntoIterator<Item = I>,
        op: F,
    ) -> Vec<ItemResult<O>>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = anyhow::Result<O>>,
    {
        let results: Vec<ItemResult<O>> = self
            .execute(inputs, op)
            .await
            .into_iter()
            .map(ItemResult::from)
            .collect();
        Self::report(stage, &results);
        results
    }

    /// Like [`run`](Self::run), keeping only the successful outputs.
    pub async fn survivors<I, O, F, Fut>(
        &self,
        stage: &str,
        inputs: impl IntoIterator<Item = I>,
        op: F,
    ) -> Vec<O>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = anyhow::Result<O>>,
    {
        crate::core::survivors(self.run(stage, inputs, op).await)
    }

    /// Like [`survivors`](Self::survivors), but faults the stage when the
    /// batch is non-empty and every item failed with [`ServiceUnavailable`].
    ///
    /// # Errors
    ///
    /// Returns a [`StageFault`] naming the last unavailable service.
    pub async fn try_survivors<I, O, F, Fut>(
        &self,
        stage: &str,
        inputs: impl IntoIterator<Item = I>,
        op: F,
    ) -> Result<Vec<O>, StageFault>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = anyhow::Result<O>>,
    {
        let outcomes = self.execute(inputs, op).await;
        let unreachable = !outcomes.is_empty()
            && outcomes
                .iter()
                .all(|outcome| outcome.as_ref().is_err_and(ServiceUnavailable::is_cause_of));

        let results: Vec<ItemResult<O>> = outcomes.into_iter().map(ItemResult::from).collect();
        Self::report(stage, &results);

        if unreachable {
            let total = results.len();
            let cause = results.last().and_then(ItemResult::cause).unwrap_or_default();
            return Err(StageFault::new(format!("all {total} items failed: {cause}")));
        }
        Ok(crate::core::survivors(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_results_follow_input_order() {
        let runner = BatchRunner::new(4);
        // Later items finish first.
        let results = runner
            .survivors("test", vec![40u64, 30, 20, 10], |delay| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(delay)
            })
            .await;

        assert_eq!(results, vec![40, 30, 20, 10]);
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let runner = BatchRunner::new(2);
        let results = runner
            .run("test", 0..4, |i| async move {
                if i == 1 {
                    anyhow::bail!("item {i} broke");
                }
                Ok(i * 10)
            })
            .await;

        assert_eq!(results.len(), 4);
        assert_eq!(results[1].cause(), Some("item 1 broke"));
        assert_eq!(crate::core::survivors(results), vec![0, 20, 30]);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let runner = BatchRunner::new(2);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        runner
            .survivors("test", 0..8, |_| {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_item_timeout() {
        let runner = BatchRunner::sequential().with_item_timeout(Duration::from_millis(10));
        let results = runner
            .run("test", vec![0u64, 500], |delay| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(delay)
            })
            .await;

        assert!(results[0].is_success());
        assert!(results[1].cause().unwrap().starts_with("timed out"));
    }

    #[derive(Debug)]
    struct Doubler {
        runner: BatchRunner,
    }

    impl Doubler {
        async fn double(&self, value: &u32) -> anyhow::Result<u32> {
            tokio::task::yield_now().await;
            Ok(value * 2)
        }

        async fn run_batch(&self, values: &[u32]) -> Result<Vec<u32>, StageFault> {
            self.runner.try_survivors("double", values, |value| self.double(value)).await
        }
    }

    #[tokio::test]
    async fn test_borrowing_batch_is_send() {
        let doubler = Arc::new(Doubler {
            runner: BatchRunner::new(2),
        });

        let handle = tokio::spawn(async move {
            let values = vec![1, 2, 3];
            doubler.run_batch(&values).await
        });
        assert_eq!(handle.await.unwrap().unwrap(), vec![2, 4, 6]);
    }

    fn unavailable(service: &str) -> anyhow::Error {
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        anyhow::Error::new(ServiceUnavailable::new(service, refused))
    }

    #[tokio::test]
    async fn test_all_unavailable_faults_stage() {
        let fault = BatchRunner::new(2)
            .try_survivors("search", ["sea", "sky"], |query| async move {
                Err::<(), _>(unavailable("stock search").context(format!("search for '{query}' failed")))
            })
            .await
            .unwrap_err();

        assert_eq!(
            fault.message(),
            "all 2 items failed: search for 'sky' failed: stock search is unavailable: connection refused"
        );
    }

    #[tokio::test]
    async fn test_partial_unavailability_drops_items() {
        let survivors = BatchRunner::new(2)
            .try_survivors("search", 0..3, |i| async move {
                if i == 1 {
                    return Err(unavailable("stock search"));
                }
                Ok(i)
            })
            .await
            .unwrap();
        assert_eq!(survivors, vec![0, 2]);
    }

    #[tokio::test]
    async fn test_ordinary_failures_never_fault() {
        let survivors = BatchRunner::new(2)
            .try_survivors("encode", 0..2, |i| async move { Err::<i32, _>(anyhow::anyhow!("item {i} rejected")) })
            .await
            .unwrap();
        assert!(survivors.is_empty());

        let empty: Vec<u32> = BatchRunner::new(1)
            .try_survivors("encode", Vec::<u32>::new(), |i| async move { Ok(i) })
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_minimum_concurrency() {
        assert_eq!(BatchRunner::new(0).max_concurrency(), 1);
        assert!(BatchRunner::default().max_concurrency() >= 1);
    }
}
