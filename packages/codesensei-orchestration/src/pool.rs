//! Bounded Task Pool
//!
//! Runs a homogeneous batch of async units with a fixed concurrency ceiling.
//! Results come back index-for-index with the input; a unit that fails or
//! yields nothing leaves `None` in its slot and never cancels its siblings.

use crate::error::{OrchestratorError, Result};
use futures::stream::{self, StreamExt};
use std::future::Future;
use tracing::warn;

/// Completion notice passed to the progress callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolProgress {
    /// Units finished so far (including this one)
    pub completed: usize,
    pub total: usize,
    /// Input index of the unit that just finished
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct BoundedPool {
    limit: usize,
}

impl BoundedPool {
    pub fn new(limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(OrchestratorError::Config(
                "Bounded pool limit must be at least 1".to_string(),
            ));
        }
        Ok(Self { limit })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, work: F) -> Vec<Option<R>>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<Option<R>>>,
    {
        self.run_with_progress(items, work, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_complete` once per finished unit
    /// (in completion order, from the collecting task).
    pub async fn run_with_progress<T, R, F, Fut, P>(
        &self,
        items: Vec<T>,
        work: F,
        mut on_complete: P,
    ) -> Vec<Option<R>>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<Option<R>>>,
        P: FnMut(PoolProgress),
    {
        let total = items.len();
        let mut results: Vec<Option<R>> = (0..total).map(|_| None).collect();

        let work = &work;
        let mut pending = stream::iter(items.into_iter().enumerate().map(|(index, item)| async move {
            (index, work(item).await)
        }))
        .buffer_unordered(self.limit);

        let mut completed = 0;
        while let Some((index, outcome)) = pending.next().await {
            completed += 1;
            match outcome {
                Ok(value) => results[index] = value,
                Err(e) => {
                    let failure = OrchestratorError::ChunkTaskFailure {
                        label: format!("#{}", index),
                        message: e.to_string(),
                    };
                    warn!("BoundedPool: {} (batch continues)", failure);
                }
            }
            on_complete(PoolProgress {
                completed,
                total,
                index,
            });
        }

        results
    }
}

impl Default for BoundedPool {
    fn default() -> Self {
        Self { limit: 3 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::{sleep, Duration};

    #[test]
    fn test_zero_limit_rejected() {
        assert!(BoundedPool::new(0).is_err());
        assert_eq!(BoundedPool::new(4).unwrap().limit(), 4);
    }

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let pool = BoundedPool::new(3).unwrap();
        // Later items finish first
        let items: Vec<u64> = (0..6).collect();
        let results = pool
            .run(items, |i| async move {
                sleep(Duration::from_millis(30 - i * 5)).await;
                Ok(Some(i * 10))
            })
            .await;

        assert_eq!(
            results,
            vec![Some(0), Some(10), Some(20), Some(30), Some(40), Some(50)]
        );
    }

    #[tokio::test]
    async fn test_failures_and_nulls_do_not_cancel_batch() {
        let pool = BoundedPool::new(2).unwrap();
        let results = pool
            .run((0..5).collect::<Vec<u32>>(), |i| async move {
                match i {
                    1 => Err(OrchestratorError::Parse("bad unit".to_string())),
                    3 => Ok(None),
                    _ => Ok(Some(i)),
                }
            })
            .await;

        assert_eq!(results, vec![Some(0), None, Some(2), None, Some(4)]);
        let kept: Vec<u32> = results.into_iter().flatten().collect();
        assert_eq!(kept, vec![0, 2, 4]);
    }

    #[tokio::test]
    async fn test_in_flight_never_exceeds_limit() {
        let pool = BoundedPool::new(3).unwrap();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let results = pool
            .run((0..10).collect::<Vec<u32>>(), |i| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    sleep(Duration::from_millis(10)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(Some(i))
                }
            })
            .await;

        assert_eq!(results.len(), 10);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_progress_reported_per_unit() {
        let pool = BoundedPool::new(3).unwrap();
        let mut seen = Vec::new();
        pool.run_with_progress(
            vec!["a", "b", "c", "d"],
            |s| async move { Ok(Some(s.len())) },
            |p| seen.push(p),
        )
        .await;

        assert_eq!(seen.len(), 4);
        assert!(seen.iter().all(|p| p.total == 4));
        let completed: Vec<usize> = seen.iter().map(|p| p.completed).collect();
        assert_eq!(completed, vec![1, 2, 3, 4]);
        let mut indices: Vec<usize> = seen.iter().map(|p| p.index).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let pool = BoundedPool::default();
        let results: Vec<Option<u8>> = pool.run(Vec::<u8>::new(), |_| async { Ok(Some(1)) }).await;
        assert!(results.is_empty());
    }
}
