use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::context::TaskContext;
use crate::error::{TaskError, TaskResult};

/// A unit of work run by the pool. `Display` names the task in logs.
#[async_trait]
pub trait Task: fmt::Display + Send + Sync {
    async fn run(&self, ctx: &TaskContext) -> TaskResult<()>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of long-lived workers.
    pub workers: usize,
    /// Queued tasks beyond which `submit` waits.
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            queue_capacity: 200,
        }
    }
}

impl PoolConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

/// Outcome counts reported by [`WorkerPool::wait`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolSummary {
    pub completed: usize,
    pub failed: usize,
}

impl PoolSummary {
    pub fn total(&self) -> usize {
        self.completed + self.failed
    }
}

#[derive(Default)]
struct Counters {
    completed: AtomicUsize,
    failed: AtomicUsize,
}

type Queue = Arc<Mutex<mpsc::Receiver<Box<dyn Task>>>>;

/// Fixed set of workers draining one bounded queue.
///
/// A failing or panicking task is logged and counted; it never stops the
/// pool or other tasks.
pub struct WorkerPool {
    queue: mpsc::Sender<Box<dyn Task>>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl WorkerPool {
    /// Spawn the workers. Must be called inside a Tokio runtime.
    pub fn start(ctx: &TaskContext, config: &PoolConfig) -> Self {
        let size = config.workers.max(1);
        let capacity = config.queue_capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let rx: Queue = Arc::new(Mutex::new(rx));
        let counters = Arc::new(Counters::default());

        let workers = (0..size)
            .map(|id| tokio::spawn(worker(id, rx.clone(), ctx.clone(), counters.clone())))
            .collect();
        info!(workers = size, capacity, "worker pool started");
        Self {
            queue: tx,
            workers,
            counters,
        }
    }

    /// Enqueue a task, waiting while the queue is full.
    pub async fn submit(&self, task: impl Task + 'static) -> TaskResult<()> {
        self.submit_boxed(Box::new(task)).await
    }

    pub async fn submit_boxed(&self, task: Box<dyn Task>) -> TaskResult<()> {
        self.queue.send(task).await.map_err(|_| TaskError::QueueClosed)
    }

    /// Close the queue and wait until every worker has drained it and exited.
    pub async fn wait(self) -> PoolSummary {
        drop(self.queue);
        for handle in self.workers {
            if let Err(err) = handle.await {
                error!(error = %err, "worker exited abnormally");
            }
        }
        let summary = PoolSummary {
            completed: self.counters.completed.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
        };
        info!(completed = summary.completed, failed = summary.failed, "worker pool finished");
        summary
    }
}

async fn worker(id: usize, queue: Queue, ctx: TaskContext, counters: Arc<Counters>) {
    loop {
        let next = queue.lock().await.recv().await;
        let Some(task) = next else {
            debug!(worker = id, "queue closed");
            return;
        };
        let label = task.to_string();
        let task_ctx = ctx.clone();
        // Each task runs on its own Tokio task so a panic stays contained.
        let outcome = tokio::spawn(async move { task.run(&task_ctx).await }).await;
        match outcome {
            Ok(Ok(())) => {
                counters.completed.fetch_add(1, Ordering::SeqCst);
                debug!(worker = id, task = %label, "task finished");
            }
            Ok(Err(err)) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                error!(worker = id, task = %label, error = %err, "task failed");
            }
            Err(err) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                error!(worker = id, task = %label, error = %err, "task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Probe {
        id: usize,
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        ran: Arc<AtomicUsize>,
        fail: bool,
    }

    impl fmt::Display for Probe {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "probe {}", self.id)
        }
    }

    #[async_trait]
    impl Task for Probe {
        async fn run(&self, _ctx: &TaskContext) -> TaskResult<()> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.ran.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(std::io::Error::other(format!("probe {} failed", self.id)).into())
            } else {
                Ok(())
            }
        }
    }

    struct Panics;

    impl fmt::Display for Panics {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("panics")
        }
    }

    #[async_trait]
    impl Task for Panics {
        async fn run(&self, _ctx: &TaskContext) -> TaskResult<()> {
            panic!("boom");
        }
    }

    struct WaitsForCancel;

    impl fmt::Display for WaitsForCancel {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("waits for cancel")
        }
    }

    #[async_trait]
    impl Task for WaitsForCancel {
        async fn run(&self, ctx: &TaskContext) -> TaskResult<()> {
            tokio::select! {
                _ = ctx.cancelled() => Err(TaskError::Cancelled),
                _ = tokio::time::sleep(Duration::from_secs(30)) => Ok(()),
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn wait_returns_after_every_task() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let ran = Arc::new(AtomicUsize::new(0));
        let config = PoolConfig {
            workers: 3,
            queue_capacity: 2,
        };
        let pool = WorkerPool::start(&TaskContext::detached(), &config);
        for id in 0..40 {
            pool.submit(Probe {
                id,
                active: active.clone(),
                peak: peak.clone(),
                ran: ran.clone(),
                fail: id % 4 == 0,
            })
            .await
            .unwrap();
        }
        let summary = pool.wait().await;

        assert_eq!(ran.load(Ordering::SeqCst), 40);
        assert_eq!(summary.total(), 40);
        assert_eq!(summary.failed, 10);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let ran = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::start(&TaskContext::detached(), &PoolConfig::default().with_workers(1));
        pool.submit(Panics).await.unwrap();
        pool.submit(Probe {
            id: 1,
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            ran: ran.clone(),
            fail: false,
        })
        .await
        .unwrap();
        let summary = pool.wait().await;
        assert_eq!(summary, PoolSummary { completed: 1, failed: 1 });
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_stops_in_flight_tasks() {
        let (ctx, handle) = TaskContext::new();
        let pool = WorkerPool::start(&ctx, &PoolConfig::default().with_workers(2));
        for _ in 0..2 {
            pool.submit(WaitsForCancel).await.unwrap();
        }
        handle.cancel();
        let summary = tokio::time::timeout(Duration::from_secs(5), pool.wait())
            .await
            .unwrap();
        assert_eq!(summary.failed, 2);
    }

    #[tokio::test]
    async fn empty_pool_finishes() {
        let pool = WorkerPool::start(&TaskContext::detached(), &PoolConfig::default());
        assert_eq!(pool.wait().await, PoolSummary::default());
    }

    #[test]
    fn config_defaults_from_toml() {
        let config: PoolConfig = toml::from_str("workers = 4").unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.queue_capacity, 200);
    }
}
