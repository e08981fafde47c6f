use tokio::sync::watch;

use crate::error::{TaskError, TaskResult};

/// Cancellation signal shared by every task of one run.
///
/// Cloning is cheap. Tasks poll [`check`](Self::check) between steps or race
/// long waits against [`cancelled`](Self::cancelled).
#[derive(Clone, Debug)]
pub struct TaskContext {
    cancel: watch::Receiver<bool>,
}

/// Owner side of a [`TaskContext`].
#[derive(Debug)]
pub struct CancelHandle {
    cancel: watch::Sender<bool>,
}

impl TaskContext {
    pub fn new() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (Self { cancel: rx }, CancelHandle { cancel: tx })
    }

    /// A context that is never cancelled.
    pub fn detached() -> Self {
        Self::new().0
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// `Err(Cancelled)` once the run has been cancelled.
    pub fn check(&self) -> TaskResult<()> {
        if self.is_cancelled() {
            Err(TaskError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves when the run is cancelled; never resolves for a detached context.
    pub async fn cancelled(&self) {
        let mut rx = self.cancel.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn starts_live() {
        let (ctx, _handle) = TaskContext::new();
        assert!(!ctx.is_cancelled());
        assert!(ctx.check().is_ok());
    }

    #[test]
    fn cancel_is_seen_by_clones() {
        let (ctx, handle) = TaskContext::new();
        let clone = ctx.clone();
        handle.cancel();
        assert!(clone.is_cancelled());
        assert!(matches!(ctx.check(), Err(TaskError::Cancelled)));
    }

    #[tokio::test]
    async fn cancelled_wakes_waiters() {
        let (ctx, handle) = TaskContext::new();
        let waiter = tokio::spawn(async move { ctx.cancelled().await });
        handle.cancel();
        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn detached_never_cancels() {
        let ctx = TaskContext::detached();
        let waited = tokio::time::timeout(Duration::from_millis(20), ctx.cancelled()).await;
        assert!(waited.is_err());
    }
}
