//! Task supervision with a shared shutdown signal.
//!
//! Every long running task of a node (accept loop, per-connection tasks,
//! reader loops, the broadcaster) is spawned through a [`Graceful`] so that a
//! single [`Graceful::shutdown`] cancels all of them and waits for them to
//! finish.

/// How long [`Graceful::shutdown`] waits for tasks before giving up.
const SHUTDOWN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Cloneable handle; all clones share the same token and tracker.
#[derive(Clone, Debug, Default)]
pub struct Graceful {
    cancel: tokio_util::sync::CancellationToken,
    tracker: tokio_util::task::TaskTracker,
}

impl Graceful {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a task whose completion [`Graceful::shutdown`] will wait for.
    pub fn spawn<F>(&self, task: F) -> tokio::task::JoinHandle<F::Output>
    where
        F: std::future::Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(task)
    }

    /// Resolves once shutdown has been requested.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Request shutdown without waiting for tasks.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel all tasks and wait for them to finish.
    pub async fn shutdown(&self) -> eyre::Result<()> {
        self.cancel.cancel();
        self.tracker.close();

        tracing::debug!("Waiting for {} tasks to finish", self.tracker.len());
        tokio::time::timeout(SHUTDOWN_TIMEOUT, self.tracker.wait())
            .await
            .map_err(|_| {
                eyre::eyre!(
                    "{} tasks still running after {:?}",
                    self.tracker.len(),
                    SHUTDOWN_TIMEOUT
                )
            })
    }
}
