use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::ServiceError;

/// Runs blocking model calls off the async runtime, at most `workers` at a time.
#[derive(Clone, Debug)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Workers not currently running a job.
    pub fn idle(&self) -> usize {
        self.permits.available_permits()
    }

    pub async fn run<F, T>(&self, job: F) -> Result<T, ServiceError>
    where
        F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ServiceError::Worker("worker pool closed".to_string()))?;
        // the permit lives inside the job so a dropped caller does not free a busy worker
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        });
        handle
            .await
            .map_err(|e| ServiceError::Worker(e.to_string()))?
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(crate::DEFAULT_WORKERS)
    }
}
