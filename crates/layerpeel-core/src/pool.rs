//! Bounded pool for CPU-bound raster work.
//!
//! Jobs run on tokio's blocking thread pool; a semaphore caps how many run
//! at once so that many concurrent peel runs cannot oversubscribe the CPU.
//! Clones share the same limit.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::PeelError;

#[derive(Debug, Clone)]
pub struct ComputePool {
    slots: Arc<Semaphore>,
    size: usize,
}

impl ComputePool {
    /// A pool admitting at most `size` concurrent jobs (at least one).
    #[must_use]
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            slots: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// A pool sized to the machine's available parallelism.
    #[must_use]
    pub fn with_available_parallelism() -> Self {
        Self::new(std::thread::available_parallelism().map_or(1, NonZeroUsize::get))
    }

    /// Maximum number of concurrent jobs.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Slots currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Stop admitting jobs. Jobs already running finish normally; waiting
    /// and future calls to [`run`](Self::run) fail.
    pub fn close(&self) {
        self.slots.close();
    }

    /// Run `job` on a blocking thread once a slot is free.
    ///
    /// # Errors
    ///
    /// [`PeelError::PoolClosed`] if the pool was closed, or
    /// [`PeelError::Worker`] if the job panicked.
    pub async fn run<T, F>(&self, job: F) -> Result<T, PeelError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| PeelError::PoolClosed)?;

        let value = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await?;
        Ok(value)
    }
}

impl Default for ComputePool {
    fn default() -> Self {
        Self::with_available_parallelism()
    }
}
