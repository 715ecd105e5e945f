use std::{future::Future, sync::Arc};

use tokio::{
    sync::Semaphore,
    task::{JoinError, JoinSet},
};

use crate::error::Result;

/// Join set that never runs more than `limit` workers at once. `spawn` waits
/// for a free slot, so submitting work is also the backpressure point.
#[derive(Debug)]
pub struct WorkerPool {
    slots: Arc<Semaphore>,
    workers: JoinSet<()>,
    limit: usize,
}

impl WorkerPool {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        WorkerPool {
            slots: Arc::new(Semaphore::new(limit)),
            workers: JoinSet::new(),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub async fn spawn<F>(&mut self, worker: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let slot = self.slots.clone().acquire_owned().await?;
        self.workers.spawn(async move {
            worker.await;
            drop(slot);
        });
        Ok(())
    }

    pub async fn join_next(&mut self) -> Option<std::result::Result<(), JoinError>> {
        self.workers.join_next().await
    }

    pub fn try_join_next(&mut self) -> Option<std::result::Result<(), JoinError>> {
        self.workers.try_join_next()
    }
}
