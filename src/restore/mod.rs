mod batch;
mod file;
mod lifecycle;
mod notify;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use log::info;
use tokio::runtime::Handle;

use crate::{
    archive::{ArchiveStats, SharedArchive},
    config::RestoreConfig,
    error::{Error, Result},
    install::AtomicInstaller,
    outcome::{BatchOutcome, RestoreOutcome},
    request::RestoreBatch,
    stats::RestoreStats,
    sync::lock,
};

use self::{
    batch::{run_batch, BatchState},
    file::FileRestorer,
    lifecycle::Lifecycle,
};

pub use self::batch::BatchId;

/// Handle to the restore engine. Cloning shares the same engine; separate
/// `init` calls give fully independent engines.
#[derive(Debug, Clone)]
pub struct RestoreClient {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    config: RestoreConfig,
    archive: SharedArchive,
    runtime: Handle,
    lifecycle: Arc<Lifecycle>,
    stats: Arc<Mutex<RestoreStats>>,
    next_batch: AtomicU64,
}

impl RestoreClient {
    /// Creates a client that runs its batches on the current tokio runtime.
    pub fn init(config: RestoreConfig, archive: SharedArchive) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        Ok(RestoreClient::with_runtime(config, archive, runtime))
    }

    pub fn with_runtime(config: RestoreConfig, archive: SharedArchive, runtime: Handle) -> Self {
        let inner = ClientInner {
            config,
            archive,
            runtime,
            lifecycle: Arc::new(Lifecycle::new()),
            stats: Arc::new(Mutex::new(RestoreStats::new())),
            next_batch: AtomicU64::new(1),
        };

        RestoreClient {
            inner: Arc::new(inner),
        }
    }

    /// Starts restoring `batch` in the background and returns right away.
    ///
    /// `on_file` runs once per request with that request's context and
    /// outcome, possibly concurrently for different files. `on_done` runs
    /// once, after every `on_file` call of the batch has returned.
    ///
    /// A malformed batch fails with `InvalidArgument` and a terminated
    /// client with `Terminated`; neither invokes any callback.
    pub fn restore_files<C, B, F, D>(
        &self,
        batch: RestoreBatch<C, B>,
        on_file: F,
        on_done: D,
    ) -> Result<BatchId>
    where
        C: Send + 'static,
        B: Send + 'static,
        F: Fn(C, RestoreOutcome) + Send + Sync + 'static,
        D: FnOnce(B, BatchOutcome) + Send + 'static,
    {
        batch.validate()?;
        let guard = self.inner.lifecycle.enter()?;

        let id = BatchId(self.inner.next_batch.fetch_add(1, Ordering::Relaxed));
        let concurrency = self.inner.config.concurrency_for(batch.len());
        info!(
            "{id}: submitted {} file(s) for `{}` on machine {}",
            batch.len(),
            batch.username,
            batch.machine_id
        );

        let (state, targets) =
            BatchState::new(id, batch, on_file, on_done, guard, self.inner.stats.clone());
        let restorer = FileRestorer::new(
            self.inner.archive.clone(),
            AtomicInstaller::new(self.inner.config.cross_volume),
            self.inner.config.retries,
            self.inner.config.retry_delay,
            self.inner.stats.clone(),
        );

        lock(&self.inner.stats).batches_submitted += 1;
        self.inner
            .runtime
            .spawn(run_batch(Arc::new(state), targets, restorer, concurrency));

        Ok(id)
    }

    /// Terminates the client. Fails with `Busy` while batches are still in
    /// flight, leaving the client usable. Calling it again is a no-op.
    pub fn terminate(&self) -> Result<()> {
        self.inner.lifecycle.terminate()?;
        info!("restore client terminated");
        Ok(())
    }

    /// Rejects new batches, then waits for the running ones to finish.
    pub async fn shutdown(&self) {
        self.inner.lifecycle.shutdown().await;
        info!("restore client shut down");
    }

    pub fn in_flight(&self) -> usize {
        self.inner.lifecycle.in_flight()
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.lifecycle.is_terminated()
    }

    pub fn stats(&self) -> RestoreStats {
        *lock(&self.inner.stats)
    }

    pub fn archive_stats(&self) -> ArchiveStats {
        self.inner.archive.stats()
    }
}
