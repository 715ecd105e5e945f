use std::{
    fmt, mem,
    sync::{Arc, Mutex},
    time::Instant,
};

use log::{error, info};

use crate::{
    outcome::{BatchOutcome, ErrorKind, RestoreOutcome},
    pool::WorkerPool,
    request::RestoreBatch,
    stats::RestoreStats,
    sync::lock,
};

use super::{
    file::{FileRestorer, FileTarget, Origin},
    lifecycle::BatchGuard,
    notify::NotificationSink,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(pub u64);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch #{}", self.0)
    }
}

enum Slot<C> {
    Pending(C),
    Recorded(RestoreOutcome),
}

/// Per-request outcomes, indexed by position in the submitted batch since
/// destination paths may repeat.
struct OutcomeTable<C> {
    slots: Vec<Slot<C>>,
    delivered: usize,
    succeeded: usize,
    failed: usize,
}

impl<C> OutcomeTable<C> {
    /// Stores the outcome and hands back the context to deliver it with, or
    /// `None` if the slot already holds an outcome.
    fn record(&mut self, index: usize, outcome: RestoreOutcome) -> Option<C> {
        let slot = self.slots.get_mut(index)?;
        if let Slot::Recorded(_) = slot {
            return None;
        }

        let Slot::Pending(context) = mem::replace(slot, Slot::Recorded(outcome)) else {
            return None;
        };

        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }

        Some(context)
    }

    fn pending(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| matches!(slot, Slot::Pending(_)))
            .map(|(index, _)| index)
            .collect()
    }
}

/// State shared by every task of one batch. The outcome table and its
/// counters sit behind a single mutex that is never held across an await
/// or a callback.
pub struct BatchState<C, B> {
    id: BatchId,
    origin: Origin,
    size: usize,
    started: Instant,
    table: Mutex<OutcomeTable<C>>,
    sink: NotificationSink<C, B>,
    guard: Mutex<Option<BatchGuard>>,
    stats: Arc<Mutex<RestoreStats>>,
}

impl<C, B> BatchState<C, B> {
    pub fn new(
        id: BatchId,
        batch: RestoreBatch<C, B>,
        on_file: impl Fn(C, RestoreOutcome) + Send + Sync + 'static,
        on_done: impl FnOnce(B, BatchOutcome) + Send + 'static,
        guard: BatchGuard,
        stats: Arc<Mutex<RestoreStats>>,
    ) -> (Self, Vec<FileTarget>) {
        let RestoreBatch {
            host,
            files,
            username,
            machine_id,
            context,
        } = batch;

        let size = files.len();
        let mut slots = Vec::with_capacity(size);
        let mut targets = Vec::with_capacity(size);
        for request in files {
            slots.push(Slot::Pending(request.context));
            targets.push(FileTarget {
                path: request.path,
                version: request.version,
                temp_path: request.temp_path,
            });
        }

        let state = BatchState {
            id,
            origin: Origin {
                host,
                username,
                machine_id,
            },
            size,
            started: Instant::now(),
            table: Mutex::new(OutcomeTable {
                slots,
                delivered: 0,
                succeeded: 0,
                failed: 0,
            }),
            sink: NotificationSink::new(on_file, on_done, context),
            guard: Mutex::new(Some(guard)),
            stats,
        };

        (state, targets)
    }

    /// Records a file's outcome, runs its callback, and fires the batch
    /// callback if this was the last file. The delivered count only moves
    /// after the file callback has returned, so the batch callback always
    /// comes after every file callback.
    pub fn deliver(&self, index: usize, outcome: RestoreOutcome) {
        let Some(context) = lock(&self.table).record(index, outcome) else {
            error!("{}: outcome for file {index} was already recorded", self.id);
            return;
        };

        self.sink.file_restored(context, outcome);

        let finished = {
            let mut table = lock(&self.table);
            table.delivered += 1;
            (table.delivered == self.size).then(|| self.summarize(&table))
        };

        if let Some(batch_outcome) = finished {
            self.finish(batch_outcome);
        }
    }

    fn summarize(&self, table: &OutcomeTable<C>) -> BatchOutcome {
        BatchOutcome::new(table.succeeded, table.failed, self.started.elapsed())
    }

    /// Fires the batch callback once. The batch leaves the in-flight count
    /// before the callback runs, so the callback and anything it signals
    /// can already terminate the client.
    fn finish(&self, outcome: BatchOutcome) {
        let Some(done) = self.sink.take_done() else {
            return;
        };

        lock(&self.stats).add_batch();
        info!(
            "{} finished: {} ({} restored, {} failed)",
            self.id, outcome.status, outcome.succeeded, outcome.failed
        );

        drop(lock(&self.guard).take());
        done.fire(outcome);
    }

    /// Settles whatever the workers left behind: files whose task died
    /// before reporting get an internal failure, and the batch callback
    /// fires if a panicking callback kept the count from reaching the end.
    fn settle(&self) {
        let pending = lock(&self.table).pending();
        for index in pending {
            self.deliver(index, RestoreOutcome::Failed(ErrorKind::Internal));
        }

        if !self.sink.is_done() {
            let outcome = self.summarize(&lock(&self.table));
            self.finish(outcome);
        }
    }
}

/// Runs every file of a batch on a bounded pool, then settles the batch.
pub async fn run_batch<C, B>(
    state: Arc<BatchState<C, B>>,
    targets: Vec<FileTarget>,
    restorer: FileRestorer,
    concurrency: usize,
) where
    C: Send + 'static,
    B: Send + 'static,
{
    let mut pool = WorkerPool::new(concurrency);
    info!(
        "{}: restoring {} file(s) from `{}` with {} worker(s)",
        state.id,
        targets.len(),
        state.origin.host,
        pool.limit()
    );

    for (index, target) in targets.into_iter().enumerate() {
        let task_state = state.clone();
        let restorer = restorer.clone();
        let spawned = pool
            .spawn(async move {
                let outcome = restorer.restore(&task_state.origin, &target).await;
                task_state.deliver(index, outcome);
            })
            .await;

        if let Err(err) = spawned {
            error!("{}: could not schedule file {index}: {err}", state.id);
            break;
        }

        while let Some(result) = pool.try_join_next() {
            if let Err(err) = result {
                error!("{}: worker failed: {err}", state.id);
            }
        }
    }

    while let Some(result) = pool.join_next().await {
        if let Err(err) = result {
            error!("{}: worker failed: {err}", state.id);
        }
    }

    state.settle();
}
