use std::sync::Mutex;

use crate::{
    outcome::{BatchOutcome, RestoreOutcome},
    sync::lock,
};

type FileCallback<C> = Box<dyn Fn(C, RestoreOutcome) + Send + Sync>;
type BatchCallback<B> = Box<dyn FnOnce(B, BatchOutcome) + Send>;

/// The batch callback with its context, taken out of the sink to be fired.
pub struct PendingDone<B> {
    context: B,
    callback: BatchCallback<B>,
}

impl<B> PendingDone<B> {
    pub fn fire(self, outcome: BatchOutcome) {
        (self.callback)(self.context, outcome);
    }
}

/// Delivers a batch's callbacks. Per-file contexts are moved into the file
/// callback, and the batch callback is taken out of its slot before firing,
/// so neither can be delivered twice.
pub struct NotificationSink<C, B> {
    on_file: FileCallback<C>,
    on_done: Mutex<Option<PendingDone<B>>>,
}

impl<C, B> NotificationSink<C, B> {
    pub fn new<F, D>(on_file: F, on_done: D, context: B) -> Self
    where
        F: Fn(C, RestoreOutcome) + Send + Sync + 'static,
        D: FnOnce(B, BatchOutcome) + Send + 'static,
    {
        NotificationSink {
            on_file: Box::new(on_file),
            on_done: Mutex::new(Some(PendingDone {
                context,
                callback: Box::new(on_done),
            })),
        }
    }

    pub fn file_restored(&self, context: C, outcome: RestoreOutcome) {
        (self.on_file)(context, outcome);
    }

    /// Takes the batch callback unless it was already taken.
    pub fn take_done(&self) -> Option<PendingDone<B>> {
        lock(&self.on_done).take()
    }

    pub fn is_done(&self) -> bool {
        lock(&self.on_done).is_none()
    }
}
