use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LifecycleState {
    in_flight: usize,
    terminated: bool,
}

/// Tracks batches in flight for one client and gates teardown on them.
#[derive(Debug)]
pub struct Lifecycle {
    state: watch::Sender<LifecycleState>,
}

/// Held by a running batch; releases its in-flight slot when dropped.
#[derive(Debug)]
pub struct BatchGuard {
    lifecycle: Arc<Lifecycle>,
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        self.lifecycle.state.send_modify(|state| {
            state.in_flight = state.in_flight.saturating_sub(1);
        });
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(LifecycleState::default());
        Lifecycle { state }
    }

    pub fn enter(self: &Arc<Self>) -> Result<BatchGuard> {
        let mut terminated = false;
        self.state.send_if_modified(|state| {
            if state.terminated {
                terminated = true;
                false
            } else {
                state.in_flight += 1;
                true
            }
        });

        if terminated {
            return Err(Error::Terminated);
        }

        Ok(BatchGuard {
            lifecycle: self.clone(),
        })
    }

    /// Refuses with `Busy` while batches are running; otherwise terminates.
    /// Terminating twice is fine.
    pub fn terminate(&self) -> Result<()> {
        let mut busy = 0;
        self.state.send_if_modified(|state| {
            if state.in_flight > 0 {
                busy = state.in_flight;
                false
            } else {
                let changed = !state.terminated;
                state.terminated = true;
                changed
            }
        });

        if busy > 0 {
            Err(Error::Busy(busy))
        } else {
            Ok(())
        }
    }

    /// Stops new batches right away, then waits for running ones to finish.
    pub async fn shutdown(&self) {
        self.state.send_modify(|state| state.terminated = true);
        let mut receiver = self.state.subscribe();
        // The sender lives in `self`, so this only returns once drained.
        let _ = receiver.wait_for(|state| state.in_flight == 0).await;
    }

    pub fn in_flight(&self) -> usize {
        self.state.borrow().in_flight
    }

    pub fn is_terminated(&self) -> bool {
        self.state.borrow().terminated
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Lifecycle::new()
    }
}
