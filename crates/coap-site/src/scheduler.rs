// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! One-shot timer scheduling.
//!
//! The observation registry re-arms its timer after every fire, so the
//! scheduler only needs one-shot callbacks plus a handle that really prevents
//! a pending fire when cancelled.
//!
//! - [`TokioScheduler`]: spawns a task that sleeps then runs the callback;
//!   cancelling aborts the task.
//! - [`ManualScheduler`]: virtual clock advanced explicitly, for embedding in
//!   drivers that own their own time source.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::error::SiteError;

/// Future produced by a timer callback.
pub type TimerFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Work run when a timer fires.
pub type TimerCallback = Box<dyn FnOnce() -> TimerFuture + Send + 'static>;

/// Schedules one-shot callbacks.
pub trait Scheduler: Send + Sync {
    fn schedule_after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;
}

/// Cancels a pending timer. Dropping the handle does *not* cancel.
pub struct TimerHandle {
    cancel: Box<dyn FnOnce() + Send + Sync>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Box::new(cancel),
        }
    }

    /// Prevent the pending fire. No-op if it already ran.
    pub fn cancel(self) {
        (self.cancel)();
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TimerHandle")
    }
}

// ---------------------------------------------------------------------------
// Tokio
// ---------------------------------------------------------------------------

/// Scheduler backed by a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is running in.
    pub fn current() -> Result<Self, SiteError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| SiteError::Runtime(e.to_string()))
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let task = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            callback().await;
        });
        let abort = task.abort_handle();
        TimerHandle::new(move || abort.abort())
    }
}

// ---------------------------------------------------------------------------
// Manual
// ---------------------------------------------------------------------------

struct PendingTimer {
    due: Duration,
    callback: TimerCallback,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<u64, PendingTimer>,
}

/// Scheduler on a virtual clock that only moves through [`advance`].
///
/// [`advance`]: ManualScheduler::advance
#[derive(Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed so far.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Number of timers waiting to fire.
    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Move the clock forward, running every timer that falls due in order
    /// (including timers armed by callbacks during this call). Returns the
    /// number of callbacks run.
    pub async fn advance(&self, by: Duration) -> usize {
        let target = self.state.lock().now + by;
        let mut fired = 0;
        loop {
            let next = {
                let mut state = self.state.lock();
                let id = state
                    .pending
                    .iter()
                    .filter(|(_, t)| t.due <= target)
                    .min_by_key(|(id, t)| (t.due, **id))
                    .map(|(id, _)| *id);
                id.and_then(|id| state.pending.remove(&id)).map(|timer| {
                    state.now = timer.due;
                    timer.callback
                })
            };
            match next {
                Some(callback) => {
                    callback().await;
                    fired += 1;
                }
                None => break,
            }
        }
        self.state.lock().now = target;
        fired
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let id = {
            let mut state = self.state.lock();
            let id = state.next_id;
            state.next_id += 1;
            let due = state.now + delay;
            state.pending.insert(id, PendingTimer { due, callback });
            id
        };
        let state = Arc::clone(&self.state);
        TimerHandle::new(move || {
            state.lock().pending.remove(&id);
        })
    }
}
