// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Latest-wins task queue between producer threads and the single worker.
//
// Live video is the target workload: a frame that was superseded before the
// worker claimed it is worthless, so every submit discards all still-queued
// tasks before enqueueing the new one. The worker is never backlogged beyond
// one stale item, and submit never blocks beyond the O(1) lock hold.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use blattwerk_core::{FrameBuffer, Quad, Result, ScanError};
use tracing::{debug, trace};

/// One pending processing request, owning its frame.
///
/// A tagged record rather than a closure: ownership of the frame moves
/// explicitly producer -> queue -> worker, and drops exactly once wherever
/// the task ends up (processed, coalesced away, or drained at shutdown).
#[derive(Debug)]
pub enum FrameTask {
    /// Detect document boundaries in the frame.
    Detect { frame: FrameBuffer },
    /// Rectify the document inside `quad` (engine's choice when absent).
    Normalize {
        frame: FrameBuffer,
        quad: Option<Quad>,
    },
}

/// Lifetime counters for the queue.
///
/// Every submitted task ends up in exactly one of the other three buckets,
/// so `submitted == taken + coalesced + drained` once the pipeline is
/// quiescent — the no-leak invariant the tests check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Tasks accepted by `submit`.
    pub submitted: u64,
    /// Tasks claimed by the worker.
    pub taken: u64,
    /// Stale tasks discarded by a later `submit`.
    pub coalesced: u64,
    /// Tasks discarded by `drain_and_stop`.
    pub drained: u64,
}

#[derive(Default)]
struct QueueState {
    tasks: VecDeque<FrameTask>,
    stopping: bool,
    stats: QueueStats,
}

/// Mutex + condvar guarded handoff queue. The mutex is the only lock in the
/// pipeline and is never held across an engine call or a sink delivery.
#[derive(Default)]
pub struct FrameQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a task, discarding everything still queued (latest-wins).
    ///
    /// Safe to call from any number of producer threads and concurrently
    /// with `drain_and_stop`. Rejects with `SessionClosed` once stopped.
    pub fn submit(&self, task: FrameTask) -> Result<()> {
        let mut state = self.state.lock().expect("frame queue poisoned");
        if state.stopping {
            return Err(ScanError::SessionClosed);
        }

        let stale = state.tasks.len() as u64;
        if stale > 0 {
            trace!(stale, "coalescing stale frames");
            state.stats.coalesced += stale;
            state.tasks.clear();
        }
        state.tasks.push_back(task);
        state.stats.submitted += 1;
        drop(state);

        self.ready.notify_one();
        Ok(())
    }

    /// Block until a task is available or the queue stops.
    ///
    /// Called only by the worker; `None` is the stop signal. The oldest
    /// task is returned — depth is normally <= 1 under the coalescing
    /// policy, but deeper queues are handled all the same.
    pub fn take(&self) -> Option<FrameTask> {
        let mut state = self.state.lock().expect("frame queue poisoned");
        loop {
            if state.stopping {
                return None;
            }
            if let Some(task) = state.tasks.pop_front() {
                state.stats.taken += 1;
                return Some(task);
            }
            state = self.ready.wait(state).expect("frame queue poisoned");
        }
    }

    /// Stop the queue: discard all queued tasks and wake the worker so a
    /// blocked `take` observes the stop. Idempotent.
    pub fn drain_and_stop(&self) {
        let mut state = self.state.lock().expect("frame queue poisoned");
        state.stopping = true;
        let dropped = state.tasks.len() as u64;
        state.stats.drained += dropped;
        state.tasks.clear();
        drop(state);

        self.ready.notify_all();
        if dropped > 0 {
            debug!(dropped, "queued frames drained at stop");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().expect("frame queue poisoned").stopping
    }

    /// Snapshot of the lifetime counters.
    pub fn stats(&self) -> QueueStats {
        self.state.lock().expect("frame queue poisoned").stats
    }
}
