// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Result delivery across the worker/caller thread boundary.
//
// The sink is a single swappable shared handle: registering a new one
// releases the old, teardown releases the last. The slot lock is held only
// for the swap and the handle clone, never while the callback runs, so a
// slow sink cannot stall producers or a concurrent re-registration.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use blattwerk_core::{Detection, ScanError};
use blattwerk_engine::NormalizedImage;
use tracing::warn;

/// Payload of one completed task.
#[derive(Debug)]
pub enum ScanOutput {
    /// Boundaries found by a detect task (possibly empty).
    Detections(Vec<Detection>),
    /// Rectified image produced by a normalize task.
    Normalized(NormalizedImage),
}

/// What the sink receives: the task's output, or the per-task error that
/// replaced it. Errors here are never fatal to the pipeline.
pub type ScanResult = std::result::Result<ScanOutput, ScanError>;

/// Callback receiving asynchronous results on the worker thread.
///
/// Implementations must be safe to call from a thread the caller does not
/// control; if delivery has to re-enter a single-threaded context (a UI
/// event loop, an interpreter lock), the sink itself acquires that context
/// around its own body and releases it before returning.
pub trait ResultSink: Send + Sync {
    fn on_result(&self, result: ScanResult);
}

impl<F> ResultSink for F
where
    F: Fn(ScanResult) + Send + Sync,
{
    fn on_result(&self, result: ScanResult) {
        self(result);
    }
}

/// The session's swappable sink registration.
#[derive(Default)]
pub struct SinkSlot {
    slot: Mutex<Option<Arc<dyn ResultSink>>>,
}

impl SinkSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a sink, releasing any previous one.
    pub fn replace(&self, sink: Arc<dyn ResultSink>) {
        *self.slot.lock().expect("sink slot poisoned") = Some(sink);
    }

    /// Release the current sink, if any. Idempotent.
    pub fn clear(&self) {
        *self.slot.lock().expect("sink slot poisoned") = None;
    }

    pub fn is_registered(&self) -> bool {
        self.slot.lock().expect("sink slot poisoned").is_some()
    }

    fn current(&self) -> Option<Arc<dyn ResultSink>> {
        self.slot.lock().expect("sink slot poisoned").clone()
    }

    /// Deliver one result to the registered sink, if any.
    ///
    /// A panicking sink is caught and logged; it must not take down the
    /// worker loop.
    pub fn deliver(&self, result: ScanResult) {
        let Some(sink) = self.current() else {
            // No listener: the result is dropped, matching an unregistered
            // or already-cleared session.
            return;
        };

        if panic::catch_unwind(AssertUnwindSafe(|| sink.on_result(result))).is_err() {
            warn!("result sink panicked; result dropped");
        }
    }
}
