// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The single dedicated worker thread.
//
// Loop: block in take(), run the engine synchronously, deliver to the sink,
// drop the frame. A claimed task always runs to completion before the next
// take(); the loop exits only on the queue's stop signal.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use blattwerk_core::ScanError;
use blattwerk_engine::DocumentEngine;
use tracing::{debug, warn};

use crate::queue::{FrameQueue, FrameTask};
use crate::sink::{ScanOutput, ScanResult, SinkSlot};

/// Handle to the worker thread. One per session at most, created lazily on
/// the first listener registration.
pub struct Worker {
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn the worker loop on its own thread.
    pub fn spawn(
        queue: Arc<FrameQueue>,
        engine: Arc<dyn DocumentEngine>,
        sink: Arc<SinkSlot>,
    ) -> std::io::Result<Self> {
        let handle = thread::Builder::new()
            .name("blattwerk-frame-worker".into())
            .spawn(move || run(queue, engine, sink))?;
        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Block until the loop has observed the stop signal and exited.
    ///
    /// After this returns, no engine call or sink delivery is in flight.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("frame worker thread terminated by panic");
            }
        }
    }
}

fn run(queue: Arc<FrameQueue>, engine: Arc<dyn DocumentEngine>, sink: Arc<SinkSlot>) {
    debug!("frame worker started");
    while let Some(task) = queue.take() {
        let result = process(engine.as_ref(), task);
        sink.deliver(result);
    }
    debug!("frame worker stopped");
}

/// Run one claimed task against the engine.
///
/// The frame moves into this call and drops when it returns — the exactly
/// once release for the processed path. An engine failure (or panic) is
/// folded into the result so the loop survives it.
fn process(engine: &dyn DocumentEngine, task: FrameTask) -> ScanResult {
    let call = panic::catch_unwind(AssertUnwindSafe(|| match task {
        FrameTask::Detect { frame } => engine.detect(&frame).map(ScanOutput::Detections),
        FrameTask::Normalize { frame, quad } => engine
            .normalize(&frame, quad.as_ref())
            .map(ScanOutput::Normalized),
    }));

    match call {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(err)) => {
            warn!(code = err.code, message = %err.message, "engine call failed");
            Err(err.into())
        }
        Err(_) => {
            warn!("engine panicked; reported as engine failure");
            Err(ScanError::Engine {
                code: -1,
                message: "engine panicked".into(),
            })
        }
    }
}
