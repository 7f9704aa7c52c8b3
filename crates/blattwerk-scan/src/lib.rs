// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blattwerk — asynchronous single-worker frame-processing pipeline.
//
// A bounded task queue accepts a continuous stream of camera frames,
// guarantees at most one in-flight engine call, discards stale work under
// load (latest-wins), and delivers results across the thread boundary to a
// registered sink. `ScannerSession` is the facade tying queue, worker, sink,
// and engine handle together with a deterministic shutdown protocol.

pub mod queue;
pub mod session;
pub mod sink;
pub mod worker;

pub use queue::{FrameQueue, FrameTask, QueueStats};
pub use session::ScannerSession;
pub use sink::{ResultSink, ScanOutput, ScanResult, SinkSlot};
