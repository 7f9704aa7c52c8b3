// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session facade: engine handle + optional async pipeline + sink slot.
//
// Shutdown protocol (close): release the sink so no further deliveries can
// be attributed to the session, stop and drain the queue, join the worker,
// drop worker and queue, and only then release the engine handle — the
// worker may be mid-call into it until the join returns.

use std::sync::{Arc, Mutex};

use blattwerk_core::{
    Detection, FrameBuffer, Quad, Result, ScanError, ScanSettings,
};
use blattwerk_engine::{DocumentEngine, NormalizedImage, read_frame};
use tracing::{debug, info, instrument, warn};

use crate::queue::{FrameQueue, FrameTask, QueueStats};
use crate::sink::{ResultSink, SinkSlot};
use crate::worker::Worker;

/// The async half of a session: queue plus the worker draining it. Both are
/// created together on first listener registration and torn down together.
struct AsyncPipeline {
    queue: Arc<FrameQueue>,
    worker: Worker,
}

/// One scanning session over one engine handle.
///
/// Synchronous calls run the engine on the caller's thread and bypass the
/// queue entirely. Asynchronous calls hand owned frames to the single
/// worker thread, which exists only after `add_async_listener` and never in
/// duplicate. All operations on a closed session are rejected with
/// `SessionClosed`; `close` itself is idempotent and also runs on drop.
pub struct ScannerSession {
    /// `None` once the session is closed.
    engine: Mutex<Option<Arc<dyn DocumentEngine>>>,
    sink: Arc<SinkSlot>,
    pipeline: Mutex<Option<AsyncPipeline>>,
}

impl ScannerSession {
    pub fn new(engine: Arc<dyn DocumentEngine>) -> Self {
        Self {
            engine: Mutex::new(Some(engine)),
            sink: Arc::new(SinkSlot::new()),
            pipeline: Mutex::new(None),
        }
    }

    fn engine(&self) -> Result<Arc<dyn DocumentEngine>> {
        self.engine
            .lock()
            .expect("session engine slot poisoned")
            .clone()
            .ok_or(ScanError::SessionClosed)
    }

    fn ensure_open(&self) -> Result<()> {
        self.engine().map(|_| ())
    }

    pub fn is_closed(&self) -> bool {
        self.engine().is_err()
    }

    // -- Synchronous path -----------------------------------------------------

    /// Detect document boundaries in a frame, on the caller's thread.
    ///
    /// An engine failure is logged and reported as "no result": the returned
    /// list is empty and the session stays usable.
    #[instrument(skip_all, fields(width = frame.width(), height = frame.height()))]
    pub fn detect(&self, frame: &FrameBuffer) -> Result<Vec<Detection>> {
        let engine = self.engine()?;
        match engine.detect(frame) {
            Ok(detections) => Ok(detections),
            Err(err) => {
                warn!(code = err.code, message = %err.message, "detection failed");
                Ok(Vec::new())
            }
        }
    }

    /// Rectify the document inside `quad` (engine's own boundary when
    /// absent). Engine failure is logged and yields `None`.
    #[instrument(skip_all, fields(width = frame.width(), height = frame.height()))]
    pub fn normalize(
        &self,
        frame: &FrameBuffer,
        quad: Option<&Quad>,
    ) -> Result<Option<NormalizedImage>> {
        let engine = self.engine()?;
        match engine.normalize(frame, quad) {
            Ok(image) => Ok(Some(image)),
            Err(err) => {
                warn!(code = err.code, message = %err.message, "normalization failed");
                Ok(None)
            }
        }
    }

    /// Detect document boundaries in an image file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn detect_file(&self, path: impl AsRef<std::path::Path>) -> Result<Vec<Detection>> {
        self.ensure_open()?;
        let frame = read_frame(path)?;
        self.detect(&frame)
    }

    /// Normalize the document in an image file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn normalize_file(
        &self,
        path: impl AsRef<std::path::Path>,
        quad: Option<&Quad>,
    ) -> Result<Option<NormalizedImage>> {
        self.ensure_open()?;
        let frame = read_frame(path)?;
        self.normalize(&frame, quad)
    }

    /// Validate a JSON settings string and forward it to the engine.
    #[instrument(skip_all)]
    pub fn set_parameters(&self, json: &str) -> Result<()> {
        let engine = self.engine()?;
        let settings = ScanSettings::from_json(json)?;
        engine.apply_settings(&settings)?;
        debug!(?settings, "scan settings applied");
        Ok(())
    }

    // -- Asynchronous path ----------------------------------------------------

    /// Register (or swap) the async result sink.
    ///
    /// The first registration creates the queue and worker; later ones only
    /// swap the callback, releasing the previous sink. There is never a
    /// second worker.
    pub fn add_async_listener(&self, sink: impl ResultSink + 'static) -> Result<()> {
        let engine = self.engine()?;
        self.sink.replace(Arc::new(sink));

        let mut pipeline = self.pipeline.lock().expect("session pipeline poisoned");
        if pipeline.is_none() {
            let queue = Arc::new(FrameQueue::new());
            let worker = Worker::spawn(Arc::clone(&queue), engine, Arc::clone(&self.sink))?;
            *pipeline = Some(AsyncPipeline { queue, worker });
            info!("async listener registered; frame worker started");
        }
        Ok(())
    }

    /// Queue a frame for asynchronous detection (latest-wins).
    pub fn detect_async(&self, frame: FrameBuffer) -> Result<()> {
        self.submit(FrameTask::Detect { frame })
    }

    /// Queue a frame for asynchronous normalization (latest-wins).
    pub fn normalize_async(&self, frame: FrameBuffer, quad: Option<Quad>) -> Result<()> {
        self.submit(FrameTask::Normalize { frame, quad })
    }

    /// Deep-copy a strided caller buffer and queue it for detection.
    ///
    /// Geometry is inferred from the strides; malformed layouts are rejected
    /// before anything is copied or enqueued.
    pub fn detect_buffer_async(
        &self,
        bytes: &[u8],
        row_stride: usize,
        pixel_stride: usize,
    ) -> Result<()> {
        self.ensure_open()?;
        let frame = FrameBuffer::from_stride_layout(bytes, row_stride, pixel_stride)?;
        self.submit(FrameTask::Detect { frame })
    }

    fn submit(&self, task: FrameTask) -> Result<()> {
        self.ensure_open()?;
        let queue = self
            .pipeline
            .lock()
            .expect("session pipeline poisoned")
            .as_ref()
            .map(|p| Arc::clone(&p.queue));

        match queue {
            Some(queue) => queue.submit(task),
            // No listener was ever registered (or it has been cleared):
            // reject instead of queueing into nowhere.
            None => Err(ScanError::SessionClosed),
        }
    }

    /// Lifetime counters of the async queue, while a listener is active.
    pub fn pipeline_stats(&self) -> Option<QueueStats> {
        self.pipeline
            .lock()
            .expect("session pipeline poisoned")
            .as_ref()
            .map(|p| p.queue.stats())
    }

    // -- Lifecycle ------------------------------------------------------------

    /// Tear down the async half only: release the sink, stop and drain the
    /// queue, join the worker. Idempotent; the session stays usable for
    /// synchronous calls and may register a fresh listener afterwards.
    pub fn clear_async_listener(&self) {
        self.sink.clear();

        // Take the pipeline out under the lock, join outside it, so a
        // concurrent submit sees an empty slot instead of blocking on us.
        let pipeline = self
            .pipeline
            .lock()
            .expect("session pipeline poisoned")
            .take();

        if let Some(AsyncPipeline { queue, worker }) = pipeline {
            queue.drain_and_stop();
            worker.join();
            debug!("frame worker joined");
            // Worker and queue drop here.
        }
    }

    /// Shut the session down. Idempotent; also runs on drop.
    pub fn close(&self) {
        // Taking the handle out first marks the session closed for any new
        // operation; the Arc itself is released only after the worker has
        // joined, because the worker may still be calling into it.
        let engine = self
            .engine
            .lock()
            .expect("session engine slot poisoned")
            .take();

        self.clear_async_listener();

        if engine.is_some() {
            info!("scanner session closed");
        }
        drop(engine);
    }
}

impl Drop for ScannerSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ScanResult;
    use blattwerk_core::{PixelFormat, Point};
    use blattwerk_engine::StubEngine;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn gray_frame(fill: u8) -> FrameBuffer {
        FrameBuffer::from_raw(&vec![fill; 100 * 100], 100, 100, PixelFormat::Grayscale)
            .expect("test frame")
    }

    fn session_over(engine: StubEngine) -> (ScannerSession, Arc<StubEngine>) {
        let engine = Arc::new(engine);
        let session = ScannerSession::new(Arc::clone(&engine) as Arc<dyn DocumentEngine>);
        (session, engine)
    }

    fn wait_until(mut cond: impl FnMut() -> bool, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    fn counting_sink(counter: Arc<AtomicUsize>) -> impl ResultSink {
        move |_result: ScanResult| {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn sync_detect_returns_the_engine_fixture() {
        let fixture = Detection::new(87, Quad::from_coords([(0, 0), (99, 0), (99, 99), (0, 99)]));
        let (session, _engine) = session_over(StubEngine::new().with_detections(vec![fixture]));

        let results = session.detect(&gray_frame(0)).expect("detect");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].confidence, 87);
        assert_eq!(results[0].quad.points[0], Point::new(0, 0));
        assert_eq!(results[0].quad.points[1], Point::new(99, 0));
        assert_eq!(results[0].quad.points[2], Point::new(99, 99));
        assert_eq!(results[0].quad.points[3], Point::new(0, 99));
    }

    #[test]
    fn sync_engine_failure_is_an_empty_result_not_an_error() {
        let (session, engine) = session_over(StubEngine::new().with_failure(-5, "engine unhappy"));

        let results = session.detect(&gray_frame(0)).expect("detect must not fail");
        assert!(results.is_empty());

        let normalized = session
            .normalize(&gray_frame(0), None)
            .expect("normalize must not fail");
        assert!(normalized.is_none());

        // The session is still alive afterwards.
        assert!(!session.is_closed());
        assert_eq!(engine.calls(), 2);
    }

    #[test]
    fn sync_normalize_returns_the_rectified_image() {
        let (session, _engine) = session_over(StubEngine::new());
        let quad = Quad::full_frame(100, 100);

        let image = session
            .normalize(&gray_frame(3), Some(&quad))
            .expect("normalize")
            .expect("image");
        assert_eq!(image.width(), 100);
        assert_eq!(image.height(), 100);
        assert_eq!(image.bytes()[0], 3);
    }

    #[test]
    fn set_parameters_validates_then_forwards() {
        let (session, engine) = session_over(StubEngine::new());

        session
            .set_parameters(r#"{"colour_mode": "grayscale", "max_quads": 2}"#)
            .expect("valid settings");
        assert_eq!(engine.settings().max_quads, 2);

        let err = session.set_parameters(r#"{"max_quads": "two"}"#).unwrap_err();
        assert!(matches!(err, ScanError::Settings(_)));
        // The rejected settings never reached the engine.
        assert_eq!(engine.settings().max_quads, 2);
    }

    #[test]
    fn rapid_submissions_coalesce_to_the_newest_frame() {
        let (session, engine) = session_over(StubEngine::new().with_delay(Duration::from_millis(50)));

        let deliveries = Arc::new(AtomicUsize::new(0));
        session
            .add_async_listener(counting_sink(Arc::clone(&deliveries)))
            .expect("listener");

        for fill in 1..=5u8 {
            session.detect_async(gray_frame(fill)).expect("submit");
        }

        // The newest frame must eventually be processed...
        assert!(wait_until(
            || engine
                .processed_frames()
                .last()
                .is_some_and(|f| f.bytes()[0] == 5),
            Duration::from_secs(2),
        ));
        // ...and its delivery must reach the sink.
        let calls = engine.calls();
        assert!(wait_until(
            || deliveries.load(Ordering::SeqCst) == calls,
            Duration::from_secs(2),
        ));

        let stats = session.pipeline_stats().expect("active pipeline");
        assert_eq!(stats.submitted, 5);
        assert_eq!(stats.submitted, stats.taken + stats.coalesced + stats.drained);

        session.close();
        assert!(deliveries.load(Ordering::SeqCst) < 5, "coalescing must drop frames");
        assert_eq!(
            engine.processed_frames().last().expect("processed").bytes()[0],
            5
        );
    }

    #[test]
    fn degenerate_buffer_is_rejected_before_the_engine() {
        let (session, engine) = session_over(StubEngine::new());
        session
            .add_async_listener(|_result: ScanResult| {})
            .expect("listener");

        // Zero row stride implies a zero/invalid dimension.
        let err = session.detect_buffer_async(&[0u8; 64], 0, 1).unwrap_err();
        assert!(matches!(err, ScanError::InvalidFrame(_)));

        // Strides that do not tile the buffer.
        let err = session.detect_buffer_async(&[0u8; 65], 8, 1).unwrap_err();
        assert!(matches!(err, ScanError::InvalidFrame(_)));

        assert_eq!(engine.calls(), 0);
        let stats = session.pipeline_stats().expect("active pipeline");
        assert_eq!(stats.submitted, 0);
    }

    #[test]
    fn close_waits_for_the_inflight_call_and_its_delivery() {
        let (session, engine) =
            session_over(StubEngine::new().with_delay(Duration::from_millis(150)));

        let deliveries = Arc::new(AtomicUsize::new(0));
        session
            .add_async_listener(counting_sink(Arc::clone(&deliveries)))
            .expect("listener");

        session.detect_async(gray_frame(1)).expect("submit");
        // Wait for the worker to be inside the engine call.
        assert!(wait_until(|| engine.calls() == 1, Duration::from_secs(2)));

        session.close();

        // join() returned, so the engine call and its delivery are done.
        assert_eq!(deliveries.load(Ordering::SeqCst), 1);
        assert!(session.is_closed());
        assert!(matches!(
            session.detect(&gray_frame(0)),
            Err(ScanError::SessionClosed)
        ));
    }

    #[test]
    fn close_is_idempotent_even_without_a_listener() {
        let (session, _engine) = session_over(StubEngine::new());
        session.close();
        session.close();

        assert!(matches!(
            session.detect(&gray_frame(0)),
            Err(ScanError::SessionClosed)
        ));
        assert!(matches!(
            session.detect_async(gray_frame(0)),
            Err(ScanError::SessionClosed)
        ));
        assert!(matches!(
            session.add_async_listener(|_result: ScanResult| {}),
            Err(ScanError::SessionClosed)
        ));
    }

    #[test]
    fn submit_without_a_listener_is_rejected() {
        let (session, engine) = session_over(StubEngine::new());
        assert!(matches!(
            session.detect_async(gray_frame(0)),
            Err(ScanError::SessionClosed)
        ));
        assert_eq!(engine.calls(), 0);
    }

    #[test]
    fn close_concurrent_with_submits_never_deadlocks() {
        let (session, _engine) =
            session_over(StubEngine::new().with_delay(Duration::from_millis(10)));
        let session = Arc::new(session);
        session
            .add_async_listener(|_result: ScanResult| {})
            .expect("listener");

        let producer = {
            let session = Arc::clone(&session);
            std::thread::spawn(move || {
                // Submit until the session shuts down underneath us.
                while session.detect_async(gray_frame(1)).is_ok() {
                    std::thread::yield_now();
                }
            })
        };

        std::thread::sleep(Duration::from_millis(30));
        session.close();
        producer.join().expect("producer exits after close");

        assert!(session.is_closed());
        assert!(session.pipeline_stats().is_none());
    }

    #[test]
    fn re_registration_swaps_the_sink_not_the_worker() {
        let (session, engine) = session_over(StubEngine::new());

        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        session
            .add_async_listener(counting_sink(Arc::clone(&first)))
            .expect("first listener");
        session.detect_async(gray_frame(1)).expect("submit");
        assert!(wait_until(
            || first.load(Ordering::SeqCst) == 1,
            Duration::from_secs(2)
        ));

        session
            .add_async_listener(counting_sink(Arc::clone(&second)))
            .expect("second listener");
        session.detect_async(gray_frame(2)).expect("submit");
        assert!(wait_until(
            || second.load(Ordering::SeqCst) == 1,
            Duration::from_secs(2)
        ));

        // The first sink saw nothing after the swap.
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(engine.calls(), 2);
    }

    #[test]
    fn listener_can_be_cleared_and_registered_again() {
        let (session, engine) = session_over(StubEngine::new());

        session
            .add_async_listener(|_result: ScanResult| {})
            .expect("listener");
        session.clear_async_listener();
        session.clear_async_listener();

        // Async path is gone, sync path still works.
        assert!(matches!(
            session.detect_async(gray_frame(0)),
            Err(ScanError::SessionClosed)
        ));
        assert_eq!(session.detect(&gray_frame(0)).expect("sync detect").len(), 1);

        // A fresh listener gets a fresh worker.
        let deliveries = Arc::new(AtomicUsize::new(0));
        session
            .add_async_listener(counting_sink(Arc::clone(&deliveries)))
            .expect("re-register");
        session.detect_async(gray_frame(7)).expect("submit");
        assert!(wait_until(
            || deliveries.load(Ordering::SeqCst) == 1,
            Duration::from_secs(2)
        ));
        assert_eq!(
            engine.processed_frames().last().expect("processed").bytes()[0],
            7
        );
    }

    #[test]
    fn panicking_listener_does_not_kill_the_pipeline() {
        let (session, _engine) = session_over(StubEngine::new());
        let survived = Arc::new(AtomicUsize::new(0));

        session
            .add_async_listener(|_result: ScanResult| panic!("listener bug"))
            .expect("listener");
        session.detect_async(gray_frame(1)).expect("submit");

        // Swap in a well-behaved sink; the worker must still be alive.
        session
            .add_async_listener(counting_sink(Arc::clone(&survived)))
            .expect("replacement listener");
        session.detect_async(gray_frame(2)).expect("submit");

        assert!(wait_until(
            || survived.load(Ordering::SeqCst) >= 1,
            Duration::from_secs(2)
        ));
    }
}
