// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Deterministic engine for tests and demos — real implementations wrap a
// vendor SDK behind the same trait.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use blattwerk_core::{Detection, FrameBuffer, Quad, ScanSettings};
use tracing::warn;

use crate::normalized::NormalizedImage;
use crate::traits::{DocumentEngine, EngineError, EngineResult};

/// Scriptable stand-in for a real recognition engine.
///
/// By default every `detect` reports one full-frame boundary at confidence
/// 100 and every `normalize` passes the input pixels through unchanged.
/// Tests can script canned detections, a per-call delay (to simulate a slow
/// engine), or a failure status, and can inspect every frame the engine was
/// handed.
pub struct StubEngine {
    detections: Option<Vec<Detection>>,
    failure: Option<EngineError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    processed: Mutex<Vec<FrameBuffer>>,
    settings: Mutex<ScanSettings>,
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StubEngine {
    pub fn new() -> Self {
        Self {
            detections: None,
            failure: None,
            delay: None,
            calls: AtomicUsize::new(0),
            processed: Mutex::new(Vec::new()),
            settings: Mutex::new(ScanSettings::default()),
        }
    }

    /// Script the exact detections every `detect` call reports.
    pub fn with_detections(mut self, detections: Vec<Detection>) -> Self {
        self.detections = Some(detections);
        self
    }

    /// Sleep this long inside every engine call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every call with the given nonzero status.
    pub fn with_failure(mut self, code: i32, message: impl Into<String>) -> Self {
        self.failure = Some(EngineError::new(code, message));
        self
    }

    /// Number of engine calls entered so far (counted before any delay, so
    /// tests can observe an in-flight call).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every frame the engine has been handed, in processing order.
    pub fn processed_frames(&self) -> Vec<FrameBuffer> {
        self.processed.lock().expect("stub engine poisoned").clone()
    }

    /// The most recently applied settings.
    pub fn settings(&self) -> ScanSettings {
        *self.settings.lock().expect("stub engine poisoned")
    }

    fn enter_call(&self, frame: &FrameBuffer) -> EngineResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.processed
            .lock()
            .expect("stub engine poisoned")
            .push(frame.clone());
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl DocumentEngine for StubEngine {
    fn detect(&self, frame: &FrameBuffer) -> EngineResult<Vec<Detection>> {
        self.enter_call(frame)?;
        Ok(match &self.detections {
            Some(canned) => canned.clone(),
            None => vec![Detection::new(
                100,
                Quad::full_frame(frame.width(), frame.height()),
            )],
        })
    }

    fn normalize(&self, frame: &FrameBuffer, _quad: Option<&Quad>) -> EngineResult<NormalizedImage> {
        self.enter_call(frame)?;
        NormalizedImage::from_parts(
            frame.bytes().to_vec(),
            frame.width(),
            frame.height(),
            frame.stride(),
            frame.format(),
        )
        .map_err(|err| {
            warn!(%err, "stub normalize produced invalid geometry");
            EngineError::new(-2, err.to_string())
        })
    }

    fn apply_settings(&self, settings: &ScanSettings) -> EngineResult<()> {
        *self.settings.lock().expect("stub engine poisoned") = *settings;
        Ok(())
    }
}
