// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Trait definition for the opaque recognition engine.
//
// The engine is a synchronous, possibly slow, possibly failing black box.
// One handle is shared between producer threads (sync calls) and the worker
// thread (async calls); `Send + Sync` on the trait encodes the assumption
// that the engine tolerates that pattern. An engine that does not must
// serialize internally.

use blattwerk_core::{Detection, FrameBuffer, Quad, ScanSettings};
use thiserror::Error;

use crate::normalized::NormalizedImage;

/// Nonzero-status failure from one engine call.
///
/// The pipeline treats this as "no result for that call" and continues; it
/// is never fatal to the session.
#[derive(Debug, Clone, Error)]
#[error("engine status {code}: {message}")]
pub struct EngineError {
    pub code: i32,
    pub message: String,
}

impl EngineError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<EngineError> for blattwerk_core::ScanError {
    fn from(err: EngineError) -> Self {
        Self::Engine {
            code: err.code,
            message: err.message,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// The document detection/normalization engine.
pub trait DocumentEngine: Send + Sync {
    /// Detect document boundaries in a frame.
    ///
    /// Detections are returned in engine order, not sorted by confidence.
    fn detect(&self, frame: &FrameBuffer) -> EngineResult<Vec<Detection>>;

    /// Rectify the document inside `quad` to an axis-aligned image.
    ///
    /// With `quad` absent the engine picks its own best boundary.
    fn normalize(&self, frame: &FrameBuffer, quad: Option<&Quad>) -> EngineResult<NormalizedImage>;

    /// Apply runtime settings. Engines without tunable parameters may keep
    /// the default no-op.
    fn apply_settings(&self, settings: &ScanSettings) -> EngineResult<()> {
        let _ = settings;
        Ok(())
    }
}
