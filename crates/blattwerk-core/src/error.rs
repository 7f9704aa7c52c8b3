// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Blattwerk.

use thiserror::Error;

/// Top-level error type for all Blattwerk operations.
#[derive(Debug, Error)]
pub enum ScanError {
    // -- Engine boundary --
    /// The recognition engine returned a nonzero status for one call.
    /// Never fatal to the session; the pipeline logs it and moves on.
    #[error("engine failure (status {code}): {message}")]
    Engine { code: i32, message: String },

    // -- Caller input --
    #[error("invalid frame geometry: {0}")]
    InvalidFrame(String),

    #[error("frame allocation failed: {0}")]
    FrameAlloc(String),

    #[error("invalid scan settings: {0}")]
    Settings(#[from] serde_json::Error),

    // -- Lifecycle --
    #[error("session is closed")]
    SessionClosed,

    // -- File paths at the engine boundary --
    #[error("image codec error: {0}")]
    Image(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanError>;
