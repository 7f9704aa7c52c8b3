// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blattwerk — Core types and error definitions shared across all crates.

pub mod error;
pub mod frame;
pub mod settings;
pub mod types;

pub use error::{Result, ScanError};
pub use frame::{FrameBuffer, PixelFormat};
pub use settings::{ColourMode, ScanSettings};
pub use types::*;
