// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blattwerk — the recognition engine boundary.
//
// The detection/normalization algorithm itself is an external collaborator:
// this crate defines the trait it is invoked through, the normalized-image
// result it returns, file decode/encode glue, and a deterministic stub
// engine for tests and demos.

pub mod file;
pub mod normalized;
pub mod stub;
pub mod traits;

pub use file::read_frame;
pub use normalized::NormalizedImage;
pub use stub::StubEngine;
pub use traits::{DocumentEngine, EngineError, EngineResult};
