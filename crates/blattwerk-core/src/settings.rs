// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Runtime scan settings, supplied by the caller as JSON and forwarded to
// the engine after validation.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Colour mode of normalized output images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColourMode {
    Colour,
    Grayscale,
    Binary,
}

/// Engine runtime settings.
///
/// Callers pass these as a JSON string; unknown fields are rejected so a
/// typo fails loudly instead of silently running with defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanSettings {
    /// Colour mode for normalized images.
    pub colour_mode: ColourMode,
    /// Maximum number of boundary candidates the engine should report.
    pub max_quads: u32,
    /// Detections below this confidence are discarded by the engine.
    pub min_boundary_confidence: u8,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            colour_mode: ColourMode::Colour,
            max_quads: 4,
            min_boundary_confidence: 0,
        }
    }
}

impl ScanSettings {
    /// Parse settings from a caller-supplied JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
