// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// File decode glue: image files in, frames out.

use blattwerk_core::{FrameBuffer, PixelFormat, Result, ScanError};
use image::DynamicImage;
use tracing::debug;

/// Decode an image file into an owned frame.
///
/// Grayscale sources stay grayscale; everything else is flattened to
/// RGB-888 (the engine contract has no alpha-bearing input except ARGB
/// buffers handed in directly).
pub fn read_frame(path: impl AsRef<std::path::Path>) -> Result<FrameBuffer> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|err| {
        ScanError::Image(format!("failed to open {}: {err}", path.display()))
    })?;

    debug!(
        path = %path.display(),
        width = img.width(),
        height = img.height(),
        "image file decoded"
    );

    match img {
        DynamicImage::ImageLuma8(gray) => {
            let (width, height) = gray.dimensions();
            FrameBuffer::from_raw(gray.as_raw(), width, height, PixelFormat::Grayscale)
        }
        other => {
            let rgb = other.to_rgb8();
            let (width, height) = rgb.dimensions();
            FrameBuffer::from_raw(rgb.as_raw(), width, height, PixelFormat::Rgb888)
        }
    }
}
