// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rectified document images produced by the engine.

use blattwerk_core::{PixelFormat, Result, ScanError};
use tracing::info;

/// One perspective-corrected document image plus its geometry.
///
/// Owned by the caller once returned; the pixel bytes are released on drop.
/// Unlike `FrameBuffer`, the row stride may exceed `width * bytes_per_pixel`
/// because some engines emit row-padded output.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    stride: u32,
    format: PixelFormat,
}

impl NormalizedImage {
    /// Wrap engine output, validating the geometry.
    pub fn from_parts(
        bytes: Vec<u8>,
        width: u32,
        height: u32,
        stride: u32,
        format: PixelFormat,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ScanError::InvalidFrame(format!(
                "zero dimension: {width}x{height}"
            )));
        }
        let row_bytes = width.checked_mul(format.bytes_per_pixel()).ok_or_else(|| {
            ScanError::InvalidFrame(format!("width {width} overflows row size"))
        })?;
        if stride < row_bytes {
            return Err(ScanError::InvalidFrame(format!(
                "stride {stride} too small for width {width} {format:?}"
            )));
        }
        if bytes.len() != stride as usize * height as usize {
            return Err(ScanError::InvalidFrame(format!(
                "buffer length {} does not match stride {stride} x height {height}",
                bytes.len()
            )));
        }

        Ok(Self {
            bytes,
            width,
            height,
            stride,
            format,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the image and return the raw pixel bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Write the image to a file. The format is inferred from the file
    /// extension by the `image` crate.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let path = path.as_ref();
        let tight = self.tight_rows();

        let save_result = match self.format {
            PixelFormat::Grayscale => {
                image::GrayImage::from_raw(self.width, self.height, tight)
                    .ok_or_else(|| ScanError::Image("grayscale buffer underflow".into()))?
                    .save(path)
            }
            PixelFormat::Rgb888 => image::RgbImage::from_raw(self.width, self.height, tight)
                .ok_or_else(|| ScanError::Image("RGB buffer underflow".into()))?
                .save(path),
            PixelFormat::Argb8888 => {
                image::RgbaImage::from_raw(self.width, self.height, argb_to_rgba(tight))
                    .ok_or_else(|| ScanError::Image("ARGB buffer underflow".into()))?
                    .save(path)
            }
        };

        save_result.map_err(|err| {
            ScanError::Image(format!("failed to save image to {}: {err}", path.display()))
        })?;

        info!(path = %path.display(), "normalized image saved");
        Ok(())
    }

    /// Copy the pixel rows without any stride padding.
    fn tight_rows(&self) -> Vec<u8> {
        let row_bytes = (self.width * self.format.bytes_per_pixel()) as usize;
        if row_bytes == self.stride as usize {
            return self.bytes.clone();
        }
        let mut tight = Vec::with_capacity(row_bytes * self.height as usize);
        for row in self.bytes.chunks_exact(self.stride as usize) {
            tight.extend_from_slice(&row[..row_bytes]);
        }
        tight
    }
}

/// Reorder A-R-G-B bytes into the R-G-B-A order the `image` crate expects.
fn argb_to_rgba(mut bytes: Vec<u8>) -> Vec<u8> {
    for pixel in bytes.chunks_exact_mut(4) {
        pixel.rotate_left(1);
    }
    bytes
}
