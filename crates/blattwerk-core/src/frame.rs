// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Owned image frames handed into the scanning pipeline.
//
// A FrameBuffer is always a deep copy of the caller's pixel data: the async
// path outlives the submission call, so the caller's buffer may be reused or
// freed the moment submit returns. Ownership then moves queue -> worker and
// the bytes are released exactly once, on drop.

use crate::error::{Result, ScanError};

/// Pixel layout of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// One byte per pixel.
    Grayscale,
    /// Three bytes per pixel, R-G-B order.
    Rgb888,
    /// Four bytes per pixel, A-R-G-B order.
    Argb8888,
}

impl PixelFormat {
    /// Bytes occupied by one pixel in this format.
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            Self::Grayscale => 1,
            Self::Rgb888 => 3,
            Self::Argb8888 => 4,
        }
    }

    /// Map a pixel byte width back to a format, as inferred from a strided
    /// buffer layout.
    fn from_pixel_stride(pixel_stride: usize) -> Option<Self> {
        match pixel_stride {
            1 => Some(Self::Grayscale),
            3 => Some(Self::Rgb888),
            4 => Some(Self::Argb8888),
            _ => None,
        }
    }
}

/// An owned copy of one image's pixel data plus its geometry.
///
/// Invariants, checked at construction:
/// - `width > 0`, `height > 0`
/// - `stride == width * format.bytes_per_pixel()`
/// - `bytes.len() == stride * height`
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    stride: u32,
    format: PixelFormat,
}

impl FrameBuffer {
    /// Deep-copy raw pixel data into an owned frame.
    ///
    /// Rejects zero dimensions and length mismatches before anything reaches
    /// the engine or the queue. Allocation failure is reported as
    /// `FrameAlloc` and aborts only this one frame.
    pub fn from_raw(bytes: &[u8], width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ScanError::InvalidFrame(format!(
                "zero dimension: {width}x{height}"
            )));
        }
        let stride = width
            .checked_mul(format.bytes_per_pixel())
            .ok_or_else(|| ScanError::InvalidFrame(format!("width {width} overflows stride")))?;
        let expected = stride as usize * height as usize;
        if bytes.len() != expected {
            return Err(ScanError::InvalidFrame(format!(
                "buffer length {} does not match {width}x{height} {format:?} (expected {expected})",
                bytes.len()
            )));
        }

        Ok(Self {
            bytes: copy_pixels(bytes)?,
            width,
            height,
            stride,
            format,
        })
    }

    /// Deep-copy a 2-D strided buffer, inferring geometry and pixel format
    /// from the strides.
    ///
    /// This is the upstream contract for callers handing in a matrix/array
    /// object: `row_stride` is the byte distance between rows,
    /// `pixel_stride` the byte distance between horizontally adjacent
    /// pixels. Width falls out as `row_stride / pixel_stride`, height as
    /// `len / row_stride`, and the format from the pixel byte width
    /// (1 = grayscale, 3 = RGB-888, 4 = ARGB-8888).
    pub fn from_stride_layout(bytes: &[u8], row_stride: usize, pixel_stride: usize) -> Result<Self> {
        if row_stride == 0 || pixel_stride == 0 {
            return Err(ScanError::InvalidFrame(format!(
                "zero stride: row {row_stride}, pixel {pixel_stride}"
            )));
        }
        if row_stride % pixel_stride != 0 || bytes.len() % row_stride != 0 {
            return Err(ScanError::InvalidFrame(format!(
                "strides do not tile the buffer: len {}, row {row_stride}, pixel {pixel_stride}",
                bytes.len()
            )));
        }

        let format = PixelFormat::from_pixel_stride(pixel_stride).ok_or_else(|| {
            ScanError::InvalidFrame(format!("unsupported pixel stride {pixel_stride}"))
        })?;
        let width = u32::try_from(row_stride / pixel_stride)
            .map_err(|_| ScanError::InvalidFrame(format!("row stride {row_stride} too large")))?;
        let height = u32::try_from(bytes.len() / row_stride)
            .map_err(|_| ScanError::InvalidFrame("buffer too tall".into()))?;

        Self::from_raw(bytes, width, height, format)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row byte count.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Total byte length (`stride * height`).
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Copy pixel bytes with a fallible reservation so an oversized frame
/// surfaces as an error instead of aborting the process.
fn copy_pixels(src: &[u8]) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(src.len())
        .map_err(|e| ScanError::FrameAlloc(e.to_string()))?;
    bytes.extend_from_slice(src);
    Ok(bytes)
}
