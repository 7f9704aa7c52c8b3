// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Blattwerk document scanner.

use serde::{Deserialize, Serialize};

/// A single 2-D pixel coordinate, as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Four ordered corner points describing a detected document boundary.
///
/// Corner order follows the engine convention: top-left, top-right,
/// bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quad {
    pub points: [Point; 4],
}

impl Quad {
    pub fn new(points: [Point; 4]) -> Self {
        Self { points }
    }

    /// Build a quad from flat coordinates, in corner order.
    pub fn from_coords(coords: [(i32, i32); 4]) -> Self {
        Self {
            points: coords.map(|(x, y)| Point::new(x, y)),
        }
    }

    /// The axis-aligned quad covering a full `width` x `height` frame.
    pub fn full_frame(width: u32, height: u32) -> Self {
        let right = width.saturating_sub(1) as i32;
        let bottom = height.saturating_sub(1) as i32;
        Self::from_coords([(0, 0), (right, 0), (right, bottom), (0, bottom)])
    }
}

/// One detected document boundary.
///
/// Detections are reported in engine order, which is not guaranteed to be
/// sorted by confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    /// Engine confidence that this quad is a document boundary.
    pub confidence: i32,
    /// The detected boundary corners.
    pub quad: Quad,
}

impl Detection {
    pub fn new(confidence: i32, quad: Quad) -> Self {
        Self { confidence, quad }
    }
}
