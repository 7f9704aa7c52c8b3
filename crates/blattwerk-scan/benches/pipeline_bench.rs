// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the frame queue hot path: the per-frame cost a
// producer pays on submit (deep copy + coalesce + enqueue), with no worker
// attached so the queue stays saturated and every submit coalesces.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use blattwerk_core::{FrameBuffer, PixelFormat};
use blattwerk_scan::{FrameQueue, FrameTask};

/// Benchmark submit on a VGA-sized grayscale frame.
///
/// Each iteration copies the caller's buffer into an owned frame and pushes
/// it through the latest-wins policy, which is the complete producer-side
/// cost of one camera frame.
fn bench_submit_coalesce(c: &mut Criterion) {
    let queue = FrameQueue::new();
    let pixels = vec![128u8; 640 * 480];

    c.bench_function("frame_submit_coalesce (640x480 gray)", |b| {
        b.iter(|| {
            let frame =
                FrameBuffer::from_raw(black_box(&pixels), 640, 480, PixelFormat::Grayscale)
                    .expect("valid frame");
            queue
                .submit(FrameTask::Detect { frame })
                .expect("queue accepts while running");
        });
    });
}

criterion_group!(benches, bench_submit_coalesce);
criterion_main!(benches);
