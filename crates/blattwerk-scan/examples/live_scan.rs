// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Simulated live-camera scan: a producer pushes frames faster than the
// engine can process them, so the latest-wins queue drops stale frames and
// the sink only ever sees results for recent ones. Run with
// `RUST_LOG=debug` to watch the pipeline log coalescing and shutdown.

use std::sync::Arc;
use std::time::Duration;

use blattwerk_core::{FrameBuffer, PixelFormat};
use blattwerk_engine::{DocumentEngine, StubEngine};
use blattwerk_scan::{ScanOutput, ScanResult, ScannerSession};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // A real deployment wraps the vendor SDK behind DocumentEngine; the
    // stub stands in with a 40 ms "recognition" per frame.
    let engine = Arc::new(StubEngine::new().with_delay(Duration::from_millis(40)));
    let session = ScannerSession::new(Arc::clone(&engine) as Arc<dyn DocumentEngine>);

    session.add_async_listener(|result: ScanResult| match result {
        Ok(ScanOutput::Detections(detections)) => {
            for detection in &detections {
                println!(
                    "document boundary at {:?} (confidence {})",
                    detection.quad.points, detection.confidence
                );
            }
        }
        Ok(ScanOutput::Normalized(image)) => {
            println!("normalized image {}x{}", image.width(), image.height());
        }
        Err(err) => eprintln!("frame failed: {err}"),
    })?;

    // 30 frames at ~100 fps against a 25 fps engine: most frames coalesce.
    for shade in 0..30u8 {
        let frame = FrameBuffer::from_raw(
            &vec![shade; 320 * 240],
            320,
            240,
            PixelFormat::Grayscale,
        )?;
        session.detect_async(frame)?;
        std::thread::sleep(Duration::from_millis(10));
    }

    // Let the last claimed frame finish, then shut down deterministically.
    std::thread::sleep(Duration::from_millis(100));
    if let Some(stats) = session.pipeline_stats() {
        println!(
            "submitted {} frames: {} processed, {} coalesced, {} drained",
            stats.submitted, stats.taken, stats.coalesced, stats.drained
        );
    }
    session.close();
    Ok(())
}
