//! Replay of recorded landmark frames (JSON Lines) through a detector.

use anyhow::{Context, Result};
use faceshape_core::{FaceShapeDetector, Transform};
use serde::Deserialize;
use std::io::{BufRead, Write};

/// One recorded tracker frame.
#[derive(Debug, Deserialize)]
pub struct Frame {
    /// Flat xyz landmark buffer.
    pub positions: Vec<f32>,
    /// Mesh world matrix, column-major.
    #[serde(default)]
    pub world: Option<[f32; 16]>,
    /// Camera view-projection matrix, column-major.
    #[serde(default)]
    pub projection: Option<[f32; 16]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// One JSON `DetectionResult` per line.
    Json,
    /// `frame N: Detected: Oval (54%)`.
    Summary,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub frames: usize,
    pub skipped: usize,
}

/// Feed every frame in `input` to `detector`, writing one line per frame.
///
/// Malformed lines are logged and skipped; blank lines are ignored.
pub fn replay<R: BufRead, W: Write>(
    detector: &mut FaceShapeDetector,
    input: R,
    mut output: W,
    mode: OutputMode,
) -> Result<ReplayStats> {
    let mut stats = ReplayStats::default();

    for (line_no, line) in input.lines().enumerate() {
        let line = line.with_context(|| format!("reading frame line {}", line_no + 1))?;
        if line.trim().is_empty() {
            continue;
        }

        let frame: Frame = match serde_json::from_str(&line) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(line = line_no + 1, error = %e, "skipping malformed frame");
                stats.skipped += 1;
                continue;
            }
        };

        let world = frame.world.as_ref().map(Transform::from_cols);
        let projection = frame.projection.as_ref().map(Transform::from_cols);
        let result = detector.detect(&frame.positions, world.as_ref(), projection.as_ref());

        match mode {
            OutputMode::Json => {
                serde_json::to_writer(&mut output, &result)?;
                writeln!(output)?;
            }
            OutputMode::Summary => {
                writeln!(output, "frame {}: Detected: {result}", stats.frames)?;
            }
        }
        stats.frames += 1;
    }

    output.flush()?;
    tracing::info!(frames = stats.frames, skipped = stats.skipped, "replay finished");
    Ok(stats)
}
