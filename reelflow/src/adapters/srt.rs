//! SubRip subtitle rendering.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// One timed transcript segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Spoken text.
    pub text: String,
}

/// Formats seconds as `HH:MM:SS,mmm`. Negative input clamps to zero.
///
/// ```
/// use reelflow::adapters::format_srt_timestamp;
///
/// assert_eq!(format_srt_timestamp(3725.5), "01:02:05,500");
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}

/// Renders segments as an SRT document, numbering from 1.
#[must_use]
pub fn render_srt(segments: &[Segment]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_srt_timestamp(segment.start),
            format_srt_timestamp(segment.end),
            segment.text.trim()
        );
    }
    out
}
