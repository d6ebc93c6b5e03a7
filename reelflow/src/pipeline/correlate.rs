//! Re-aligning a stage's input with its surviving outputs.
//!
//! Stages return an order-preserving sub-sequence of their input. To pair a
//! survivor with the input it came from, each survivor names its origin and
//! [`correlate`] walks both lists once, in order.

use crate::core::{CaptionResult, PublishItem, PublishOutcome, TranscriptRef, VideoRef};
use thiserror::Error;

/// Links a stage output to the input item it was produced from.
pub trait DerivedFrom<P> {
    /// Returns true if `self` was produced from `previous`.
    fn derived_from(&self, previous: &P) -> bool;
}

impl DerivedFrom<VideoRef> for TranscriptRef {
    fn derived_from(&self, previous: &VideoRef) -> bool {
        &self.source == previous
    }
}

impl DerivedFrom<(VideoRef, TranscriptRef)> for CaptionResult {
    fn derived_from(&self, previous: &(VideoRef, TranscriptRef)) -> bool {
        self.video == previous.0
    }
}

impl DerivedFrom<PublishItem> for PublishOutcome {
    fn derived_from(&self, previous: &PublishItem) -> bool {
        self.video == previous.video
    }
}

/// A survivor that is not an in-order match for any remaining input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("output item {index} does not match any remaining input item (reordered or foreign output)")]
pub struct CorrelationError {
    /// Position of the offending survivor.
    pub index: usize,
}

/// Returns the inputs that produced `survivors`, in order.
///
/// The result has the same length as `survivors`, so the two can be zipped.
///
/// # Errors
///
/// Returns [`CorrelationError`] if a survivor cannot be matched against the
/// inputs that remain after the previous match.
pub fn correlate<P, S>(previous: &[P], survivors: &[S]) -> Result<Vec<P>, CorrelationError>
where
    P: Clone,
    S: DerivedFrom<P>,
{
    let mut remaining = previous.iter();
    survivors
        .iter()
        .enumerate()
        .map(|(index, survivor)| {
            remaining
                .find(|candidate| survivor.derived_from(candidate))
                .cloned()
                .ok_or(CorrelationError { index })
        })
        .collect()
}
