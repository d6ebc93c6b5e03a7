//! Stage contracts.
//!
//! Each of the five pipeline stages is a narrow async capability: a batch goes
//! in, an order-preserving sub-sequence of results comes out. Adapters isolate
//! per-item failures themselves; only a fault that prevents the stage from
//! returning anything is reported as [`StageFault`].

mod batch;

pub use batch::BatchRunner;

use crate::core::{
    AcquireQuery, CaptionResult, PublishItem, PublishOutcome, TranscriptRef, VideoRef,
};
use crate::errors::StageFault;
use async_trait::async_trait;
use std::fmt::Debug;

/// Fetches raw video for a seed query.
#[async_trait]
pub trait AcquireStage: Send + Sync + Debug {
    /// Returns the adapter name.
    fn name(&self) -> &str;

    /// Acquires videos for the query.
    ///
    /// The number of results is bounded by [`AcquireQuery::len`] times the
    /// per-query limit.
    async fn run_batch(&self, query: &AcquireQuery) -> Result<Vec<VideoRef>, StageFault>;
}

/// Re-encodes or annotates raw video.
#[async_trait]
pub trait TransformStage: Send + Sync + Debug {
    /// Returns the adapter name.
    fn name(&self) -> &str;

    /// Transforms each video, returning the processed survivors in input order.
    async fn run_batch(&self, videos: &[VideoRef]) -> Result<Vec<VideoRef>, StageFault>;
}

/// Produces a transcript for each processed video.
#[async_trait]
pub trait TranscribeStage: Send + Sync + Debug {
    /// Returns the adapter name.
    fn name(&self) -> &str;

    /// Transcribes each video, returning the surviving transcripts in input order.
    ///
    /// Each transcript records the video it came from in [`TranscriptRef::source`].
    async fn run_batch(&self, videos: &[VideoRef]) -> Result<Vec<TranscriptRef>, StageFault>;
}

/// Generates a caption and hashtags for each video/transcript pair.
#[async_trait]
pub trait CaptionStage: Send + Sync + Debug {
    /// Returns the adapter name.
    fn name(&self) -> &str;

    /// Captions each pair, returning the surviving results in input order.
    async fn run_batch(
        &self,
        pairs: &[(VideoRef, TranscriptRef)],
    ) -> Result<Vec<CaptionResult>, StageFault>;
}

/// Hands finished videos and metadata to the publishing platform.
#[async_trait]
pub trait PublishStage: Send + Sync + Debug {
    /// Returns the adapter name.
    fn name(&self) -> &str;

    /// Publishes each item, returning the confirmed outcomes in input order.
    async fn run_batch(&self, items: &[PublishItem]) -> Result<Vec<PublishOutcome>, StageFault>;
}
