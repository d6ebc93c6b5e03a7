//! Core domain model types for reelflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage names, run status and event levels
//! - Content item references passed between stages
//! - Per-item results and run events

mod event;
mod item;
mod payload;
mod status;

pub use event::RunEvent;
pub use item::{survivors, ItemResult};
pub use payload::{
    AcquireQuery, Caption, CaptionResult, Hashtag, HashtagSet, PublishItem, PublishOutcome,
    TranscriptRef, VideoRef,
};
pub use status::{EventLevel, RunStatus, StageName};
