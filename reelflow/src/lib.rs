//! # Reelflow
//!
//! Batch orchestration for a five-stage short-form video pipeline:
//! Acquire, Transform, Transcribe, Caption and Publish.
//!
//! Reelflow provides:
//!
//! - **Partial success**: items that fail inside a stage are dropped, the rest
//!   continue; a stage that yields nothing aborts the run
//! - **Correlation**: each stage's survivors are matched back to the items
//!   they came from, so later stages always pair the right video with the
//!   right transcript and caption
//! - **Run events**: every run records an ordered, levelled event log with a
//!   best-effort remote mirror
//! - **Adapters**: command, HTTP and script backed implementations of each
//!   stage, isolated behind narrow traits
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reelflow::prelude::*;
//!
//! let settings = PipelineSettings::new().with_env_lists(|k| std::env::var(k).ok());
//! let credentials = Credentials::from_env()?;
//! init_tracing(settings.logging.format, &settings.logging.filter);
//!
//! let orchestrator = standard_orchestrator(&settings, &credentials)?;
//! let summary = orchestrator.run().await?;
//! println!("{}: {} published", summary.status, summary.published());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod adapters;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    #[cfg(feature = "http")]
    pub use crate::adapters::standard_orchestrator;
    pub use crate::adapters::standard_event_log;
    pub use crate::config::{Credentials, PipelineSettings};
    pub use crate::core::{
        AcquireQuery, Caption, CaptionResult, EventLevel, Hashtag, HashtagSet, PublishItem,
        PublishOutcome, RunEvent, RunStatus, StageName, TranscriptRef, VideoRef,
    };
    pub use crate::errors::{ConfigError, ReelflowError, ServiceUnavailable, StageFault};
    pub use crate::events::{EventLog, FileEventStore, MemoryEventStore};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{Orchestrator, PipelineScheduler, RunSummary, StageCount, StageSet};
    pub use crate::stages::{
        AcquireStage, BatchRunner, CaptionStage, PublishStage, TranscribeStage, TransformStage,
    };
    pub use crate::utils::{iso_timestamp, Timestamp};
}
