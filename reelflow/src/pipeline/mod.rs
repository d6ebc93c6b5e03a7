//! Pipeline building and execution.
//!
//! This module provides:
//! - The orchestrator and its builder
//! - The per-run state machine and summary
//! - Cross-stage correlation
//! - A repeating scheduler

mod builder;
mod correlate;
mod orchestrator;
mod run;
mod schedule;
mod summary;


pub use builder::OrchestratorBuilder;
pub use correlate::{correlate, CorrelationError, DerivedFrom};
pub use orchestrator::{Orchestrator, StageSet};
pub use run::PipelineRun;
pub use schedule::PipelineScheduler;
pub use summary::{RunSummary, StageCount};
