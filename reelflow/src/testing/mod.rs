//! Testing utilities for reelflow pipelines.
//!
//! This module provides:
//! - Scripted mock stages
//! - A mock pipeline fixture over an in-memory event log
//! - Assertions on run summaries

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_completed_with, assert_error_mentions, assert_no_warnings, assert_single_warning,
    assert_status,
};
pub use fixtures::MockPipeline;
pub use mocks::{Script, ScriptedStage};
