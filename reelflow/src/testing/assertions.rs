//! Test assertions for run summaries.

use crate::core::{EventLevel, RunStatus};
use crate::pipeline::RunSummary;

/// Asserts that the run ended with `expected`.
pub fn assert_status(summary: &RunSummary, expected: RunStatus) {
    assert_eq!(
        summary.status, expected,
        "Expected status {:?}, got {:?}. Events: {:?}",
        expected,
        summary.status,
        summary.messages()
    );
}

/// Asserts that no warning event was emitted.
pub fn assert_no_warnings(summary: &RunSummary) {
    let warnings = summary.warnings();
    assert!(
        warnings.is_empty(),
        "Expected no warnings, got: {:?}",
        warnings.iter().map(|e| &e.message).collect::<Vec<_>>()
    );
}

/// Asserts that exactly one warning was emitted, with `message`.
pub fn assert_single_warning(summary: &RunSummary, message: &str) {
    let warnings: Vec<&str> = summary
        .warnings()
        .into_iter()
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(warnings, vec![message], "Unexpected warnings");
}

/// Asserts that the last event is a success event with `message`.
pub fn assert_completed_with(summary: &RunSummary, message: &str) {
    let last = summary.last_event();
    assert!(
        last.is_some_and(|e| e.level == EventLevel::Success && e.message == message),
        "Expected final success event '{}', got {:?}",
        message,
        last
    );
}

/// Asserts that at least one error event mentions `fragment`.
pub fn assert_error_mentions(summary: &RunSummary, fragment: &str) {
    assert!(
        summary
            .events_at(EventLevel::Error)
            .any(|e| e.message.contains(fragment)),
        "Expected an error event containing '{}'. Events: {:?}",
        fragment,
        summary.messages()
    );
}
