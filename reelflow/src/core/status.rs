//! Stage names, run status and event level enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the five fixed phases of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Fetches raw video from remote sources.
    Acquire,
    /// Re-encodes or annotates raw video.
    Transform,
    /// Produces a text transcript from processed video.
    Transcribe,
    /// Generates a caption and hashtag set.
    Caption,
    /// Hands finished video and metadata to the platform.
    Publish,
}

impl StageName {
    /// All stages in execution order.
    pub const ALL: [Self; 5] = [
        Self::Acquire,
        Self::Transform,
        Self::Transcribe,
        Self::Caption,
        Self::Publish,
    ];

    /// Returns the display name used in event messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Acquire => "Acquire",
            Self::Transform => "Transform",
            Self::Transcribe => "Transcribe",
            Self::Caption => "Caption",
            Self::Publish => "Publish",
        }
    }

    /// Returns the stage that runs after this one, if any.
    #[must_use]
    pub const fn next(&self) -> Option<Self> {
        match self {
            Self::Acquire => Some(Self::Transform),
            Self::Transform => Some(Self::Transcribe),
            Self::Transcribe => Some(Self::Caption),
            Self::Caption => Some(Self::Publish),
            Self::Publish => None,
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The lifecycle status of a pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The run is in progress.
    #[default]
    Running,
    /// The run published at least one item but some stage dropped items.
    PartialSuccess,
    /// Every stage kept every item.
    Succeeded,
    /// A stage yielded zero survivors.
    Aborted,
    /// A stage faulted as a whole.
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::PartialSuccess => write!(f, "partial_success"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Aborted => write!(f, "aborted"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl RunStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Returns true if the run published something.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded | Self::PartialSuccess)
    }

    /// Returns true if the transition `self -> next` is allowed.
    ///
    /// Only `Running` may move, and only into a terminal state.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(self, Self::Running) && next.is_terminal()
    }
}

/// Severity of a run event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    /// Informational progress.
    Info,
    /// A positive terminal outcome.
    Success,
    /// A recoverable problem, such as dropped items.
    Warning,
    /// A run-ending problem.
    Error,
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_name_display() {
        assert_eq!(StageName::Acquire.to_string(), "Acquire");
        assert_eq!(StageName::Transcribe.to_string(), "Transcribe");
        assert_eq!(StageName::Publish.to_string(), "Publish");
    }

    #[test]
    fn test_stage_order() {
        let mut stage = StageName::Acquire;
        let mut visited = vec![stage];
        while let Some(next) = stage.next() {
            visited.push(next);
            stage = next;
        }
        assert_eq!(visited, StageName::ALL.to_vec());
    }

    #[test]
    fn test_run_status_transitions() {
        assert!(RunStatus::Running.can_transition_to(RunStatus::Aborted));
        assert!(RunStatus::Running.can_transition_to(RunStatus::PartialSuccess));
        assert!(!RunStatus::Running.can_transition_to(RunStatus::Running));
        assert!(!RunStatus::Aborted.can_transition_to(RunStatus::Failed));
        assert!(!RunStatus::Succeeded.can_transition_to(RunStatus::PartialSuccess));
    }

    #[test]
    fn test_run_status_serialize() {
        let json = serde_json::to_string(&RunStatus::PartialSuccess).unwrap();
        assert_eq!(json, r#""partial_success""#);

        let deserialized: RunStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, RunStatus::PartialSuccess);
    }

    #[test]
    fn test_event_level_serialize() {
        assert_eq!(serde_json::to_string(&EventLevel::Warning).unwrap(), r#""warning""#);
        assert_eq!(EventLevel::Success.to_string(), "success");
    }
}
