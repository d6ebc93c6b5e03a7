//! Error types for reelflow.
//!
//! Item failures are not errors: they surface as a shorter stage output. The
//! types here cover faults that stop a stage as a whole, run lifecycle
//! violations and configuration problems.

use crate::core::{RunStatus, StageName};
use crate::pipeline::RunSummary;
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Boxed error source carried by [`StageFault`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The main error type for reelflow operations.
#[derive(Debug, Error)]
pub enum ReelflowError {
    /// A stage could not return any result at all.
    ///
    /// Carries the run summary so the caller keeps the audit trail.
    #[error("{stage} stage failed: {source}")]
    StageFatal {
        /// The stage that faulted.
        stage: StageName,
        /// The underlying fault.
        #[source]
        source: StageFault,
        /// Summary of the run up to the fault.
        summary: Box<RunSummary>,
    },

    /// `run()` was called while another run on the same orchestrator is active.
    #[error("A pipeline run is already in progress")]
    RunInProgress,

    /// Configuration could not be resolved.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// The run state machine rejected a status change.
    #[error("Invalid run status transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: RunStatus,
        /// Requested status.
        to: RunStatus,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error.
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReelflowError {
    /// Returns the run summary attached to a stage-fatal error.
    #[must_use]
    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            Self::StageFatal { summary, .. } => Some(summary),
            _ => None,
        }
    }

    /// Returns the stage that faulted, if this is a stage-fatal error.
    #[must_use]
    pub fn stage(&self) -> Option<StageName> {
        match self {
            Self::StageFatal { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// A fault that prevents a stage from producing any result.
#[derive(Debug, Error)]
pub struct StageFault {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl StageFault {
    /// Creates a fault with a message and no underlying source.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying error.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the fault message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for StageFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<anyhow::Error> for StageFault {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{err:#}"))
    }
}

impl From<std::io::Error> for StageFault {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string()).with_source(err)
    }
}

/// An item failed because the service or tool behind the stage could not be
/// reached at all.
///
/// When every item of a batch fails this way, [`BatchRunner::try_survivors`]
/// turns the batch into a [`StageFault`].
///
/// [`BatchRunner::try_survivors`]: crate::stages::BatchRunner::try_survivors
#[derive(Debug, Error)]
#[error("{service} is unavailable")]
pub struct ServiceUnavailable {
    service: String,
    #[source]
    source: BoxError,
}

impl ServiceUnavailable {
    /// Wraps the transport or spawn error that made `service` unreachable.
    #[must_use]
    pub fn new(service: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            service: service.into(),
            source: source.into(),
        }
    }

    /// Returns the unreachable service.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns true if `err` or any error it wraps is a [`ServiceUnavailable`].
    #[must_use]
    pub fn is_cause_of(err: &anyhow::Error) -> bool {
        err.chain().any(|cause| cause.is::<Self>())
    }
}

/// Configuration resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// One or more required environment variables are unset or empty.
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    /// A value was present but could not be used.
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue {
        /// Setting or variable name.
        key: String,
        /// What was wrong with it.
        message: String,
    },

    /// The orchestrator was built without an adapter for a stage.
    #[error("No adapter configured for the {0} stage")]
    MissingStage(StageName),
}

impl ConfigError {
    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_fault_display() {
        let fault = StageFault::new("service unreachable");
        assert_eq!(fault.to_string(), "service unreachable");
        assert!(fault.source().is_none());
    }

    #[test]
    fn test_stage_fault_with_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let fault = StageFault::new("cannot create output directory").with_source(io);
        assert!(fault.source().is_some());
    }

    #[test]
    fn test_stage_fault_from_anyhow() {
        let err = anyhow::anyhow!("connection refused").context("search request failed");
        let fault = StageFault::from(err);
        assert_eq!(fault.message(), "search request failed: connection refused");
    }

    #[test]
    fn test_service_unavailable_found_under_context() {
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = anyhow::Error::new(ServiceUnavailable::new("stock video search", refused))
            .context("search for 'waves' failed");

        assert!(ServiceUnavailable::is_cause_of(&err));
        assert_eq!(
            format!("{err:#}"),
            "search for 'waves' failed: stock video search is unavailable: refused"
        );
        assert!(!ServiceUnavailable::is_cause_of(&anyhow::anyhow!("HTTP 500")));
    }

    #[test]
    fn test_stage_fatal_display() {
        let err = ReelflowError::StageFatal {
            stage: StageName::Transform,
            source: StageFault::new("disk full"),
            summary: Box::new(RunSummary::empty()),
        };
        assert_eq!(err.to_string(), "Transform stage failed: disk full");
        assert_eq!(err.stage(), Some(StageName::Transform));
        assert!(err.summary().is_some());
    }

    #[test]
    fn test_missing_variables_lists_all() {
        let err = ConfigError::MissingVariables(vec!["CAPTION_API_KEY".into(), "PUBLISH_PASSWORD".into()]);
        assert_eq!(
            err.to_string(),
            "Missing required environment variables: CAPTION_API_KEY, PUBLISH_PASSWORD"
        );
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = ReelflowError::InvalidTransition {
            from: RunStatus::Aborted,
            to: RunStatus::Succeeded,
        };
        assert_eq!(err.to_string(), "Invalid run status transition: aborted -> succeeded");
    }
}
