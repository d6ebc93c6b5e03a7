//! Per-item outcome of a stage.

use serde::{Deserialize, Serialize};

/// The outcome of processing a single item inside a stage.
///
/// Item failures never cross the stage boundary as errors; they only make the
/// stage output shorter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemResult<T> {
    /// The item was processed.
    Succeeded(T),
    /// The item was dropped.
    Failed {
        /// Human-readable cause.
        cause: String,
    },
}

impl<T> ItemResult<T> {
    /// Creates a failed result.
    #[must_use]
    pub fn failed(cause: impl Into<String>) -> Self {
        Self::Failed {
            cause: cause.into(),
        }
    }

    /// Returns true if the item succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Returns the value if the item succeeded.
    #[must_use]
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Succeeded(value) => Some(value),
            Self::Failed { .. } => None,
        }
    }

    /// Returns the failure cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&str> {
        match self {
            Self::Succeeded(_) => None,
            Self::Failed { cause } => Some(cause),
        }
    }
}

impl<T> From<anyhow::Result<T>> for ItemResult<T> {
    fn from(result: anyhow::Result<T>) -> Self {
        match result {
            Ok(value) => Self::Succeeded(value),
            Err(err) => Self::failed(format!("{err:#}")),
        }
    }
}

/// Keeps the successful values in order, discarding failures.
pub fn survivors<T>(results: impl IntoIterator<Item = ItemResult<T>>) -> Vec<T> {
    results.into_iter().filter_map(ItemResult::ok).collect()
}
