//! Utility functions for timestamps and run identifiers.

pub mod timestamps;

pub use timestamps::{format_iso8601, format_row_timestamp, iso_timestamp, now_utc, Timestamp};

use uuid::Uuid;

/// Generates a new random (v4) UUID for a pipeline run.
#[must_use]
pub fn generate_run_id() -> Uuid {
    Uuid::new_v4()
}

/// Generates a new time-ordered (v7) UUID for an event.
#[must_use]
pub fn generate_event_id() -> Uuid {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_run_id_is_v4() {
        let id = generate_run_id();
        assert_eq!(id.get_version_num(), 4);
    }

    #[test]
    fn test_event_ids_are_distinct() {
        let first = generate_event_id();
        let second = generate_event_id();
        assert_ne!(first, second);
        assert_eq!(first.get_version_num(), 7);
    }
}
