//! The run event log.

use super::mirror::{EventMirror, MirrorError, MirrorRow};
use super::store::{LocalEventStore, MemoryEventStore};
use crate::core::{EventLevel, RunEvent};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Default time allowed for a single mirror write.
pub const DEFAULT_MIRROR_TIMEOUT: Duration = Duration::from_secs(10);

/// Append-only event recorder with a durable local destination and an
/// optional best-effort mirror.
///
/// Logging never fails observably: local store errors are reported through
/// `tracing`, mirror errors additionally leave a secondary error entry in the
/// local store.
pub struct EventLog {
    local: Arc<dyn LocalEventStore>,
    mirror: Option<Arc<dyn EventMirror>>,
    mirror_timeout: Duration,
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLog")
            .field("local", &self.local)
            .field("mirror", &self.mirror.is_some())
            .field("mirror_timeout", &self.mirror_timeout)
            .finish()
    }
}

impl EventLog {
    /// Creates a log writing to `local` only.
    #[must_use]
    pub fn new(local: Arc<dyn LocalEventStore>) -> Self {
        Self {
            local,
            mirror: None,
            mirror_timeout: DEFAULT_MIRROR_TIMEOUT,
        }
    }

    /// Creates a log over a fresh in-memory store, returning both.
    #[must_use]
    pub fn in_memory() -> (Self, Arc<MemoryEventStore>) {
        let store = Arc::new(MemoryEventStore::new());
        (Self::new(Arc::clone(&store) as Arc<dyn LocalEventStore>), store)
    }

    /// Mirrors every event to `mirror`.
    #[must_use]
    pub fn with_mirror(mut self, mirror: Arc<dyn EventMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Sets the time allowed for one mirror write.
    #[must_use]
    pub fn with_mirror_timeout(mut self, timeout: Duration) -> Self {
        self.mirror_timeout = timeout;
        self
    }

    /// Returns true if a mirror is configured.
    #[must_use]
    pub fn has_mirror(&self) -> bool {
        self.mirror.is_some()
    }

    /// Records an event and returns it.
    ///
    /// The local write completes before the mirror is attempted. Every call
    /// produces a new entry, even for identical arguments.
    pub async fn log(&self, message: impl Into<String>, level: EventLevel) -> RunEvent {
        let event = RunEvent::new(level, message);
        self.write_local(&event);
        echo(&event);

        if let Some(mirror) = &self.mirror {
            if let Err(err) = self.mirror_event(mirror.as_ref(), &event).await {
                warn!(error = %err, event_id = %event.id, "event mirror write failed");
                self.write_local(&RunEvent::error(format!("event mirror write failed: {err}")));
            }
        }

        event
    }

    /// Records an info event.
    pub async fn info(&self, message: impl Into<String>) -> RunEvent {
        self.log(message, EventLevel::Info).await
    }

    /// Records a success event.
    pub async fn success(&self, message: impl Into<String>) -> RunEvent {
        self.log(message, EventLevel::Success).await
    }

    /// Records a warning event.
    pub async fn warning(&self, message: impl Into<String>) -> RunEvent {
        self.log(message, EventLevel::Warning).await
    }

    /// Records an error event.
    pub async fn error(&self, message: impl Into<String>) -> RunEvent {
        self.log(message, EventLevel::Error).await
    }

    async fn mirror_event(&self, mirror: &dyn EventMirror, event: &RunEvent) -> Result<(), MirrorError> {
        let row = MirrorRow::from(event);
        tokio::time::timeout(self.mirror_timeout, mirror.append_row(&row))
            .await
            .unwrap_or(Err(MirrorError::Timeout(self.mirror_timeout)))
    }

    fn write_local(&self, event: &RunEvent) {
        if let Err(err) = self.local.append(event) {
            error!(error = %err, event_id = %event.id, message = %event.message, "failed to write event to local log");
        }
    }
}

fn echo(event: &RunEvent) {
    match event.level {
        EventLevel::Info => info!(event_id = %event.id, "{}", event.message),
        EventLevel::Success => info!(event_id = %event.id, outcome = "success", "{}", event.message),
        EventLevel::Warning => warn!(event_id = %event.id, "{}", event.message),
        EventLevel::Error => error!(event_id = %event.id, "{}", event.message),
    }
}
