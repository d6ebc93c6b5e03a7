//! Local durable destinations for run events.

use crate::core::{EventLevel, RunEvent};
use parking_lot::{Mutex, RwLock};
use std::fmt::Debug;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A synchronous, append-only event destination.
pub trait LocalEventStore: Send + Sync + Debug {
    /// Appends one event. Implementations must not reorder or merge events.
    fn append(&self, event: &RunEvent) -> io::Result<()>;
}

/// Appends events as JSON lines to a file, flushing after each write.
#[derive(Debug)]
pub struct FileEventStore {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileEventStore {
    /// Creates a store writing to `path`. Parent directories are created lazily.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    /// Returns the log file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every event currently in the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line is not a valid event.
    pub fn read_all(&self) -> io::Result<Vec<RunEvent>> {
        let content = fs::read_to_string(&self.path)?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(io::Error::from))
            .collect()
    }

    fn open(&self) -> io::Result<File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        OpenOptions::new().create(true).append(true).open(&self.path)
    }
}

impl LocalEventStore for FileEventStore {
    fn append(&self, event: &RunEvent) -> io::Result<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut guard = self.file.lock();
        if guard.is_none() {
            *guard = Some(self.open()?);
        }
        let Some(file) = guard.as_mut() else {
            return Err(io::Error::other("event log file unavailable"));
        };

        if let Err(err) = file.write_all(line.as_bytes()).and_then(|()| file.flush()) {
            // Reopen on the next append.
            *guard = None;
            return Err(err);
        }
        Ok(())
    }
}

/// Keeps events in memory. Used by tests and fixtures.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: RwLock<Vec<RunEvent>>,
}

impl MemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all stored events.
    #[must_use]
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.read().clone()
    }

    /// Returns the stored messages in order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.events.read().iter().map(|e| e.message.clone()).collect()
    }

    /// Returns the events at the given level.
    #[must_use]
    pub fn events_at(&self, level: EventLevel) -> Vec<RunEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }

    /// Returns the number of stored events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Removes all events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl LocalEventStore for MemoryEventStore {
    fn append(&self, event: &RunEvent) -> io::Result<()> {
        self.events.write().push(event.clone());
        Ok(())
    }
}
