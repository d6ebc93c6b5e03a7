//! Run event recording.
//!
//! [`EventLog`] is the single sink the orchestrator writes to. It is injected,
//! never global.

mod log;
mod mirror;
mod store;

pub use log::{EventLog, DEFAULT_MIRROR_TIMEOUT};
#[cfg(feature = "http")]
pub use mirror::HttpRowMirror;
pub use mirror::{EventMirror, MirrorError, MirrorRow};
pub use store::{FileEventStore, LocalEventStore, MemoryEventStore};
