//! Process-wide logging setup.
//!
//! Run events go through [`EventLog`](crate::events::EventLog); everything
//! else is plain `tracing` with the subscriber installed here.

mod subscriber;

pub use subscriber::{init_test_tracing, init_tracing, LogFormat};
