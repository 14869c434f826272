//! Worker tasks that back the persistence engine.
//!
//! The autosave worker debounces dirty state into flushes; the writer
//! worker drains queued save requests one at a time with atomic writes
//! and bounded retries.

mod autosave;
mod metrics;
mod writer;

pub use metrics::{EngineMetrics, MetricsSnapshot};

pub(crate) use autosave::{AutosaveWorker, Command};
pub(crate) use writer::{PendingWrite, WriterWorker};
