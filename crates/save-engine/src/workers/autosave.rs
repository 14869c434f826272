//! Autosave loop: debounced flushing of dirty state.
//!
//! The loop parks while the record is clean and wakes on the first
//! mutation. Each pass waits out the remainder of the debounce
//! interval since the last flush, re-checks the dirty flag, and
//! flushes, bounding write frequency no matter how rapidly callers
//! mutate fields.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::engine::EngineCore;
use crate::workers::writer::PendingWrite;

/// Commands that can be sent to the autosave worker.
pub(crate) enum Command {
    /// Shutdown the worker gracefully.
    Shutdown,
}

pub(crate) struct AutosaveWorker {
    core: Arc<EngineCore>,
    writer_tx: mpsc::Sender<PendingWrite>,
    command_rx: mpsc::Receiver<Command>,
}

impl AutosaveWorker {
    pub(crate) fn new(
        core: Arc<EngineCore>,
        writer_tx: mpsc::Sender<PendingWrite>,
        command_rx: mpsc::Receiver<Command>,
    ) -> Self {
        Self {
            core,
            writer_tx,
            command_rx,
        }
    }

    pub(crate) async fn run(mut self) {
        debug!("autosave loop started");

        loop {
            tokio::select! {
                _ = self.core.dirty_notify.notified() => {
                    self.drain_dirty().await;
                }
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(Command::Shutdown) | None => break,
                    }
                }
            }
        }

        debug!("autosave loop stopped");
    }

    /// Flush until a pass leaves the record clean.
    async fn drain_dirty(&self) {
        while self.core.is_dirty() {
            let wait = self.core.debounce_remaining();
            if !wait.is_zero() {
                sleep(wait).await;
            }
            // A flush elsewhere (shutdown, slot switch) may have
            // cleaned the record while this pass was waiting.
            if !self.core.is_dirty() {
                break;
            }
            if let Err(e) = self.core.flush(&self.writer_tx).await {
                warn!("autosave flush failed: {e}");
                break;
            }
        }
    }
}
