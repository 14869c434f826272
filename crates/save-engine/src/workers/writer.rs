//! Background writer: drains queued save requests one at a time.
//!
//! Writes are strictly serialized per engine; only one request is ever
//! in flight, so two writers can never race on the same path. Each
//! write is atomic: full bytes go to a temporary file which is then
//! renamed over the final path, so a crash mid-write leaves either the
//! old file intact or a stray temp file, never a truncated save.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::engine::EngineCore;

/// Queued unit of work for the writer.
pub(crate) struct PendingWrite {
    /// Serialized envelope bytes.
    pub bytes: Vec<u8>,
    /// Destination save path.
    pub path: PathBuf,
    /// Attempts already made for this request.
    pub attempts: u32,
}

/// Single-instance background writer task.
pub(crate) struct WriterWorker {
    request_rx: mpsc::Receiver<PendingWrite>,
    queue: VecDeque<PendingWrite>,
    core: Arc<EngineCore>,
}

impl WriterWorker {
    pub(crate) fn new(request_rx: mpsc::Receiver<PendingWrite>, core: Arc<EngineCore>) -> Self {
        Self {
            request_rx,
            queue: VecDeque::new(),
            core,
        }
    }

    /// Main worker loop; exits once the request channel closes and the
    /// local queue is drained.
    pub(crate) async fn run(mut self) {
        debug!("writer worker started");

        loop {
            let request = match self.queue.pop_front() {
                Some(request) => request,
                None => match self.request_rx.recv().await {
                    Some(request) => request,
                    None => break,
                },
            };

            // Preserve FIFO order: anything already sent sits behind
            // the request being processed.
            while let Ok(next) = self.request_rx.try_recv() {
                self.queue.push_back(next);
            }

            self.process(request).await;
        }

        debug!("writer worker stopped");
    }

    async fn process(&mut self, request: PendingWrite) {
        if request.attempts > 0 {
            // Exponential backoff, capped so the shift never overflows.
            let exponent = (request.attempts - 1).min(10);
            let delay = self.core.config.retry_delay * (1u32 << exponent);
            sleep(delay).await;
        }

        match write_atomic(&request.path, &request.bytes).await {
            Ok(()) => {
                debug!(
                    "saved {} bytes to {}",
                    request.bytes.len(),
                    request.path.display()
                );
                self.core.metrics.record_completed_write();
                self.core.write_done();
            }
            Err(e) => {
                self.core.metrics.record_failed_attempt();
                // Re-dirty the record so the autosave loop reschedules
                // even if this request is eventually dropped.
                self.core.mark_dirty();

                let next_attempt = request.attempts + 1;
                if next_attempt < self.core.config.max_write_attempts {
                    warn!(
                        "save write to {} failed (attempt {}/{}): {e}, retrying",
                        request.path.display(),
                        next_attempt,
                        self.core.config.max_write_attempts,
                    );
                    self.core.metrics.record_retry();
                    self.queue.push_back(PendingWrite {
                        attempts: next_attempt,
                        ..request
                    });
                } else {
                    error!(
                        "save write to {} abandoned after {} attempts: {e}",
                        request.path.display(),
                        next_attempt,
                    );
                    self.core.metrics.record_dropped_write();
                    self.core.write_done();
                }
            }
        }
    }
}

/// Write bytes to `<path>.tmp`, then rename over the final path.
///
/// The rename consumes the temp file on success; on any failure the
/// temp file is removed so no partial write is ever left behind.
async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let temp = temp_path(path);

    let result = async {
        fs::write(&temp, bytes).await?;
        fs::rename(&temp, path).await
    }
    .await;

    if result.is_err() {
        let _ = fs::remove_file(&temp).await;
    }

    result
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
