//! The persistence engine: single source of truth for persisted state
//! during a session, owner of the write pipeline.
//!
//! Gameplay collaborators interact only through the typed accessors on
//! [`SaveEngine`]; getters read the in-memory record and never touch
//! disk, setters clamp, compare, and mark the record dirty only on an
//! actual change. Dirty state is debounced into flushes by the
//! autosave worker and written atomically by the background writer.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::{Notify, mpsc, watch};
use tokio::time::timeout;
use tracing::{info, warn};

use save_core::record::{clamp_non_negative, clamp_unit};
use save_core::{CURRENT_VERSION, SaveRecord, Upgrades, envelope, legacy, migrate};

use crate::config::EngineConfig;
use crate::error::{Result, SaveError};
use crate::slot::{SlotLocator, SlotPreference};
use crate::workers::{AutosaveWorker, Command, EngineMetrics, MetricsSnapshot, PendingWrite, WriterWorker};

/// Capacity of the writer request channel. The debounce bounds the
/// production rate, so this never fills in practice.
const WRITE_QUEUE_CAPACITY: usize = 32;

/// Mutable engine state guarded by one lock.
struct EngineState {
    record: SaveRecord,
    dirty: bool,
    last_flush: Option<Instant>,
}

/// State shared between the engine handle and its worker tasks.
pub(crate) struct EngineCore {
    pub(crate) config: EngineConfig,
    pub(crate) metrics: EngineMetrics,
    locator: Mutex<SlotLocator>,
    pref: SlotPreference,
    state: Mutex<EngineState>,
    /// Wakes the autosave loop on the first mutation after a flush.
    pub(crate) dirty_notify: Notify,
    /// Count of save requests queued or in flight; `0` means drained.
    pending: watch::Sender<usize>,
}

impl EngineCore {
    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().expect("engine state lock poisoned")
    }

    fn locator(&self) -> MutexGuard<'_, SlotLocator> {
        self.locator.lock().expect("slot locator lock poisoned")
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.state().dirty
    }

    /// Time left before the next flush is allowed.
    pub(crate) fn debounce_remaining(&self) -> Duration {
        match self.state().last_flush {
            Some(at) => self.config.debounce.saturating_sub(at.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Mark the record dirty and wake the autosave loop.
    pub(crate) fn mark_dirty(&self) {
        self.state().dirty = true;
        self.dirty_notify.notify_one();
    }

    /// Apply a mutation; marks dirty and wakes the autosave loop only
    /// when the closure reports an actual change. No-op writes never
    /// restart the debounce timer.
    fn update(&self, mutate: impl FnOnce(&mut SaveRecord) -> bool) {
        let changed = {
            let mut state = self.state();
            let changed = mutate(&mut state.record);
            if changed {
                state.dirty = true;
            }
            changed
        };
        if changed {
            self.dirty_notify.notify_one();
        }
    }

    fn read<T>(&self, get: impl FnOnce(&SaveRecord) -> T) -> T {
        get(&self.state().record)
    }

    fn resolve_save_path(&self) -> Result<PathBuf> {
        self.locator().resolve_path(&self.config.save_file)
    }

    /// Serialize the current record into an envelope and enqueue it
    /// for the background writer.
    ///
    /// The dirty flag is cleared and the flush time stamped
    /// optimistically; a failed write re-dirties the record so a later
    /// autosave cycle retries.
    pub(crate) async fn flush(&self, writer_tx: &mpsc::Sender<PendingWrite>) -> Result<()> {
        let path = self.resolve_save_path()?;

        let bytes = {
            let mut state = self.state();
            state.record.sanitize();
            let bytes = envelope::seal(&state.record, self.config.cipher.as_ref())?;
            state.dirty = false;
            state.last_flush = Some(Instant::now());
            bytes
        };

        self.pending.send_modify(|pending| *pending += 1);
        if writer_tx
            .send(PendingWrite {
                bytes,
                path,
                attempts: 0,
            })
            .await
            .is_err()
        {
            self.pending.send_modify(|pending| *pending -= 1);
            self.state().dirty = true;
            return Err(SaveError::WriterChannelClosed);
        }

        self.metrics.record_flush();
        Ok(())
    }

    /// Called by the writer when a request finishes (written or
    /// abandoned).
    pub(crate) fn write_done(&self) {
        self.pending
            .send_modify(|pending| *pending = pending.saturating_sub(1));
    }

    /// Wait until the writer has no queued or in-flight requests.
    async fn wait_idle(&self) {
        let mut pending = self.pending.subscribe();
        // The sender lives in self, so this cannot fail while the core
        // is alive.
        let _ = pending.wait_for(|count| *count == 0).await;
    }

    /// Replace the active record. The record is considered clean and
    /// the debounce timer reset.
    fn adopt(&self, record: SaveRecord) {
        let mut state = self.state();
        state.record = record;
        state.dirty = false;
        state.last_flush = None;
    }

    /// Initialization protocol for the active slot: load the save file
    /// if present, recover from corruption by resetting to defaults,
    /// or import legacy progress on first run. Fresh and recovered
    /// records are persisted immediately.
    async fn load_active_slot(&self, writer_tx: &mpsc::Sender<PendingWrite>) -> Result<()> {
        let path = self.resolve_save_path()?;
        let slot = self.locator().active_slot();

        let loaded = match tokio::fs::read(&path).await {
            Ok(bytes) => match envelope::open(&bytes, self.config.cipher.as_ref()) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("discarding corrupt save {}: {e}", path.display());
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let record = match &self.config.legacy {
                    Some(store) => {
                        info!("slot {slot}: no save file, importing legacy progress");
                        legacy::import(store.as_ref())
                    }
                    None => {
                        info!("slot {slot}: no save file, starting fresh");
                        SaveRecord::default()
                    }
                };
                self.adopt(record);
                return self.flush(writer_tx).await;
            }
            Err(e) => {
                warn!("failed to read save {}: {e}", path.display());
                None
            }
        };

        match loaded {
            Some(mut record) => {
                if record.version > CURRENT_VERSION {
                    warn!(
                        "slot {slot}: save schema v{} is newer than v{CURRENT_VERSION}",
                        record.version
                    );
                }
                let migrated = migrate(&mut record);
                self.adopt(record);
                if migrated {
                    info!("slot {slot}: migrated save to schema v{CURRENT_VERSION}");
                    // Persist the upgraded form via the normal autosave path.
                    self.mark_dirty();
                } else {
                    info!("slot {slot}: save loaded");
                }
                Ok(())
            }
            None => {
                // Overwrite the bad file so the next load is clean.
                self.adopt(SaveRecord::default());
                self.flush(writer_tx).await
            }
        }
    }
}

/// Handle to the persistence engine.
///
/// Constructed once at process start via [`SaveEngine::start`] and
/// passed by reference to collaborators; dropping the handle winds the
/// worker tasks down.
pub struct SaveEngine {
    core: Arc<EngineCore>,
    writer_tx: mpsc::Sender<PendingWrite>,
    autosave_tx: mpsc::Sender<Command>,
}

impl SaveEngine {
    /// Start the engine: load (or create) the active slot's record and
    /// spawn the autosave and writer workers.
    ///
    /// Resolves only once the record is ready, so callers can await
    /// this before reading properties.
    pub async fn start(config: EngineConfig) -> Result<Self> {
        let pref = SlotPreference::new(&config.root_dir);
        let initial_slot = pref.load(config.max_slots);
        let locator = SlotLocator::new(config.root_dir.clone(), config.max_slots, initial_slot);

        let (writer_tx, writer_rx) = mpsc::channel(WRITE_QUEUE_CAPACITY);
        let (pending, _) = watch::channel(0);

        let core = Arc::new(EngineCore {
            config,
            metrics: EngineMetrics::new(),
            locator: Mutex::new(locator),
            pref,
            state: Mutex::new(EngineState {
                record: SaveRecord::default(),
                dirty: false,
                last_flush: None,
            }),
            dirty_notify: Notify::new(),
            pending,
        });

        tokio::spawn(WriterWorker::new(writer_rx, Arc::clone(&core)).run());

        core.load_active_slot(&writer_tx).await?;

        let (autosave_tx, autosave_rx) = mpsc::channel(1);
        tokio::spawn(AutosaveWorker::new(Arc::clone(&core), writer_tx.clone(), autosave_rx).run());

        info!(
            "save engine ready: slot {}, root {}",
            core.locator().active_slot(),
            core.config.root_dir.display()
        );

        Ok(Self {
            core,
            writer_tx,
            autosave_tx,
        })
    }

    // --- typed getters -------------------------------------------------

    pub fn coins(&self) -> u64 {
        self.core.read(|r| r.coins)
    }

    pub fn high_score(&self) -> u64 {
        self.core.read(|r| r.high_score)
    }

    pub fn music_volume(&self) -> f32 {
        self.core.read(|r| r.music_volume)
    }

    pub fn effects_volume(&self) -> f32 {
        self.core.read(|r| r.effects_volume)
    }

    pub fn language(&self) -> String {
        self.core.read(|r| r.language.clone())
    }

    pub fn tutorial_completed(&self) -> bool {
        self.core.read(|r| r.tutorial_completed)
    }

    pub fn jump_tip_shown(&self) -> bool {
        self.core.read(|r| r.jump_tip_shown)
    }

    pub fn slide_tip_shown(&self) -> bool {
        self.core.read(|r| r.slide_tip_shown)
    }

    pub fn hardcore_mode(&self) -> bool {
        self.core.read(|r| r.hardcore_mode)
    }

    /// Level of one upgrade; unknown identifiers are level 0.
    pub fn upgrade_level(&self, id: &str) -> u32 {
        self.core.read(|r| r.upgrades.level(id))
    }

    pub fn upgrade_levels(&self) -> Upgrades {
        self.core.read(|r| r.upgrades.clone())
    }

    /// Whether in-memory state has diverged from the last enqueued
    /// flush.
    pub fn is_dirty(&self) -> bool {
        self.core.is_dirty()
    }

    pub fn active_slot(&self) -> u8 {
        self.core.locator().active_slot()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.core.metrics.snapshot()
    }

    // --- typed setters -------------------------------------------------

    /// Set the coin count, clamped to be non-negative.
    pub fn set_coins(&self, coins: i64) {
        let coins = clamp_non_negative(coins);
        self.core.update(|r| {
            if r.coins == coins {
                return false;
            }
            r.coins = coins;
            true
        });
    }

    /// Set the high score, clamped to be non-negative.
    pub fn set_high_score(&self, score: i64) {
        let score = clamp_non_negative(score);
        self.core.update(|r| {
            if r.high_score == score {
                return false;
            }
            r.high_score = score;
            true
        });
    }

    /// Set the music volume, clamped into `[0, 1]`.
    pub fn set_music_volume(&self, volume: f32) {
        let volume = clamp_unit(volume);
        self.core.update(|r| {
            if r.music_volume == volume {
                return false;
            }
            r.music_volume = volume;
            true
        });
    }

    /// Set the effects volume, clamped into `[0, 1]`.
    pub fn set_effects_volume(&self, volume: f32) {
        let volume = clamp_unit(volume);
        self.core.update(|r| {
            if r.effects_volume == volume {
                return false;
            }
            r.effects_volume = volume;
            true
        });
    }

    /// Set the language code. Empty or whitespace-only input is
    /// ignored; the stored language is never empty.
    pub fn set_language(&self, language: &str) {
        let language = language.trim();
        if language.is_empty() {
            return;
        }
        self.core.update(|r| {
            if r.language == language {
                return false;
            }
            r.language = language.to_string();
            true
        });
    }

    pub fn set_tutorial_completed(&self, completed: bool) {
        self.core.update(|r| {
            if r.tutorial_completed == completed {
                return false;
            }
            r.tutorial_completed = completed;
            true
        });
    }

    pub fn set_jump_tip_shown(&self, shown: bool) {
        self.core.update(|r| {
            if r.jump_tip_shown == shown {
                return false;
            }
            r.jump_tip_shown = shown;
            true
        });
    }

    pub fn set_slide_tip_shown(&self, shown: bool) {
        self.core.update(|r| {
            if r.slide_tip_shown == shown {
                return false;
            }
            r.slide_tip_shown = shown;
            true
        });
    }

    pub fn set_hardcore_mode(&self, hardcore: bool) {
        self.core.update(|r| {
            if r.hardcore_mode == hardcore {
                return false;
            }
            r.hardcore_mode = hardcore;
            true
        });
    }

    /// Set one upgrade level, clamped to be non-negative.
    pub fn set_upgrade_level(&self, id: &str, level: i64) {
        let level = clamp_level(level);
        self.core.update(|r| {
            if r.upgrades.level(id) == level {
                return false;
            }
            r.upgrades.set_level(id, level);
            true
        });
    }

    /// Apply a batch of upgrade levels with at most one dirty-mark and
    /// one scheduled flush, not one per entry.
    pub fn set_upgrade_levels<I>(&self, batch: I)
    where
        I: IntoIterator<Item = (String, i64)>,
    {
        self.core.update(|r| {
            let mut changed = false;
            for (id, level) in batch {
                let level = clamp_level(level);
                if r.upgrades.level(&id) != level {
                    r.upgrades.set_level(id, level);
                    changed = true;
                }
            }
            changed
        });
    }

    // --- lifecycle -----------------------------------------------------

    /// Flush any dirty state now and wait for the writer to drain.
    pub async fn flush(&self) -> Result<()> {
        if self.core.is_dirty() {
            self.core.flush(&self.writer_tx).await?;
        }
        self.core.wait_idle().await;
        Ok(())
    }

    /// Switch to another save slot.
    ///
    /// Flushes and waits (without bound; switching profiles is a
    /// deliberate, infrequent action) for all pending writes under the
    /// current slot, so no write can ever be misdirected to the new
    /// slot's path. Resolves once the new slot's record has loaded.
    pub async fn switch_slot(&self, index: u8) -> Result<()> {
        {
            let locator = self.core.locator();
            if index >= self.core.config.max_slots {
                return Err(SaveError::SlotOutOfRange {
                    index,
                    max: self.core.config.max_slots,
                });
            }
            if locator.active_slot() == index {
                return Ok(());
            }
        }

        if self.core.is_dirty() {
            self.core.flush(&self.writer_tx).await?;
        }
        self.core.wait_idle().await;

        self.core.pref.store(index)?;
        self.core.locator().set_active_slot(index)?;
        self.core.load_active_slot(&self.writer_tx).await?;

        info!("switched to save slot {index}");
        Ok(())
    }

    /// Best-effort flush on teardown.
    ///
    /// Waits for the writer to drain up to the configured shutdown
    /// timeout. Exceeding the timeout is logged, not fatal; the engine
    /// never blocks process exit indefinitely for disk I/O.
    pub async fn shutdown(self) -> Result<()> {
        if self.core.is_dirty() {
            self.core.flush(&self.writer_tx).await?;
        }

        let _ = self.autosave_tx.send(Command::Shutdown).await;

        if timeout(self.core.config.shutdown_timeout, self.core.wait_idle())
            .await
            .is_err()
        {
            warn!(
                "shutdown timed out after {:?} waiting for pending saves, recent changes may be lost",
                self.core.config.shutdown_timeout
            );
        }

        Ok(())
    }
}

fn clamp_level(level: i64) -> u32 {
    level.clamp(0, u32::MAX as i64) as u32
}
