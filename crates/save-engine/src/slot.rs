//! Save slot resolution and the lightweight slot preference store.
//!
//! Each slot owns a `slot_<index>` directory under the persistence
//! root. The active slot index is persisted outside the save file
//! itself so the selection survives even when the active record fails
//! to load.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, SaveError};

/// Maps the active slot index to a directory on disk, lazily creating
/// it, with traversal-safe file name resolution.
pub struct SlotLocator {
    root: PathBuf,
    max_slots: u8,
    active: u8,
}

impl SlotLocator {
    /// Create a locator. The initial slot is clamped into range.
    pub fn new(root: PathBuf, max_slots: u8, initial_slot: u8) -> Self {
        let max_slots = max_slots.max(1);
        Self {
            root,
            max_slots,
            active: initial_slot.min(max_slots - 1),
        }
    }

    pub fn active_slot(&self) -> u8 {
        self.active
    }

    /// Directory of the currently active slot.
    pub fn slot_dir(&self) -> PathBuf {
        self.root.join(format!("slot_{}", self.active))
    }

    /// Redirect the locator to another slot.
    pub fn set_active_slot(&mut self, index: u8) -> Result<()> {
        if index >= self.max_slots {
            return Err(SaveError::SlotOutOfRange {
                index,
                max: self.max_slots,
            });
        }
        self.active = index;
        Ok(())
    }

    /// Resolve a simple file name inside the active slot directory,
    /// creating the directory on demand.
    ///
    /// Rejects empty, whitespace-only, or multi-component names before
    /// any I/O. When the slot directory cannot be created the resolver
    /// degrades to the persistence root instead of failing the save.
    pub fn resolve_path(&self, file_name: &str) -> Result<PathBuf> {
        validate_file_name(file_name)?;

        let slot_dir = self.slot_dir();
        if let Err(e) = fs::create_dir_all(&slot_dir) {
            warn!(
                "failed to create slot directory {}, falling back to root: {e}",
                slot_dir.display()
            );
            return Ok(self.root.join(file_name));
        }

        Ok(slot_dir.join(file_name))
    }
}

/// Reject anything that is not a single plain path component.
fn validate_file_name(file_name: &str) -> Result<()> {
    if file_name.trim().is_empty()
        || file_name.contains('/')
        || file_name.contains('\\')
    {
        return Err(SaveError::InvalidFileName(file_name.to_string()));
    }

    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(SaveError::InvalidFileName(file_name.to_string())),
    }
}

/// Persists the current slot index as a tiny text file beside the slot
/// directories, independent of the save records.
pub struct SlotPreference {
    path: PathBuf,
}

impl SlotPreference {
    const FILE_NAME: &'static str = "current_slot";

    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join(Self::FILE_NAME),
        }
    }

    /// Read the stored slot index, clamped into range. Missing or
    /// unreadable preferences fall back to slot 0.
    pub fn load(&self, max_slots: u8) -> u8 {
        let max_slots = max_slots.max(1);
        match fs::read_to_string(&self.path) {
            Ok(text) => match text.trim().parse::<u8>() {
                Ok(index) if index < max_slots => index,
                Ok(index) => {
                    warn!(
                        "stored slot index {index} out of range, clamping to {}",
                        max_slots - 1
                    );
                    max_slots - 1
                }
                Err(_) => {
                    warn!("unreadable slot preference {}, using slot 0", self.path.display());
                    0
                }
            },
            Err(e) => {
                debug!("no slot preference ({e}), using slot 0");
                0
            }
        }
    }

    /// Persist the slot index.
    pub fn store(&self, index: u8) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, index.to_string())
    }
}
