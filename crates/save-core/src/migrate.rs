//! Schema migration ladder for loaded save records.
//!
//! Migration is purely additive and order-dependent: each version gate
//! applies its defaulting rule in ascending order, then the record is
//! stamped with [`CURRENT_VERSION`]. `coins`, `highScore`, and
//! `upgrades` are schema-stable across all versions and are never
//! touched here.

use crate::record::{DEFAULT_LANGUAGE, SaveRecord};

/// Current save schema version. Bump when a new gate is added below.
pub const CURRENT_VERSION: u32 = 4;

/// Upgrade an older in-memory record to the current schema.
///
/// Returns `true` if any field changed, so callers can persist the
/// upgraded form instead of exposing the old one. Records newer than
/// [`CURRENT_VERSION`] are left as-is; the version is never lowered.
pub fn migrate(record: &mut SaveRecord) -> bool {
    if record.version >= CURRENT_VERSION {
        return false;
    }

    if record.version < 1 {
        record.music_volume = 1.0;
        record.effects_volume = 1.0;
    }
    if record.version < 2 {
        record.language = DEFAULT_LANGUAGE.to_string();
    }
    if record.version < 3 {
        record.tutorial_completed = false;
        record.jump_tip_shown = false;
        record.slide_tip_shown = false;
    }
    if record.version < 4 {
        record.hardcore_mode = false;
    }

    record.version = CURRENT_VERSION;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Upgrades;

    #[test]
    fn version_zero_record_resets_defaults_but_keeps_progress() {
        let mut record = SaveRecord {
            version: 0,
            coins: 777,
            high_score: 4321,
            music_volume: 0.3,
            effects_volume: 0.7,
            language: "ko".to_string(),
            tutorial_completed: true,
            jump_tip_shown: true,
            slide_tip_shown: true,
            hardcore_mode: true,
            upgrades: [("MagnetDuration".to_string(), 2)]
                .into_iter()
                .collect::<Upgrades>(),
        };

        assert!(migrate(&mut record));

        assert_eq!(record.version, CURRENT_VERSION);
        assert_eq!(record.music_volume, 1.0);
        assert_eq!(record.effects_volume, 1.0);
        assert_eq!(record.language, DEFAULT_LANGUAGE);
        assert!(!record.tutorial_completed);
        assert!(!record.jump_tip_shown);
        assert!(!record.slide_tip_shown);
        assert!(!record.hardcore_mode);

        // Schema-stable fields survive untouched.
        assert_eq!(record.coins, 777);
        assert_eq!(record.high_score, 4321);
        assert_eq!(record.upgrades.level("MagnetDuration"), 2);
    }

    #[test]
    fn later_gates_do_not_reset_earlier_fields() {
        let mut record = SaveRecord {
            version: 3,
            music_volume: 0.5,
            language: "de".to_string(),
            tutorial_completed: true,
            hardcore_mode: true,
            ..SaveRecord::default()
        };

        assert!(migrate(&mut record));

        // Only the v4 gate applies to a v3 record.
        assert_eq!(record.music_volume, 0.5);
        assert_eq!(record.language, "de");
        assert!(record.tutorial_completed);
        assert!(!record.hardcore_mode);
        assert_eq!(record.version, CURRENT_VERSION);
    }

    #[test]
    fn current_version_is_a_no_op() {
        let mut record = SaveRecord::default();
        record.hardcore_mode = true;
        let before = record.clone();
        assert!(!migrate(&mut record));
        assert_eq!(record, before);
    }

    #[test]
    fn newer_version_is_never_lowered() {
        let mut record = SaveRecord::default();
        record.version = CURRENT_VERSION + 1;
        assert!(!migrate(&mut record));
        assert_eq!(record.version, CURRENT_VERSION + 1);
    }
}
