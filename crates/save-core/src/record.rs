//! The in-memory save record and its field invariants.
//!
//! Field names follow the on-disk JSON format (camelCase). Invariants:
//! counters are non-negative, volumes stay in `[0, 1]`, the language
//! code is never empty, and upgrade keys are unique.

use std::collections::BTreeMap;

use serde::de::{SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::migrate::CURRENT_VERSION;

/// Fallback language code used whenever a record carries none.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Full persisted player state for one save slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecord {
    /// Schema version; drives the migration ladder on load.
    pub version: u32,
    pub coins: u64,
    pub high_score: u64,
    pub music_volume: f32,
    pub effects_volume: f32,
    pub language: String,
    pub tutorial_completed: bool,
    pub jump_tip_shown: bool,
    pub slide_tip_shown: bool,
    pub hardcore_mode: bool,
    pub upgrades: Upgrades,
}

impl Default for SaveRecord {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            coins: 0,
            high_score: 0,
            music_volume: 1.0,
            effects_volume: 1.0,
            language: DEFAULT_LANGUAGE.to_string(),
            tutorial_completed: false,
            jump_tip_shown: false,
            slide_tip_shown: false,
            hardcore_mode: false,
            upgrades: Upgrades::default(),
        }
    }
}

impl SaveRecord {
    /// Re-establish field invariants before serialization.
    ///
    /// Volumes are clamped into `[0, 1]` and an empty or
    /// whitespace-only language falls back to [`DEFAULT_LANGUAGE`].
    pub fn sanitize(&mut self) {
        self.music_volume = clamp_unit(self.music_volume);
        self.effects_volume = clamp_unit(self.effects_volume);
        if self.language.trim().is_empty() {
            self.language = DEFAULT_LANGUAGE.to_string();
        }
    }
}

/// Clamp a volume into `[0, 1]`. NaN resets to full volume.
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        1.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Clamp an incoming counter value to a non-negative integer.
pub fn clamp_non_negative(value: i64) -> u64 {
    value.max(0) as u64
}

/// Upgrade levels keyed by upgrade identifier.
///
/// Stored as a sorted map in memory (unique keys, deterministic
/// serialization order) but serialized as a list of
/// `{"type": ..., "level": ...}` entries to match the save format.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Upgrades(BTreeMap<String, u32>);

impl Upgrades {
    pub fn new() -> Self {
        Self::default()
    }

    /// Level for an upgrade; unknown identifiers are level 0.
    pub fn level(&self, id: &str) -> u32 {
        self.0.get(id).copied().unwrap_or(0)
    }

    pub fn set_level(&mut self, id: impl Into<String>, level: u32) {
        self.0.insert(id.into(), level);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(id, level)| (id.as_str(), *level))
    }
}

impl FromIterator<(String, u32)> for Upgrades {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Wire form of a single upgrade entry.
#[derive(Serialize, Deserialize)]
struct UpgradeEntry {
    #[serde(rename = "type")]
    kind: String,
    level: u32,
}

impl Serialize for Upgrades {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for (kind, level) in &self.0 {
            seq.serialize_element(&UpgradeEntry {
                kind: kind.clone(),
                level: *level,
            })?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Upgrades {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntryVisitor;

        impl<'de> Visitor<'de> for EntryVisitor {
            type Value = Upgrades;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a sequence of upgrade entries")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Upgrades, A::Error> {
                let mut map = BTreeMap::new();
                // Duplicate identifiers collapse to the last entry.
                while let Some(entry) = seq.next_element::<UpgradeEntry>()? {
                    map.insert(entry.kind, entry.level);
                }
                Ok(Upgrades(map))
            }
        }

        deserializer.deserialize_seq(EntryVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_is_current_version_with_factory_values() {
        let record = SaveRecord::default();
        assert_eq!(record.version, CURRENT_VERSION);
        assert_eq!(record.coins, 0);
        assert_eq!(record.music_volume, 1.0);
        assert_eq!(record.language, DEFAULT_LANGUAGE);
        assert!(!record.hardcore_mode);
        assert!(record.upgrades.is_empty());
    }

    #[test]
    fn sanitize_clamps_volumes_and_defaults_language() {
        let mut record = SaveRecord {
            music_volume: 1.5,
            effects_volume: -0.25,
            language: "   ".to_string(),
            ..SaveRecord::default()
        };
        record.sanitize();
        assert_eq!(record.music_volume, 1.0);
        assert_eq!(record.effects_volume, 0.0);
        assert_eq!(record.language, DEFAULT_LANGUAGE);
    }

    #[test]
    fn clamp_unit_resets_nan_to_full_volume() {
        assert_eq!(clamp_unit(f32::NAN), 1.0);
        assert_eq!(clamp_unit(0.5), 0.5);
    }

    #[test]
    fn clamp_non_negative_floors_at_zero() {
        assert_eq!(clamp_non_negative(-5), 0);
        assert_eq!(clamp_non_negative(42), 42);
    }

    #[test]
    fn upgrades_serialize_as_typed_entries() {
        let mut upgrades = Upgrades::new();
        upgrades.set_level("MagnetDuration", 2);
        upgrades.set_level("CoinValue", 1);

        let json = serde_json::to_string(&upgrades).unwrap();
        assert_eq!(
            json,
            r#"[{"type":"CoinValue","level":1},{"type":"MagnetDuration","level":2}]"#
        );

        let back: Upgrades = serde_json::from_str(&json).unwrap();
        assert_eq!(back, upgrades);
    }

    #[test]
    fn duplicate_upgrade_entries_collapse_to_last() {
        let json = r#"[{"type":"MagnetDuration","level":1},{"type":"MagnetDuration","level":3}]"#;
        let upgrades: Upgrades = serde_json::from_str(json).unwrap();
        assert_eq!(upgrades.len(), 1);
        assert_eq!(upgrades.level("MagnetDuration"), 3);
    }

    #[test]
    fn record_round_trips_through_json() {
        let mut record = SaveRecord::default();
        record.coins = 120;
        record.high_score = 9001;
        record.upgrades.set_level("MagnetDuration", 2);

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"highScore\":9001"));
        let back: SaveRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
