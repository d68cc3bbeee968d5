//! Machine persistence.
//!
//! A [`MachineRecord`] is the complete saved state of one machine: exact
//! energy amounts as decimal text, non-empty slots per group, and whatever
//! progress the behavior chooses to keep. Records encode two ways:
//!
//! - binary via `bitcode`, behind a magic/version header, for save files;
//! - JSON via `serde_json`, with camelCase field names, for tooling.
//!
//! Event listeners and the broken flag are never persisted.

use crate::energy::Energy;
use crate::id::RecipeId;
use crate::inventory::InventoryRecord;
use crate::machine::{Machine, MachineBehavior};
use crate::reservoir::EnergyReservoir;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a machine snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0xA3E7_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during serialization.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during deserialization.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("json decoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Progress of a recipe-driven behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRecord {
    pub current_duration: u32,
    pub total_duration: u32,
    #[serde(default)]
    pub recipes_used: BTreeMap<RecipeId, u32>,
}

/// Complete saved state of one machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineRecord {
    pub charge: Energy,
    pub max_charge: Energy,
    pub inventory: InventoryRecord,
    #[serde(default)]
    pub process_state: Option<ProcessRecord>,
}

impl MachineRecord {
    pub fn to_json(&self) -> Result<String, SerializeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, DeserializeError> {
        Ok(serde_json::from_str(text)?)
    }
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

/// Header prepended to every binary snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
}

impl SnapshotHeader {
    pub fn new() -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version != FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct MachineSnapshot {
    header: SnapshotHeader,
    record: MachineRecord,
}

// ---------------------------------------------------------------------------
// Machine persistence
// ---------------------------------------------------------------------------

impl<B: MachineBehavior> Machine<B> {
    /// Capture the persistent state.
    pub fn to_record(&self) -> MachineRecord {
        let reservoir = self.core.reservoir.snapshot();
        MachineRecord {
            charge: reservoir.charge(),
            max_charge: reservoir.max_charge(),
            inventory: self.core.inventory.to_record(),
            process_state: self.behavior.save_state(),
        }
    }

    /// Restore state from a record. The reservoir takes the recorded
    /// maximum and clamps the recorded charge to it.
    pub fn load_record(&mut self, record: &MachineRecord) {
        self.core
            .reservoir
            .replace(EnergyReservoir::new(record.charge, record.max_charge));
        self.core.inventory.load_record(&record.inventory);
        if let Some(state) = &record.process_state {
            self.behavior.load_state(state);
        }
        self.core.mark_dirty();
    }

    /// Encode the machine as a versioned binary snapshot.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let snapshot = MachineSnapshot {
            header: SnapshotHeader::new(),
            record: self.to_record(),
        };
        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Decode a snapshot produced by [`Machine::serialize`] into this machine.
    /// On error the machine is unchanged.
    pub fn deserialize_into(&mut self, data: &[u8]) -> Result<(), DeserializeError> {
        let snapshot: MachineSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;
        self.load_record(&snapshot.record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MachineConfig;
    use crate::machine::{MachineSlot, TickContext};
    use crate::test_utils::*;

    #[test]
    fn json_uses_documented_field_names() {
        let mut m = furnace(MachineConfig::one_to_one(1));
        m.on_placed(Energy::from_scaled(375, 1));
        m.set_stack(0, ore(3));
        let json = m.to_record().to_json().unwrap();
        for key in [
            "\"charge\": \"37.5\"",
            "\"maxCharge\"",
            "\"SOURCE\"",
            "\"itemId\": \"iron_ore\"",
            "\"processState\"",
            "\"currentDuration\"",
            "\"totalDuration\"",
        ] {
            assert!(json.contains(key), "missing {key} in {json}");
        }
    }

    #[test]
    fn record_round_trip_preserves_exact_charge() {
        let mut m = furnace(MachineConfig::one_to_one(1));
        m.on_placed(Energy::from_scaled(375, 1));
        m.set_stack(0, ore(3));
        m.on_tick(&TickContext::default());

        let json = m.to_record().to_json().unwrap();
        let record = MachineRecord::from_json(&json).unwrap();

        let mut restored = furnace(MachineConfig::one_to_one(1));
        restored.load_record(&record);
        assert_eq!(restored.charge(), Energy::from_scaled(365, 1));
        assert_eq!(restored.stack(0), &ore(3));
        assert_eq!(restored.behavior().cook_time(), 1);
        assert_eq!(restored.to_record(), m.to_record());
    }

    #[test]
    fn binary_round_trip() {
        let mut m = furnace(MachineConfig::one_to_one(2));
        m.on_placed(e(250));
        m.set_stack(1, ore(9));
        m.set_stack(2, battery(40, 100));
        for t in 0..25 {
            m.on_tick(&TickContext { tick: t });
        }
        let bytes = m.serialize().unwrap();

        let mut restored = furnace(MachineConfig::one_to_one(2));
        restored.deserialize_into(&bytes).unwrap();
        assert_eq!(restored.to_record(), m.to_record());
        assert_eq!(
            restored.core().inventory().stack_in(MachineSlot::Output, 1),
            m.core().inventory().stack_in(MachineSlot::Output, 1)
        );
    }

    #[test]
    fn recorded_max_replaces_configured_max() {
        let record = MachineRecord {
            charge: e(100),
            max_charge: e(50),
            inventory: InventoryRecord::new(),
            process_state: None,
        };
        let mut m = furnace(MachineConfig::one_to_one(1));
        m.load_record(&record);
        assert_eq!(m.charge(), e(50));
        assert_eq!(m.reservoir().max_charge(), e(50));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let snapshot = MachineSnapshot {
            header: SnapshotHeader {
                magic: 0xDEAD_BEEF,
                version: FORMAT_VERSION,
            },
            record: furnace(MachineConfig::one_to_one(1)).to_record(),
        };
        let bytes = bitcode::serialize(&snapshot).unwrap();
        let mut m = furnace(MachineConfig::one_to_one(1));
        m.on_placed(e(7));
        let err = m.deserialize_into(&bytes).unwrap_err();
        assert!(matches!(err, DeserializeError::InvalidMagic(0xDEAD_BEEF)));
        assert_eq!(m.charge(), e(7));
    }

    #[test]
    fn empty_input_fails_to_decode() {
        let mut m = furnace(MachineConfig::one_to_one(1));
        let err = m.deserialize_into(&[]).unwrap_err();
        assert!(matches!(err, DeserializeError::Decode(_)));
    }

    #[test]
    fn malformed_charge_text_is_a_json_error() {
        let text = r#"{ "charge": "lots", "maxCharge": "10", "inventory": {} }"#;
        assert!(matches!(
            MachineRecord::from_json(text),
            Err(DeserializeError::Json(_))
        ));
    }
}
