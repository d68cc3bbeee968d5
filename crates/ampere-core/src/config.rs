//! Machine configuration.
//!
//! A [`MachineConfig`] fixes everything about a machine that does not change
//! while it runs: storage size, input tier, slot layout, how many units
//! process in parallel, and how energy is billed. Configs deserialize from
//! any serde format; missing fields take their defaults.

use crate::energy::Energy;
use crate::item::DEFAULT_MAX_STACK;
use serde::{Deserialize, Serialize};

/// Errors from [`MachineConfig::validate`] and behavior-specific checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be at least 1")]
    Zero { field: &'static str },
    #[error("max_charge must be positive")]
    NoStorage,
    #[error("parallel_process ({units}) exceeds the {group} slot count ({slots})")]
    TooManyUnits {
        units: usize,
        group: &'static str,
        slots: usize,
    },
}

/// Input tier. Each tier caps the energy a single offer or charge-slot pull
/// may deliver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EnergyLevel {
    #[default]
    L1,
    L2,
    L3,
    L4,
    L5,
}

impl EnergyLevel {
    /// Largest amount accepted per transfer.
    pub fn limit(self) -> Energy {
        let units: u32 = match self {
            EnergyLevel::L1 => 32,
            EnergyLevel::L2 => 128,
            EnergyLevel::L3 => 512,
            EnergyLevel::L4 => 2048,
            EnergyLevel::L5 => 8192,
        };
        Energy::from(units)
    }
}

/// How processing units are charged for energy within one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BillingPolicy {
    /// The first runnable unit pays for the whole tick and advances the
    /// shared cycle.
    #[default]
    OncePerTick,
    /// Every runnable unit pays and advances independently.
    PerUnit,
}

/// What happens when an offer exceeds the input tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverloadPolicy {
    /// Claim the offer and break the machine.
    #[default]
    Break,
    /// Refuse the offer and leave it for someone else.
    Reject,
}

/// Static parameters for one machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub max_charge: Energy,
    pub energy_level: EnergyLevel,
    pub source_slots: usize,
    pub output_slots: usize,
    pub parallel_process: usize,
    pub billing: BillingPolicy,
    pub energy_per_tick: Energy,
    pub max_stack_size: u32,
    /// Require strictly more than `energy_per_tick` in storage before a
    /// tick may process, instead of at least that much.
    pub strict_energy_gate: bool,
    pub overload: OverloadPolicy,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            max_charge: Energy::from(400u32),
            energy_level: EnergyLevel::L1,
            source_slots: 1,
            output_slots: 1,
            parallel_process: 1,
            billing: BillingPolicy::OncePerTick,
            energy_per_tick: Energy::ONE,
            max_stack_size: DEFAULT_MAX_STACK,
            strict_energy_gate: false,
            overload: OverloadPolicy::Break,
        }
    }
}

impl MachineConfig {
    /// A machine with `slots` source slots, `slots` output slots, and one
    /// processing unit per slot pair.
    pub fn one_to_one(slots: usize) -> Self {
        Self {
            source_slots: slots,
            output_slots: slots,
            parallel_process: slots,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_charge.is_zero() {
            return Err(ConfigError::NoStorage);
        }
        for (field, value) in [
            ("source_slots", self.source_slots),
            ("output_slots", self.output_slots),
            ("parallel_process", self.parallel_process),
            ("max_stack_size", self.max_stack_size as usize),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }
        Ok(())
    }
}
