//! Ampere Core -- tick-driven, energy-powered machines.
//!
//! This crate provides the energy model, the machine inventory, item and
//! energy routing between neighbours, and the per-tick driver that bills
//! energy and advances processing units.
//!
//! # Tick Pipeline
//!
//! Each call to [`machine::Machine::on_tick`] runs:
//!
//! 1. **Sample** -- Remember whether storage covered the requirement and
//!    whether the machine was working.
//! 2. **Charge** -- Absorb energy from the item in the CHARGE slot.
//! 3. **Gate** -- Stop with `EnergyNotEnough` if storage is still short.
//! 4. **Process** -- Run every unit under the configured billing policy.
//! 5. **Reconcile** -- Report working-state changes and mark the machine
//!    dirty when anything persistent moved.
//!
//! # Key Types
//!
//! - [`energy::Energy`] -- Exact non-negative decimal energy.
//! - [`reservoir::SharedReservoir`] -- Bounded storage shared with producers.
//! - [`inventory::CompositeInventory`] -- Named slot groups behind one index space.
//! - [`routing`] -- Supplier/consumer contracts and slot helpers.
//! - [`machine::Machine`] -- Machine state plus a pluggable
//!   [`machine::MachineBehavior`].
//! - [`cooking::CookingBehavior`] -- Recipe-driven processing.
//! - [`serialize`] -- Records, binary snapshots, and JSON export.

pub mod config;
pub mod cooking;
pub mod energy;
pub mod engine;
pub mod event;
pub mod fixed;
pub mod id;
pub mod inventory;
pub mod item;
pub mod machine;
pub mod offer;
pub mod recipe;
pub mod reservoir;
pub mod rng;
pub mod routing;
pub mod serialize;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
