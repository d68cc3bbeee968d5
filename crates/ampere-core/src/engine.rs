//! The per-tick driver shared by every machine.
//!
//! # Tick sequence
//!
//! 1. Sample whether stored energy covers the per-tick requirement and
//!    remember the previous working flag; clear the flag.
//! 2. Absorb energy from an item in the CHARGE slot, bounded by the input
//!    tier, the item's charge, and free storage.
//! 3. If storage still does not cover the requirement, dispatch
//!    [`MachineEvent::EnergyNotEnough`] and stop.
//! 4. Run every processing unit under the machine's [`BillingPolicy`].
//! 5. Reconcile: a change in the working flag, in energy sufficiency, or in
//!    processing marks the machine dirty.
//!
//! Events are dispatched synchronously, so listeners observe the machine
//! between steps of the same tick.

use crate::config::BillingPolicy;
use crate::energy::Energy;
use crate::event::{MachineEvent, MachineEventBus};
use crate::machine::{Machine, MachineBehavior, MachineCore, MachineSlot, TickContext, TickReport};
use tracing::{debug, trace};

/// Advance `machine` by one tick.
pub fn run_tick<B: MachineBehavior>(machine: &mut Machine<B>, ctx: &TickContext) -> TickReport {
    let Machine {
        core,
        behavior,
        events,
        ..
    } = machine;

    let required = behavior.energy_per_tick(core);
    let had_energy = energy_gate(core, required);
    let was_working = core.working;
    core.working = false;

    let mut changed = absorb_charge(core);

    if !energy_gate(core, required) {
        trace!(tick = ctx.tick, charge = %core.reservoir.charge(), %required, "not enough energy");
        let report = reconcile(core, was_working, changed);
        events.dispatch(MachineEvent::EnergyNotEnough);
        return report;
    }

    changed |= match behavior.billing(core) {
        BillingPolicy::OncePerTick => bill_once_per_tick(core, behavior, events, required),
        BillingPolicy::PerUnit => bill_per_unit(core, behavior, events, required),
    };

    let energy_changed = had_energy != energy_gate(core, required);
    reconcile(core, was_working, energy_changed || changed)
}

/// Whether stored energy is enough to start processing this tick.
fn energy_gate(core: &MachineCore, required: Energy) -> bool {
    if core.config.strict_energy_gate {
        core.reservoir.has_at_least(required)
    } else {
        core.reservoir.covers(required)
    }
}

/// Pull energy out of the item in the CHARGE slot. Returns `true` if any
/// energy moved.
pub fn absorb_charge(core: &mut MachineCore) -> bool {
    let limit = core.config.energy_level.limit();
    let Some(stack) = core.inventory.stack_in_mut(MachineSlot::Charge, 0) else {
        return false;
    };
    if stack.is_empty() {
        return false;
    }
    let Some(store) = stack.energy.as_mut() else {
        return false;
    };
    if !store.has_energy() {
        return false;
    }
    let moved = core.reservoir.with(|reservoir| {
        let transferring = limit.min(store.charge()).min(reservoir.free_space());
        if transferring.is_zero() || !store.extract(transferring) {
            return Energy::ZERO;
        }
        reservoir.add(transferring);
        transferring
    });
    if moved.is_zero() {
        return false;
    }
    trace!(%moved, "absorbed energy from charge slot");
    core.inventory.mark_dirty();
    true
}

/// The first runnable unit is billed once and advances the shared cycle.
/// When that cycle completes, every runnable unit of this tick receives
/// its completion, and `Processed` is dispatched once.
fn bill_once_per_tick<B: MachineBehavior>(
    core: &mut MachineCore,
    behavior: &mut B,
    events: &mut MachineEventBus,
    required: Energy,
) -> bool {
    let mut energy_used = false;
    let mut any_runnable = false;
    let mut finished = false;

    for unit in 0..core.config.parallel_process {
        let mut cx = B::Context::default();
        if !behavior.can_process(unit, core, &mut cx) {
            continue;
        }
        any_runnable = true;
        if !energy_used {
            if !core.reservoir.subtract(required) {
                events.dispatch(MachineEvent::EnergyNotEnough);
                break;
            }
            energy_used = true;
            events.dispatch(MachineEvent::EnergyUsed);
            finished = behavior.tick_process(unit, core, &mut cx);
            if finished {
                events.dispatch(MachineEvent::Processed);
            }
        }
        if finished {
            behavior.on_process_finished(unit, core, &mut cx);
        }
    }

    if !any_runnable {
        events.dispatch(MachineEvent::CanNotProcess);
    }
    energy_used || any_runnable || finished
}

/// Every runnable unit is billed and advanced on its own. The first
/// billing failure stops the remaining units for this tick.
fn bill_per_unit<B: MachineBehavior>(
    core: &mut MachineCore,
    behavior: &mut B,
    events: &mut MachineEventBus,
    required: Energy,
) -> bool {
    let mut any_runnable = false;
    let mut any_finished = false;

    for unit in 0..core.config.parallel_process {
        let mut cx = B::Context::default();
        if !behavior.can_process(unit, core, &mut cx) {
            continue;
        }
        any_runnable = true;
        if !core.reservoir.subtract(required) {
            events.dispatch(MachineEvent::EnergyNotEnough);
            break;
        }
        let finished = behavior.tick_process(unit, core, &mut cx);
        events.dispatch(MachineEvent::EnergyUsed);
        if finished {
            any_finished = true;
            behavior.on_process_finished(unit, core, &mut cx);
            events.dispatch(MachineEvent::Processed);
        }
    }

    if !any_runnable {
        events.dispatch(MachineEvent::CanNotProcess);
    }
    any_runnable || any_finished
}

fn reconcile(core: &mut MachineCore, was_working: bool, changed: bool) -> TickReport {
    let working_changed = was_working != core.working;
    if working_changed {
        debug!(working = core.working, "machine working state changed");
    }
    let dirty = changed || working_changed;
    if dirty {
        core.dirty = true;
    }
    TickReport {
        working: core.working,
        working_changed,
        dirty,
    }
}
