//! Energy-powered machines.
//!
//! A [`Machine`] owns an energy reservoir, a three-group inventory
//! (SOURCE, CHARGE, OUTPUT), an event bus, and a [`MachineBehavior`] that
//! decides what a processing unit does. The per-tick driver lives in
//! [`crate::engine`]; this module holds the state and the contracts the
//! machine offers its neighbours.
//!
//! # Slot layout
//!
//! Global slots run SOURCE first, then the single CHARGE slot, then OUTPUT.
//! Sided access:
//!
//! | Side           | Slots                      |
//! |----------------|----------------------------|
//! | Up             | SOURCE                     |
//! | North/S/W/E    | CHARGE, then SOURCE        |
//! | Down           | OUTPUT                     |

use crate::config::{BillingPolicy, ConfigError, MachineConfig, OverloadPolicy};
use crate::energy::Energy;
use crate::event::{Listener, MachineEvent, MachineEventBus};
use crate::fixed::Ticks;
use crate::id::ListenerId;
use crate::inventory::{CompositeInventory, GroupKey, SlotGroup};
use crate::item::ItemStack;
use crate::offer::{EnergyConsumer, EnergyOffer, OfferOutcome};
use crate::reservoir::{EnergyReservoir, SharedReservoir};
use crate::routing::{Direction, ItemConsumer, ItemSupplier, SlotAccess, can_merge_items, merge_items_capped};
use crate::serialize::ProcessRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Slot groups
// ---------------------------------------------------------------------------

/// The three slot groups every machine declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MachineSlot {
    Source,
    Charge,
    Output,
}

impl GroupKey for MachineSlot {
    fn name(&self) -> &'static str {
        match self {
            MachineSlot::Source => "SOURCE",
            MachineSlot::Charge => "CHARGE",
            MachineSlot::Output => "OUTPUT",
        }
    }
}

// ---------------------------------------------------------------------------
// Core state
// ---------------------------------------------------------------------------

/// State shared by every machine regardless of behavior. Behaviors receive
/// it mutably during a tick.
#[derive(Debug)]
pub struct MachineCore {
    pub(crate) config: MachineConfig,
    pub(crate) reservoir: SharedReservoir,
    pub(crate) inventory: CompositeInventory<MachineSlot>,
    pub(crate) working: bool,
    pub(crate) dirty: bool,
}

impl MachineCore {
    fn new(config: MachineConfig) -> Self {
        let inventory = CompositeInventory::new([
            (
                MachineSlot::Source,
                SlotGroup::new(config.source_slots, config.max_stack_size),
            ),
            (MachineSlot::Charge, SlotGroup::new(1, config.max_stack_size)),
            (
                MachineSlot::Output,
                SlotGroup::new(config.output_slots, config.max_stack_size),
            ),
        ]);
        Self {
            reservoir: SharedReservoir::new(EnergyReservoir::empty(config.max_charge)),
            inventory,
            working: false,
            dirty: false,
            config,
        }
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn reservoir(&self) -> &SharedReservoir {
        &self.reservoir
    }

    pub fn inventory(&self) -> &CompositeInventory<MachineSlot> {
        &self.inventory
    }

    pub fn inventory_mut(&mut self) -> &mut CompositeInventory<MachineSlot> {
        &mut self.inventory
    }

    pub fn is_working(&self) -> bool {
        self.working
    }

    /// Behaviors set this while a unit makes progress. The driver clears it
    /// at the start of every tick.
    pub fn set_working(&mut self, working: bool) {
        self.working = working;
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn max_stack_size(&self) -> u32 {
        self.config.max_stack_size
    }

    /// Copies of every SOURCE stack, in slot order.
    pub fn source_stacks(&self) -> Vec<ItemStack> {
        self.inventory
            .group(MachineSlot::Source)
            .map(|g| g.iter().cloned().collect())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Behavior contract
// ---------------------------------------------------------------------------

/// Tick-wide information handed to [`Machine::on_tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickContext {
    pub tick: Ticks,
}

/// What one call to [`Machine::on_tick`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub working: bool,
    /// The working flag differs from the previous tick; observers that
    /// render the machine's state should refresh.
    pub working_changed: bool,
    /// Persistent state changed and should be saved.
    pub dirty: bool,
}

/// The processing logic of a machine. A machine runs `parallel_process`
/// units per tick; each unit is identified by its index.
pub trait MachineBehavior {
    /// Scratch data a unit carries from `can_process` through
    /// `on_process_finished` within a single tick.
    type Context: Default;

    /// Extra configuration checks run by [`Machine::new`].
    fn validate(&self, _config: &MachineConfig) -> Result<(), ConfigError> {
        Ok(())
    }

    fn energy_per_tick(&self, core: &MachineCore) -> Energy {
        core.config.energy_per_tick
    }

    fn billing(&self, core: &MachineCore) -> BillingPolicy {
        core.config.billing
    }

    /// Whether unit `unit` has work it can do right now.
    fn can_process(&mut self, unit: usize, core: &mut MachineCore, cx: &mut Self::Context) -> bool;

    /// Advance the unit by one tick. Returns `true` when its cycle completes.
    fn tick_process(&mut self, unit: usize, core: &mut MachineCore, cx: &mut Self::Context) -> bool;

    /// Apply the result of a completed cycle.
    fn on_process_finished(&mut self, unit: usize, core: &mut MachineCore, cx: &mut Self::Context);

    /// Called after the SOURCE group's contents change through `set_stack`
    /// or `consume`.
    fn on_source_set(&mut self, core: &mut MachineCore, _was_empty: bool, _is_empty: bool) {
        core.mark_dirty();
    }

    /// Behavior-specific progress to persist, if any.
    fn save_state(&self) -> Option<ProcessRecord> {
        None
    }

    fn load_state(&mut self, _record: &ProcessRecord) {}
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

/// An energy-powered machine driven by behavior `B`.
#[derive(Debug)]
pub struct Machine<B: MachineBehavior> {
    pub(crate) core: MachineCore,
    pub(crate) behavior: B,
    pub(crate) events: MachineEventBus,
    broken: bool,
    top_slots: Vec<usize>,
    side_slots: Vec<usize>,
    bottom_slots: Vec<usize>,
}

impl<B: MachineBehavior> Machine<B> {
    /// Build a machine with an empty reservoir and inventory.
    pub fn new(config: MachineConfig, behavior: B) -> Result<Self, ConfigError> {
        config.validate()?;
        behavior.validate(&config)?;
        let core = MachineCore::new(config);
        let top_slots: Vec<usize> = core.inventory.slots_of(MachineSlot::Source).collect();
        let side_slots: Vec<usize> = core
            .inventory
            .slots_of(MachineSlot::Charge)
            .chain(top_slots.iter().copied())
            .collect();
        let bottom_slots: Vec<usize> = core.inventory.slots_of(MachineSlot::Output).collect();
        Ok(Self {
            core,
            behavior,
            events: MachineEventBus::new(),
            broken: false,
            top_slots,
            side_slots,
            bottom_slots,
        })
    }

    pub fn core(&self) -> &MachineCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut MachineCore {
        &mut self.core
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    pub fn behavior_mut(&mut self) -> &mut B {
        &mut self.behavior
    }

    pub fn config(&self) -> &MachineConfig {
        &self.core.config
    }

    pub fn reservoir(&self) -> &SharedReservoir {
        &self.core.reservoir
    }

    pub fn charge(&self) -> Energy {
        self.core.reservoir.charge()
    }

    pub fn is_working(&self) -> bool {
        self.core.working
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn is_dirty(&self) -> bool {
        self.core.dirty || self.core.inventory.is_dirty()
    }

    /// Return and reset the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        let inventory = self.core.inventory.take_dirty();
        std::mem::replace(&mut self.core.dirty, false) || inventory
    }

    pub fn events(&self) -> &MachineEventBus {
        &self.events
    }

    pub fn add_listener(&mut self, event: MachineEvent, listener: Listener) -> ListenerId {
        self.events.add_listener(event, listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.events.remove_listener(id)
    }

    /// Advance one tick. A broken machine does nothing.
    pub fn on_tick(&mut self, ctx: &TickContext) -> TickReport {
        if self.broken {
            return TickReport::default();
        }
        crate::engine::run_tick(self, ctx)
    }

    /// Seed the reservoir with energy carried by the placed item.
    pub fn on_placed(&mut self, stored: Energy) {
        self.core.reservoir.add(stored);
        self.core.mark_dirty();
    }

    /// Remove the machine from play: it stops working, and every stack it
    /// held is returned for the caller to drop.
    pub fn break_apart(&mut self) -> Vec<ItemStack> {
        debug!(charge = %self.charge(), "machine broken");
        self.broken = true;
        self.core.working = false;
        self.core.mark_dirty();
        self.core.inventory.drain_all()
    }

    // -- Slots --

    pub fn size(&self) -> usize {
        self.core.inventory.size()
    }

    pub fn stack(&self, slot: usize) -> &ItemStack {
        self.core.inventory.get_stack(slot)
    }

    fn is_source_empty(&self) -> bool {
        self.core.inventory.is_group_empty(MachineSlot::Source)
    }

    /// Write a slot under the machine's rules: the CHARGE slot only accepts
    /// a stack while empty, SOURCE writes are capped and reported to the
    /// behavior, OUTPUT ignores external writes.
    pub fn set_stack(&mut self, slot: usize, mut stack: ItemStack) {
        match self.core.inventory.group_of(slot) {
            Some(MachineSlot::Charge) => {
                if self.core.inventory.get_stack(slot).is_empty() {
                    self.core.inventory.set_stack(slot, stack);
                    self.core.mark_dirty();
                }
            }
            Some(MachineSlot::Source) => {
                stack.count = stack.count.min(self.core.max_stack_size());
                let was_empty = self.is_source_empty();
                self.core.inventory.set_stack(slot, stack);
                let is_empty = self.is_source_empty();
                self.behavior.on_source_set(&mut self.core, was_empty, is_empty);
            }
            Some(MachineSlot::Output) | None => {}
        }
    }

    /// Split up to `amount` items off a slot.
    pub fn remove_stack(&mut self, slot: usize, amount: u32) -> ItemStack {
        let was_empty = self.is_source_empty();
        let taken = self.core.inventory.remove_stack(slot, amount);
        if taken.is_empty() {
            return taken;
        }
        self.core.mark_dirty();
        if self.core.inventory.group_of(slot) == Some(MachineSlot::Source) {
            let is_empty = self.is_source_empty();
            self.behavior.on_source_set(&mut self.core, was_empty, is_empty);
        }
        taken
    }

    /// Slots reachable from `side`.
    pub fn available_slots(&self, side: Direction) -> &[usize] {
        match side {
            Direction::Up => &self.top_slots,
            Direction::Down => &self.bottom_slots,
            _ => &self.side_slots,
        }
    }

    /// Whether `stack` may sit in `slot`. OUTPUT never accepts external
    /// stacks; CHARGE accepts only chargeable items that still hold energy.
    pub fn is_valid(&self, slot: usize, stack: &ItemStack) -> bool {
        match self.core.inventory.group_of(slot) {
            Some(MachineSlot::Output) | None => false,
            Some(MachineSlot::Charge) => stack.is_chargeable() && stack.has_energy(),
            Some(MachineSlot::Source) => true,
        }
    }

    /// Whether `stack` may be pulled out of `slot` from `side`. A chargeable
    /// item leaves the CHARGE slot downwards only once it is drained.
    pub fn can_extract(&self, slot: usize, stack: &ItemStack, side: Direction) -> bool {
        if side == Direction::Down && self.core.inventory.group_of(slot) == Some(MachineSlot::Charge) {
            return stack.is_chargeable() && !stack.has_energy();
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Neighbour contracts
// ---------------------------------------------------------------------------

impl<B: MachineBehavior> EnergyConsumer for Machine<B> {
    fn receive_offer(&mut self, offer: &mut dyn EnergyOffer) -> OfferOutcome {
        if self.broken {
            return OfferOutcome::Rejected;
        }
        let limit = self.core.config.energy_level.limit();
        if offer.amount() > limit {
            return match self.core.config.overload {
                OverloadPolicy::Reject => OfferOutcome::Rejected,
                OverloadPolicy::Break => {
                    if !offer.accept() {
                        return OfferOutcome::Rejected;
                    }
                    warn!(amount = %offer.amount(), %limit, "offer exceeds input tier");
                    self.broken = true;
                    self.core.working = false;
                    self.core.mark_dirty();
                    OfferOutcome::Overloaded
                }
            };
        }
        let accepted = self.core.reservoir.receive_offer(offer);
        if accepted {
            self.core.mark_dirty();
            OfferOutcome::Accepted
        } else {
            OfferOutcome::Rejected
        }
    }
}

impl<B: MachineBehavior> ItemConsumer for Machine<B> {
    fn can_consume(&self, stack: &ItemStack, _direction: Direction) -> bool {
        if self.broken || stack.is_empty() {
            return false;
        }
        if stack.is_chargeable() {
            let current = self.core.inventory.stack_in(MachineSlot::Charge, 0);
            return current.is_empty() || can_merge_items(current, stack);
        }
        self.core
            .inventory
            .group(MachineSlot::Source)
            .is_some_and(|g| g.iter().any(|s| s.is_empty() || can_merge_items(s, stack)))
    }

    fn consume(&mut self, stack: ItemStack, direction: Direction) -> ItemStack {
        if !self.can_consume(&stack, direction) {
            return stack;
        }
        self.core.mark_dirty();
        if !stack.is_chargeable() {
            let was_empty = self.is_source_empty();
            let rest = self.core.inventory.add_stack(MachineSlot::Source, stack);
            let is_empty = self.is_source_empty();
            if was_empty != is_empty {
                self.behavior.on_source_set(&mut self.core, was_empty, is_empty);
            }
            return rest;
        }
        let cap = self
            .core
            .inventory
            .group(MachineSlot::Charge)
            .map_or(0, SlotGroup::max_stack_size);
        if self.core.inventory.stack_in(MachineSlot::Charge, 0).is_empty() {
            let mut rest = stack;
            let placed = rest.split(cap.min(rest.max_count));
            self.core.inventory.set_stack_in(MachineSlot::Charge, 0, placed);
            return rest;
        }
        match self.core.inventory.stack_in_mut(MachineSlot::Charge, 0) {
            Some(current) => merge_items_capped(current, stack, cap),
            None => stack,
        }
    }
}

impl<B: MachineBehavior> ItemSupplier for Machine<B> {
    fn can_supply(&self, _direction: Direction) -> Vec<ItemStack> {
        if self.broken {
            return Vec::new();
        }
        self.core
            .inventory
            .group(MachineSlot::Output)
            .map(|g| g.iter().filter(|s| !s.is_empty()).cloned().collect())
            .unwrap_or_default()
    }

    fn supply(&mut self, requested: &ItemStack, _direction: Direction) -> bool {
        let inventory = &mut self.core.inventory;
        if !inventory.can_remove_item(MachineSlot::Output, &requested.item, requested.count) {
            return false;
        }
        let removed = inventory.remove_item(MachineSlot::Output, &requested.item, requested.count);
        self.core.mark_dirty();
        removed.count == requested.count
    }

    fn return_stack(&mut self, stack: ItemStack, _direction: Direction) {
        let rest = self.core.inventory.add_stack(MachineSlot::Output, stack);
        if !rest.is_empty() {
            warn!(item = %rest.item, count = rest.count, "returned stack did not fit back into output");
        }
        self.core.mark_dirty();
    }
}

impl<B: MachineBehavior> SlotAccess for Machine<B> {
    fn slot_count(&self) -> usize {
        self.size()
    }

    fn stack(&self, slot: usize) -> &ItemStack {
        self.core.inventory.get_stack(slot)
    }

    fn stack_mut(&mut self, slot: usize) -> Option<&mut ItemStack> {
        self.core.inventory.get_stack_mut(slot)
    }

    fn put_stack(&mut self, slot: usize, stack: ItemStack) {
        self.set_stack(slot, stack);
    }

    fn max_stack_size(&self, _slot: usize) -> u32 {
        self.core.max_stack_size()
    }

    fn is_valid(&self, slot: usize, stack: &ItemStack) -> bool {
        Machine::is_valid(self, slot, stack)
    }

    fn available_slots(&self, side: Direction) -> Option<Vec<usize>> {
        Some(Machine::available_slots(self, side).to_vec())
    }

    fn can_insert(&self, slot: usize, stack: &ItemStack, side: Direction) -> bool {
        Machine::is_valid(self, slot, stack) && Machine::available_slots(self, side).contains(&slot)
    }

    fn mark_dirty(&mut self) {
        self.core.mark_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::StoredCharge;
    use crate::offer::SharedOffer;
    use crate::test_utils::*;

    fn two_slot() -> Machine<ScriptedBehavior> {
        Machine::new(MachineConfig::one_to_one(2), ScriptedBehavior::new(2)).unwrap()
    }

    // -----------------------------------------------------------------------
    // Test 1: Sided slot lists
    // -----------------------------------------------------------------------
    #[test]
    fn sided_slots_follow_group_layout() {
        let m = two_slot();
        // SOURCE 0-1, CHARGE 2, OUTPUT 3-4
        assert_eq!(m.available_slots(Direction::Up), &[0, 1]);
        assert_eq!(m.available_slots(Direction::North), &[2, 0, 1]);
        assert_eq!(m.available_slots(Direction::East), &[2, 0, 1]);
        assert_eq!(m.available_slots(Direction::Down), &[3, 4]);
    }

    // -----------------------------------------------------------------------
    // Test 2: set_stack rules per group
    // -----------------------------------------------------------------------
    #[test]
    fn charge_slot_only_set_when_empty() {
        let mut m = two_slot();
        m.set_stack(2, battery(10, 100));
        m.set_stack(2, battery(50, 100));
        assert_eq!(m.stack(2).energy.unwrap().charge(), e(10));
    }

    #[test]
    fn output_ignores_external_writes() {
        let mut m = two_slot();
        m.set_stack(3, ingot(5));
        assert!(m.stack(3).is_empty());
    }

    #[test]
    fn source_write_is_capped_and_reported() {
        let mut m = two_slot();
        m.set_stack(0, ore(100));
        assert_eq!(m.stack(0).count, 64);
        assert_eq!(m.behavior().source_changes, vec![(true, false)]);
        m.set_stack(0, ItemStack::EMPTY);
        assert_eq!(m.behavior().source_changes, vec![(true, false), (false, true)]);
    }

    #[test]
    fn validity_and_extraction_rules() {
        let m = two_slot();
        assert!(m.is_valid(0, &ore(1)));
        assert!(!m.is_valid(3, &ore(1)));
        assert!(m.is_valid(2, &battery(5, 100)));
        assert!(!m.is_valid(2, &battery(0, 100)));
        assert!(!m.is_valid(2, &ore(1)));
        assert!(m.can_extract(2, &battery(0, 100), Direction::Down));
        assert!(!m.can_extract(2, &battery(5, 100), Direction::Down));
        assert!(m.can_extract(2, &battery(5, 100), Direction::North));
    }

    // -----------------------------------------------------------------------
    // Test 3: Item consumer / supplier
    // -----------------------------------------------------------------------
    #[test]
    fn consume_routes_chargeables_to_charge_slot() {
        let mut m = two_slot();
        let rest = m.consume(battery(30, 100), Direction::North);
        assert!(rest.is_empty());
        assert!(m.stack(2).is_chargeable());
        assert!(!m.can_consume(&battery(30, 100), Direction::North));
        let rest = m.consume(ore(3), Direction::Up);
        assert!(rest.is_empty());
        assert_eq!(m.stack(0).count, 3);
    }

    #[test]
    fn consume_into_empty_source_notifies_behavior() {
        let mut m = two_slot();
        let _ = m.consume(ore(1), Direction::Up);
        let _ = m.consume(ore(1), Direction::Up);
        assert_eq!(m.behavior().source_changes, vec![(true, false)]);
    }

    #[test]
    fn supplier_offers_output_copies() {
        let mut m = two_slot();
        m.core_mut()
            .inventory_mut()
            .set_stack_in(MachineSlot::Output, 1, ingot(4));
        let offered = m.can_supply(Direction::Down);
        assert_eq!(offered, vec![ingot(4)]);
        assert!(m.supply(&ingot(3), Direction::Down));
        assert_eq!(m.stack(4).count, 1);
        assert!(!m.supply(&ingot(2), Direction::Down));
        m.return_stack(ingot(2), Direction::Down);
        assert_eq!(m.stack(3).count + m.stack(4).count, 3);
    }

    // -----------------------------------------------------------------------
    // Test 4: Energy offers and overload
    // -----------------------------------------------------------------------
    #[test]
    fn offer_within_tier_is_stored() {
        let mut m = two_slot();
        let outcome = m.receive_offer(&mut SharedOffer::new(e(32)));
        assert_eq!(outcome, OfferOutcome::Accepted);
        assert_eq!(m.charge(), e(32));
        assert!(m.is_dirty());
    }

    #[test]
    fn overload_breaks_machine() {
        let mut m = two_slot();
        m.set_stack(0, ore(2));
        let outcome = m.receive_offer(&mut SharedOffer::new(e(33)));
        assert_eq!(outcome, OfferOutcome::Overloaded);
        assert!(m.is_broken());
        assert_eq!(m.charge(), Energy::ZERO);
        let report = m.on_tick(&TickContext::default());
        assert_eq!(report, TickReport::default());
        assert!(!m.can_consume(&ore(1), Direction::Up));
    }

    #[test]
    fn overload_reject_policy_leaves_offer_unclaimed() {
        let cfg = MachineConfig {
            overload: OverloadPolicy::Reject,
            ..MachineConfig::one_to_one(1)
        };
        let mut m = Machine::new(cfg, ScriptedBehavior::new(1)).unwrap();
        let offer = SharedOffer::new(e(100));
        assert_eq!(m.receive_offer(&mut offer.clone()), OfferOutcome::Rejected);
        assert!(!offer.is_claimed());
        assert!(!m.is_broken());
    }

    #[test]
    fn on_placed_seeds_reservoir_clamped() {
        let mut m = two_slot();
        m.on_placed(e(10_000));
        assert_eq!(m.charge(), m.config().max_charge);
    }

    #[test]
    fn break_apart_returns_contents() {
        let mut m = two_slot();
        m.set_stack(0, ore(3));
        m.set_stack(2, battery(1, 100));
        let drops = m.break_apart();
        assert_eq!(drops.len(), 2);
        assert!(m.is_broken());
        assert_eq!(m.size(), 5);
        assert!(m.stack(0).is_empty());
    }

    #[test]
    fn stored_charge_on_items_is_preserved_through_consume() {
        let mut m = two_slot();
        let cell = ItemStack::new("cell", 1)
            .with_max_count(1)
            .with_energy(StoredCharge::new(e(7), e(10)));
        let _ = m.consume(cell.clone(), Direction::West);
        assert_eq!(m.stack(2), &cell);
    }

    #[test]
    fn consume_into_charge_slot_returns_overflow() {
        let mut m = furnace(MachineConfig::one_to_one(1));
        let cells = ItemStack::new("cell", 70).with_energy(StoredCharge::new(e(5), e(10)));
        let rest = m.consume(cells.clone(), Direction::North);
        assert_eq!(m.stack(1).count, 64);
        assert_eq!(rest.count, 6);
        assert_eq!(m.stack(1).count + rest.count, 70);

        let again = m.consume(cells.copy_with_count(3), Direction::North);
        assert_eq!(again.count, 3);
        assert_eq!(m.stack(1).count, 64);
    }

    #[test]
    fn charge_slot_merge_stops_at_stack_size() {
        let cfg = MachineConfig {
            max_stack_size: 16,
            ..MachineConfig::one_to_one(1)
        };
        let mut m = furnace(cfg);
        let cell = ItemStack::new("cell", 10).with_energy(StoredCharge::new(e(5), e(10)));
        assert!(m.consume(cell.clone(), Direction::North).is_empty());
        let rest = m.consume(cell, Direction::North);
        assert_eq!(m.stack(1).count, 16);
        assert_eq!(rest.count, 4);
    }
}
