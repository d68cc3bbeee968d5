//! Shared test helpers for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::config::MachineConfig;
use crate::cooking::{CookingBehavior, InputMode};
use crate::energy::Energy;
use crate::event::MachineEvent;
use crate::fixed::f64_to_fixed64;
use crate::item::{ItemStack, StoredCharge};
use crate::machine::{Machine, MachineBehavior, MachineCore};
use crate::recipe::{Recipe, RecipeBook, RecipeLookup};
use crate::routing::{Direction, ItemConsumer, Neighborhood};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

// ===========================================================================
// Quantities and stacks
// ===========================================================================

pub fn e(v: u32) -> Energy {
    Energy::from(v)
}

pub fn ore(count: u32) -> ItemStack {
    ItemStack::new("iron_ore", count)
}

pub fn ingot(count: u32) -> ItemStack {
    ItemStack::new("iron_ingot", count)
}

pub fn copper_ore(count: u32) -> ItemStack {
    ItemStack::new("copper_ore", count)
}

/// A single battery holding `charge` of `capacity`.
pub fn battery(charge: u32, capacity: u32) -> ItemStack {
    ItemStack::new("battery", 1)
        .with_max_count(1)
        .with_energy(StoredCharge::new(e(charge), e(capacity)))
}

// ===========================================================================
// Recipes and machines
// ===========================================================================

/// Iron and copper smelting, 10 ticks each.
pub fn furnace_recipes() -> Arc<dyn RecipeLookup + Send + Sync> {
    let book: RecipeBook = [
        Recipe {
            id: "smelt_iron".into(),
            input: "iron_ore".into(),
            input_count: 1,
            result: ingot(1),
            cook_time: 10,
            experience: f64_to_fixed64(0.75),
        },
        Recipe {
            id: "smelt_copper".into(),
            input: "copper_ore".into(),
            input_count: 1,
            result: ItemStack::new("copper_ingot", 1),
            cook_time: 10,
            experience: f64_to_fixed64(0.5),
        },
    ]
    .into_iter()
    .collect();
    Arc::new(book)
}

/// A per-slot furnace using [`furnace_recipes`].
pub fn furnace(config: MachineConfig) -> Machine<CookingBehavior> {
    Machine::new(
        config,
        CookingBehavior::new(furnace_recipes(), InputMode::PerSlot),
    )
    .expect("valid furnace config")
}

/// Subscribe to every event kind and collect dispatches in order.
pub fn record_events<B: MachineBehavior>(machine: &mut Machine<B>) -> Rc<RefCell<Vec<MachineEvent>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    for kind in MachineEvent::ALL {
        let log = Rc::clone(&log);
        machine.add_listener(kind, Box::new(move |e| log.borrow_mut().push(e)));
    }
    log
}

// ===========================================================================
// Scripted behavior
// ===========================================================================

/// A behavior whose runnable units and cycle length are set by the test,
/// and which records every call it receives.
#[derive(Debug, Default)]
pub struct ScriptedBehavior {
    /// Per-unit `can_process` answers. Missing entries count as runnable.
    pub runnable: Vec<bool>,
    /// Ticks per cycle. Zero never completes.
    pub cycle: u32,
    pub progress: u32,
    pub ticked: Vec<usize>,
    pub finished: Vec<usize>,
    pub source_changes: Vec<(bool, bool)>,
}

impl ScriptedBehavior {
    pub fn new(units: usize) -> Self {
        Self {
            runnable: vec![true; units],
            ..Self::default()
        }
    }
}

impl MachineBehavior for ScriptedBehavior {
    type Context = ();

    fn can_process(&mut self, unit: usize, _core: &mut MachineCore, _cx: &mut ()) -> bool {
        self.runnable.get(unit).copied().unwrap_or(true)
    }

    fn tick_process(&mut self, unit: usize, core: &mut MachineCore, _cx: &mut ()) -> bool {
        self.ticked.push(unit);
        core.set_working(true);
        if self.cycle == 0 {
            return false;
        }
        self.progress += 1;
        if self.progress >= self.cycle {
            self.progress = 0;
            return true;
        }
        false
    }

    fn on_process_finished(&mut self, unit: usize, _core: &mut MachineCore, _cx: &mut ()) {
        self.finished.push(unit);
    }

    fn on_source_set(&mut self, core: &mut MachineCore, was_empty: bool, is_empty: bool) {
        core.mark_dirty();
        self.source_changes.push((was_empty, is_empty));
    }
}

// ===========================================================================
// Routing fixtures
// ===========================================================================

/// Consumers keyed by the side they sit on.
pub struct NeighborMap<C: ItemConsumer> {
    pub sides: HashMap<Direction, C>,
}

impl<C: ItemConsumer> NeighborMap<C> {
    pub fn new() -> Self {
        Self {
            sides: HashMap::new(),
        }
    }

    pub fn with(mut self, side: Direction, consumer: C) -> Self {
        self.sides.insert(side, consumer);
        self
    }
}

impl<C: ItemConsumer> Default for NeighborMap<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ItemConsumer> Neighborhood for NeighborMap<C> {
    fn consumer_at(&mut self, direction: Direction) -> Option<&mut dyn ItemConsumer> {
        self.sides
            .get_mut(&direction)
            .map(|c| c as &mut dyn ItemConsumer)
    }
}
