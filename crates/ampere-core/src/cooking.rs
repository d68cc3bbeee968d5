//! Recipe-driven processing: furnaces, macerators, extractors.
//!
//! [`CookingBehavior`] advances one shared cook timer. Each completed cycle
//! takes the recipe input out of SOURCE and places the result in OUTPUT,
//! and tallies the recipe for later experience payout.
//!
//! Two input modes decide what a unit looks at:
//!
//! - [`InputMode::PerSlot`]: unit `i` reads SOURCE slot `i` and writes
//!   OUTPUT slot `i`.
//! - [`InputMode::WholeSource`]: every unit matches against the whole SOURCE
//!   group and writes to the first OUTPUT slot that can take the result.

use crate::config::{ConfigError, MachineConfig};
use crate::fixed::{fixed64_to_f64, scale_by_count};
use crate::id::RecipeId;
use crate::item::ItemStack;
use crate::machine::{MachineBehavior, MachineCore, MachineSlot};
use crate::recipe::{DEFAULT_COOK_TIME, Recipe, RecipeLookup};
use crate::rng::SimRng;
use crate::serialize::ProcessRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// How processing units map onto SOURCE and OUTPUT slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputMode {
    #[default]
    PerSlot,
    WholeSource,
}

/// Recipe and slot choice carried from `can_process` to `on_process_finished`.
#[derive(Debug, Default)]
pub struct CookingContext {
    recipe: Option<Recipe>,
    source_slot: usize,
    output_slot: usize,
}

/// Experience released by [`CookingBehavior::drain_experience`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperienceDrop {
    /// Recipes completed since the last drain, in id order.
    pub recipes: Vec<RecipeId>,
    pub points: u32,
}

/// Whether `output` can take one more `result` under the slot cap.
fn accepts_output(output: &ItemStack, result: &ItemStack, max_stack_size: u32) -> bool {
    if result.is_empty() {
        return false;
    }
    if output.is_empty() {
        return true;
    }
    if !output.can_combine(result) {
        return false;
    }
    let cap = max_stack_size.min(output.max_count);
    output.count.saturating_add(result.count) <= cap
}

pub struct CookingBehavior {
    recipes: Arc<dyn RecipeLookup + Send + Sync>,
    mode: InputMode,
    cook_speed: u32,
    cook_time: u32,
    cook_time_total: u32,
    recipes_used: BTreeMap<RecipeId, u32>,
}

impl fmt::Debug for CookingBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookingBehavior")
            .field("mode", &self.mode)
            .field("cook_speed", &self.cook_speed)
            .field("cook_time", &self.cook_time)
            .field("cook_time_total", &self.cook_time_total)
            .field("recipes_used", &self.recipes_used)
            .finish_non_exhaustive()
    }
}

impl CookingBehavior {
    pub fn new(recipes: Arc<dyn RecipeLookup + Send + Sync>, mode: InputMode) -> Self {
        Self {
            recipes,
            mode,
            cook_speed: 1,
            cook_time: 0,
            cook_time_total: 0,
            recipes_used: BTreeMap::new(),
        }
    }

    /// Progress added per billed tick.
    pub fn with_cook_speed(mut self, speed: u32) -> Self {
        self.cook_speed = speed.max(1);
        self
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn cook_time(&self) -> u32 {
        self.cook_time
    }

    pub fn cook_time_total(&self) -> u32 {
        self.cook_time_total
    }

    pub fn recipes_used(&self) -> &BTreeMap<RecipeId, u32> {
        &self.recipes_used
    }

    /// Cycle length for whatever SOURCE currently holds.
    fn total_for(&self, core: &MachineCore) -> u32 {
        self.recipes
            .find_recipe(&core.source_stacks())
            .map_or(DEFAULT_COOK_TIME, |r| r.cook_time.max(1))
    }

    fn input_for(&self, unit: usize, core: &MachineCore) -> Vec<ItemStack> {
        match self.mode {
            InputMode::PerSlot => vec![core.inventory.stack_in(MachineSlot::Source, unit).clone()],
            InputMode::WholeSource => core.source_stacks(),
        }
    }

    fn source_slot_for(&self, unit: usize, core: &MachineCore, recipe: &Recipe) -> Option<usize> {
        let group = core.inventory.group(MachineSlot::Source)?;
        match self.mode {
            InputMode::PerSlot => Some(unit),
            InputMode::WholeSource => group
                .iter()
                .position(|s| s.is_of(&recipe.input) && s.count >= recipe.input_count),
        }
    }

    fn output_slot_for(&self, unit: usize, core: &MachineCore, result: &ItemStack) -> Option<usize> {
        let group = core.inventory.group(MachineSlot::Output)?;
        let max = core.max_stack_size();
        match self.mode {
            InputMode::PerSlot => accepts_output(group.get(unit), result, max).then_some(unit),
            InputMode::WholeSource => {
                (0..group.len()).find(|&slot| accepts_output(group.get(slot), result, max))
            }
        }
    }

    /// Pay out experience for every recipe completed since the last call
    /// and reset the tally. Fractional totals round up with probability
    /// equal to their fraction.
    pub fn drain_experience(&mut self, rng: &mut SimRng) -> ExperienceDrop {
        let mut drop = ExperienceDrop::default();
        for (id, count) in std::mem::take(&mut self.recipes_used) {
            let Some(recipe) = self.recipes.recipe_by_id(&id) else {
                debug!(recipe = %id, "tallied recipe no longer known");
                continue;
            };
            let total = scale_by_count(recipe.experience, count);
            trace!(recipe = %id, count, experience = fixed64_to_f64(total), "experience tallied");
            drop.points = drop.points.saturating_add(rng.round_stochastic(total));
            drop.recipes.push(id);
        }
        drop
    }
}

impl MachineBehavior for CookingBehavior {
    type Context = CookingContext;

    fn validate(&self, config: &MachineConfig) -> Result<(), ConfigError> {
        if self.mode != InputMode::PerSlot {
            return Ok(());
        }
        for (group, slots) in [
            ("source", config.source_slots),
            ("output", config.output_slots),
        ] {
            if config.parallel_process > slots {
                return Err(ConfigError::TooManyUnits {
                    units: config.parallel_process,
                    group,
                    slots,
                });
            }
        }
        Ok(())
    }

    fn can_process(&mut self, unit: usize, core: &mut MachineCore, cx: &mut CookingContext) -> bool {
        let input = self.input_for(unit, core);
        let Some(recipe) = self.recipes.find_recipe(&input) else {
            return false;
        };
        let result = recipe.result_for(&input);
        let Some(source_slot) = self.source_slot_for(unit, core, recipe) else {
            return false;
        };
        let Some(output_slot) = self.output_slot_for(unit, core, &result) else {
            trace!(unit, recipe = %recipe.id, "output blocked");
            return false;
        };
        cx.recipe = Some(recipe.clone());
        cx.source_slot = source_slot;
        cx.output_slot = output_slot;
        true
    }

    fn tick_process(&mut self, _unit: usize, core: &mut MachineCore, _cx: &mut CookingContext) -> bool {
        self.cook_time = self.cook_time.saturating_add(self.cook_speed);
        core.set_working(true);
        if self.cook_time < self.cook_time_total {
            return false;
        }
        self.cook_time = 0;
        self.cook_time_total = self.total_for(core);
        true
    }

    fn on_process_finished(&mut self, unit: usize, core: &mut MachineCore, cx: &mut CookingContext) {
        let Some(recipe) = cx.recipe.take() else {
            return;
        };
        let source = core.inventory.stack_in(MachineSlot::Source, cx.source_slot).clone();
        let result = recipe.result_for(std::slice::from_ref(&source));
        let output = core.inventory.stack_in(MachineSlot::Output, cx.output_slot);
        if !recipe.matches(std::slice::from_ref(&source))
            || !accepts_output(output, &result, core.max_stack_size())
        {
            debug!(unit, recipe = %recipe.id, "completed cycle no longer fits, skipped");
            return;
        }
        if output.is_empty() {
            core.inventory
                .set_stack_in(MachineSlot::Output, cx.output_slot, result);
        } else if let Some(out) = core.inventory.stack_in_mut(MachineSlot::Output, cx.output_slot) {
            out.increment(result.count);
        }
        if let Some(src) = core.inventory.stack_in_mut(MachineSlot::Source, cx.source_slot) {
            src.decrement(recipe.input_count);
        }
        core.inventory.mark_dirty();
        core.mark_dirty();
        *self.recipes_used.entry(recipe.id).or_insert(0) += 1;
    }

    fn on_source_set(&mut self, core: &mut MachineCore, was_empty: bool, is_empty: bool) {
        core.mark_dirty();
        if is_empty {
            self.cook_time = 0;
        } else if was_empty {
            self.cook_time_total = self.total_for(core);
        }
    }

    fn save_state(&self) -> Option<ProcessRecord> {
        Some(ProcessRecord {
            current_duration: self.cook_time,
            total_duration: self.cook_time_total,
            recipes_used: self.recipes_used.clone(),
        })
    }

    fn load_state(&mut self, record: &ProcessRecord) {
        self.cook_time = record.current_duration;
        self.cook_time_total = record.total_duration;
        self.recipes_used = record.recipes_used.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BillingPolicy;
    use crate::event::MachineEvent;
    use crate::machine::{Machine, TickContext};
    use crate::test_utils::*;

    fn run(m: &mut Machine<CookingBehavior>, ticks: u32) {
        for t in 0..ticks {
            m.on_tick(&TickContext { tick: t as u64 });
        }
    }

    // -----------------------------------------------------------------------
    // Test 1: A full cook cycle
    // -----------------------------------------------------------------------
    #[test]
    fn smelts_after_cook_time() {
        let mut m = furnace(MachineConfig::one_to_one(1));
        m.on_placed(e(100));
        m.set_stack(0, ore(2));
        assert_eq!(m.behavior().cook_time_total(), 10);

        run(&mut m, 9);
        assert!(m.stack(2).is_empty());
        assert_eq!(m.behavior().cook_time(), 9);

        run(&mut m, 1);
        assert_eq!(m.stack(2), &ingot(1));
        assert_eq!(m.stack(0).count, 1);
        assert_eq!(m.behavior().cook_time(), 0);
        assert_eq!(m.charge(), e(90));
        assert_eq!(m.behavior().recipes_used()[&RecipeId::from("smelt_iron")], 1);
    }

    #[test]
    fn emptying_source_resets_progress() {
        let mut m = furnace(MachineConfig::one_to_one(1));
        m.on_placed(e(100));
        m.set_stack(0, ore(1));
        run(&mut m, 4);
        assert_eq!(m.behavior().cook_time(), 4);
        let taken = m.remove_stack(0, 1);
        assert_eq!(taken.count, 1);
        assert_eq!(m.behavior().cook_time(), 0);
    }

    #[test]
    fn unknown_input_uses_default_total() {
        let mut m = furnace(MachineConfig::one_to_one(1));
        m.set_stack(0, ItemStack::new("dirt", 1));
        assert_eq!(m.behavior().cook_time_total(), DEFAULT_COOK_TIME);
    }

    // -----------------------------------------------------------------------
    // Test 2: Output capacity blocks processing
    // -----------------------------------------------------------------------
    #[test]
    fn full_output_blocks_and_saves_energy() {
        let mut m = furnace(MachineConfig::one_to_one(1));
        m.on_placed(e(100));
        m.set_stack(0, ore(5));
        m.core_mut()
            .inventory_mut()
            .set_stack_in(MachineSlot::Output, 0, ingot(64));
        let log = record_events(&mut m);
        run(&mut m, 3);
        assert_eq!(m.charge(), e(100));
        assert_eq!(log.borrow().as_slice(), &[MachineEvent::CanNotProcess; 3]);
    }

    #[test]
    fn different_item_in_output_blocks() {
        let mut m = furnace(MachineConfig::one_to_one(1));
        m.on_placed(e(100));
        m.set_stack(0, ore(5));
        m.core_mut()
            .inventory_mut()
            .set_stack_in(MachineSlot::Output, 0, ItemStack::new("slag", 1));
        run(&mut m, 20);
        assert_eq!(m.stack(0).count, 5);
    }

    // -----------------------------------------------------------------------
    // Test 3: Parallel slots share one timer under once-per-tick billing
    // -----------------------------------------------------------------------
    #[test]
    fn parallel_slots_finish_together() {
        let mut m = furnace(MachineConfig::one_to_one(2));
        m.on_placed(e(100));
        m.set_stack(0, ore(1));
        m.set_stack(1, ItemStack::new("copper_ore", 1));
        run(&mut m, 10);
        assert_eq!(m.stack(3), &ingot(1));
        assert_eq!(m.stack(4), &ItemStack::new("copper_ingot", 1));
        assert_eq!(m.charge(), e(90));
    }

    #[test]
    fn whole_source_mode_picks_matching_slot() {
        let cfg = MachineConfig {
            source_slots: 2,
            output_slots: 2,
            parallel_process: 1,
            ..MachineConfig::default()
        };
        let mut m = Machine::new(
            cfg,
            CookingBehavior::new(furnace_recipes(), InputMode::WholeSource),
        )
        .unwrap();
        m.on_placed(e(100));
        m.set_stack(1, ore(1));
        m.core_mut()
            .inventory_mut()
            .set_stack_in(MachineSlot::Output, 0, ItemStack::new("slag", 1));
        run(&mut m, 10);
        assert!(m.stack(1).is_empty());
        assert_eq!(m.stack(4), &ingot(1));
    }

    #[test]
    fn per_slot_mode_rejects_more_units_than_slots() {
        let cfg = MachineConfig {
            source_slots: 1,
            output_slots: 1,
            parallel_process: 2,
            ..MachineConfig::default()
        };
        let err = Machine::new(
            cfg,
            CookingBehavior::new(furnace_recipes(), InputMode::PerSlot),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::TooManyUnits { units: 2, .. }));
    }

    #[test]
    fn cook_speed_shortens_cycle() {
        let mut m = Machine::new(
            MachineConfig {
                billing: BillingPolicy::OncePerTick,
                ..MachineConfig::one_to_one(1)
            },
            CookingBehavior::new(furnace_recipes(), InputMode::PerSlot).with_cook_speed(5),
        )
        .unwrap();
        m.on_placed(e(100));
        m.set_stack(0, ore(1));
        run(&mut m, 2);
        assert_eq!(m.stack(2), &ingot(1));
    }

    // -----------------------------------------------------------------------
    // Test 4: Experience
    // -----------------------------------------------------------------------
    #[test]
    fn drain_experience_pays_whole_part_and_resets() {
        let mut m = furnace(MachineConfig::one_to_one(1));
        m.on_placed(e(100));
        m.set_stack(0, ore(4));
        run(&mut m, 40);
        assert_eq!(m.stack(2).count, 4);

        let mut rng = SimRng::new(11);
        let drop = m.behavior_mut().drain_experience(&mut rng);
        // 4 x 0.75 = 3.0 exactly
        assert_eq!(drop.points, 3);
        assert_eq!(drop.recipes, vec![RecipeId::from("smelt_iron")]);
        assert!(m.behavior().recipes_used().is_empty());
    }

    #[test]
    fn process_state_round_trips() {
        let mut m = furnace(MachineConfig::one_to_one(1));
        m.on_placed(e(100));
        m.set_stack(0, ore(1));
        run(&mut m, 3);
        let saved = m.behavior().save_state().unwrap();
        assert_eq!(saved.current_duration, 3);
        assert_eq!(saved.total_duration, 10);

        let mut other = furnace(MachineConfig::one_to_one(1));
        other.behavior_mut().load_state(&saved);
        assert_eq!(other.behavior().cook_time(), 3);
        assert_eq!(other.behavior().cook_time_total(), 10);
    }
}
