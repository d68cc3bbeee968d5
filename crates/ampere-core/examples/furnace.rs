//! A battery-powered furnace smelting a stack of ore.
//!
//! Run with `RUST_LOG=ampere_core=debug` to see the tick pipeline.

use std::sync::Arc;

use ampere_core::config::{EnergyLevel, MachineConfig};
use ampere_core::cooking::{CookingBehavior, InputMode};
use ampere_core::energy::Energy;
use ampere_core::event::MachineEvent;
use ampere_core::fixed::f64_to_fixed64;
use ampere_core::item::{ItemStack, StoredCharge};
use ampere_core::machine::{Machine, TickContext};
use ampere_core::recipe::{Recipe, RecipeBook};
use ampere_core::rng::SimRng;
use ampere_core::routing::{Direction, ItemConsumer};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let book: RecipeBook = [Recipe {
        id: "smelt_iron".into(),
        input: "iron_ore".into(),
        input_count: 1,
        result: ItemStack::new("iron_ingot", 1),
        cook_time: 40,
        experience: f64_to_fixed64(0.7),
    }]
    .into_iter()
    .collect();

    let config = MachineConfig {
        energy_level: EnergyLevel::L2,
        energy_per_tick: Energy::from(2u32),
        ..MachineConfig::one_to_one(2)
    };
    let mut furnace = Machine::new(config, CookingBehavior::new(Arc::new(book), InputMode::PerSlot))?;
    furnace.add_listener(
        MachineEvent::Processed,
        Box::new(|_| info!("cycle complete")),
    );

    let battery = ItemStack::new("battery", 1)
        .with_max_count(1)
        .with_energy(StoredCharge::new(Energy::from(300u32), Energy::from(300u32)));
    let rest = furnace.consume(battery, Direction::Up);
    if !rest.is_empty() {
        return Err("charge slot refused the battery".into());
    }
    furnace.set_stack(0, ItemStack::new("iron_ore", 3));
    furnace.set_stack(1, ItemStack::new("iron_ore", 2));

    for tick in 0..200 {
        let report = furnace.on_tick(&TickContext { tick });
        if report.working_changed {
            info!(tick, working = report.working, charge = %furnace.charge(), "state changed");
        }
    }

    let out = furnace.core().inventory().slots_of(ampere_core::machine::MachineSlot::Output);
    for slot in out {
        let stack = furnace.stack(slot);
        if !stack.is_empty() {
            info!(slot, item = %stack.item, count = stack.count, "output");
        }
    }

    let drop = furnace.behavior_mut().drain_experience(&mut SimRng::new(42));
    info!(points = drop.points, recipes = drop.recipes.len(), "experience");

    let record = furnace.to_record();
    println!("{}", record.to_json()?);
    Ok(())
}
