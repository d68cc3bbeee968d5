//! Cross-crate production line tests.
//!
//! Machines are defined in data files, loaded through `ampere-data`, powered
//! by per-tick energy offers and chained with item routing from
//! `ampere-core`.

use std::fs;
use std::path::{Path, PathBuf};

use ampere_core::cooking::CookingBehavior;
use ampere_core::energy::Energy;
use ampere_core::event::MachineEvent;
use ampere_core::machine::{Machine, MachineSlot, TickContext};
use ampere_core::offer::{EnergyConsumer, SharedOffer};
use ampere_core::reservoir::EnergyReservoir;
use ampere_core::rng::SimRng;
use ampere_core::routing::{self, Direction, ItemConsumer};
use ampere_core::serialize::MachineRecord;
use ampere_core::test_utils::*;
use ampere_data::{load_machine_data, MachineCatalog};
use fixed::types::I32F32;

fn data_dir(suffix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "ampere_integration_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_line_data(dir: &Path) {
    fs::write(
        dir.join("recipes.ron"),
        r#"[
            (name: "smelt_iron", input: "iron_ore", output: "iron_ingot",
             cook_time: 5, experience: 0.5),
            (name: "press_plate", input: "iron_ingot", output: "iron_plate", cook_time: 5),
        ]"#,
    )
    .unwrap();
    fs::write(
        dir.join("machines.ron"),
        r#"[
            (name: "smelter", recipes: ["smelt_iron"]),
            (name: "press", recipes: ["press_plate"]),
        ]"#,
    )
    .unwrap();
}

fn build(catalog: &MachineCatalog, name: &str) -> Machine<CookingBehavior> {
    catalog.build_machine(name).unwrap().unwrap()
}

// ===========================================================================
// Test 1: Smelter -> press, powered by offers
// ===========================================================================
//
// Each tick a generator hands each machine a fresh offer of 2. Ingots
// leave the smelter as soon as they are made and the press turns each
// into a plate.

#[test]
fn smelter_to_press_line() {
    let dir = data_dir("line");
    write_line_data(&dir);
    let catalog = load_machine_data(&dir).unwrap();

    let mut smelter = build(&catalog, "smelter");
    let mut press = build(&catalog, "press");
    smelter.set_stack(0, ore(4));
    let press_log = record_events(&mut press);

    for tick in 0..40 {
        for machine in [&mut smelter as &mut dyn EnergyConsumer, &mut press] {
            let outcome = machine.receive_offer(&mut SharedOffer::new(e(2)));
            assert!(outcome.is_accepted());
        }
        let ctx = TickContext { tick };
        smelter.on_tick(&ctx);
        press.on_tick(&ctx);
        routing::supply(&mut smelter, &mut press, Direction::East);
    }

    assert!(smelter.stack(0).is_empty());
    assert!(press.stack(0).is_empty());
    assert_eq!(press.stack(2).item.as_str(), "iron_plate");
    assert_eq!(press.stack(2).count, 4);
    assert_eq!(smelter.charge(), e(60));
    assert_eq!(press.charge(), e(60));

    let processed = press_log
        .borrow()
        .iter()
        .filter(|e| **e == MachineEvent::Processed)
        .count();
    assert_eq!(processed, 4);

    let drop = smelter.behavior_mut().drain_experience(&mut SimRng::new(11));
    assert_eq!(drop.points, 2);
    assert_eq!(drop.recipes.len(), 1);

    let _ = fs::remove_dir_all(&dir);
}

// ===========================================================================
// Test 2: Persisted press restored from catalog
// ===========================================================================

#[test]
fn press_state_survives_json_export() {
    let dir = data_dir("persist");
    write_line_data(&dir);
    let catalog = load_machine_data(&dir).unwrap();

    let mut press = build(&catalog, "press");
    press.on_placed(e(100));
    assert!(press.consume(ingot(3), Direction::Up).is_empty());
    for tick in 0..7 {
        press.on_tick(&TickContext { tick });
    }

    let json = press.to_record().to_json().unwrap();
    let record = MachineRecord::from_json(&json).unwrap();

    let mut restored = build(&catalog, "press");
    restored.load_record(&record);
    assert_eq!(restored.to_record(), press.to_record());
    assert_eq!(restored.stack(0), &ingot(2));
    assert_eq!(restored.behavior().cook_time(), 2);

    for tick in 7..10 {
        press.on_tick(&TickContext { tick });
        restored.on_tick(&TickContext { tick });
    }
    assert_eq!(restored.stack(2).count, 2);
    assert_eq!(restored.to_record(), press.to_record());

    let _ = fs::remove_dir_all(&dir);
}

// ===========================================================================
// Test 3: Battery items from the catalog
// ===========================================================================
//
// A charger reservoir fills a catalog battery, which then powers a machine
// through its CHARGE slot.

#[test]
fn catalog_battery_powers_machine() {
    let dir = data_dir("battery");
    fs::write(
        dir.join("items.toml"),
        r#"
[[items]]
name = "battery"
max_count = 1
energy_capacity = 50

[[items]]
name = "iron_ore"

[[items]]
name = "iron_ingot"
"#,
    )
    .unwrap();
    fs::write(
        dir.join("recipes.toml"),
        r#"
[[recipes]]
name = "smelt_iron"
input = "iron_ore"
output = "iron_ingot"
cook_time = 3
experience = 1
"#,
    )
    .unwrap();
    fs::write(
        dir.join("machines.toml"),
        r#"
[[machines]]
name = "furnace"

[machines.config]
energy_per_tick = "2.5"
"#,
    )
    .unwrap();
    let catalog = load_machine_data(&dir).unwrap();

    let recipe = catalog.recipes.iter().next().unwrap();
    assert_eq!(recipe.experience, I32F32::from_num(1));

    let mut battery = catalog.item_stack("battery", 1).unwrap();
    let mut charger = EnergyReservoir::new(e(200), e(200));
    assert_eq!(charger.charge_item(&mut battery, e(32)), e(32));
    assert_eq!(charger.charge_item(&mut battery, e(32)), e(18));
    assert_eq!(charger.charge(), e(150));

    let mut furnace = build(&catalog, "furnace");
    assert!(furnace.can_consume(&battery, Direction::West));
    assert!(furnace.consume(battery, Direction::West).is_empty());
    furnace.set_stack(0, ore(1));

    for tick in 0..3 {
        furnace.on_tick(&TickContext { tick });
    }
    assert_eq!(furnace.stack(2), &ingot(1));
    assert_eq!(furnace.charge(), Energy::from_scaled(425, 1));
    let charge_slot = furnace.core().inventory().stack_in(MachineSlot::Charge, 0);
    assert!(!charge_slot.has_energy());

    let _ = fs::remove_dir_all(&dir);
}
