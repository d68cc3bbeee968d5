//! Criterion benchmarks for the Ampere tick pipeline.
//!
//! Three benchmark groups:
//! - `furnace_tick`: a single busy furnace under each billing policy
//! - `furnace_row`: 256 furnaces routing ingots into their neighbours
//! - `snapshot`: binary encode and decode of a loaded machine

use ampere_core::config::{BillingPolicy, MachineConfig};
use ampere_core::cooking::CookingBehavior;
use ampere_core::machine::{Machine, TickContext};
use ampere_core::routing::{self, Direction};
use ampere_core::test_utils::*;
use criterion::{criterion_group, criterion_main, Criterion};

// ===========================================================================
// Machine builders
// ===========================================================================

/// A four-unit furnace with full source slots and plenty of energy.
fn busy_furnace(billing: BillingPolicy) -> Machine<CookingBehavior> {
    let mut m = furnace(MachineConfig {
        billing,
        max_charge: e(1_000_000),
        ..MachineConfig::one_to_one(4)
    });
    m.on_placed(e(1_000_000));
    for slot in 0..4 {
        m.set_stack(slot, ore(64));
    }
    m
}

/// A row of furnaces, each smelting and passing ingots east.
fn build_row(len: usize) -> Vec<Machine<CookingBehavior>> {
    (0..len)
        .map(|_| {
            let mut m = furnace(MachineConfig::one_to_one(1));
            m.on_placed(e(400));
            m.set_stack(0, ore(64));
            m
        })
        .collect()
}

fn step_row(row: &mut [Machine<CookingBehavior>], tick: u64) {
    let ctx = TickContext { tick };
    for m in row.iter_mut() {
        m.on_tick(&ctx);
    }
    for i in 0..row.len().saturating_sub(1) {
        let (left, right) = row.split_at_mut(i + 1);
        routing::supply(&mut left[i], &mut right[0], Direction::East);
    }
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_furnace_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("furnace_tick");
    for (name, billing) in [
        ("once_per_tick", BillingPolicy::OncePerTick),
        ("per_unit", BillingPolicy::PerUnit),
    ] {
        let mut m = busy_furnace(billing);
        let mut tick = 0u64;
        group.bench_function(name, |b| {
            b.iter(|| {
                m.on_tick(&TickContext { tick });
                tick += 1;
            })
        });
    }
    group.finish();
}

fn bench_furnace_row(c: &mut Criterion) {
    let mut row = build_row(256);
    let mut tick = 0u64;
    c.bench_function("furnace_row_256", |b| {
        b.iter(|| {
            step_row(&mut row, tick);
            tick += 1;
        })
    });
}

fn bench_snapshot(c: &mut Criterion) {
    let mut m = busy_furnace(BillingPolicy::OncePerTick);
    for t in 0..15 {
        m.on_tick(&TickContext { tick: t });
    }
    let bytes = m.serialize().unwrap();

    let mut group = c.benchmark_group("snapshot");
    group.bench_function("serialize", |b| b.iter(|| m.serialize().unwrap()));
    group.bench_function("deserialize", |b| {
        let mut target = busy_furnace(BillingPolicy::OncePerTick);
        b.iter(|| target.deserialize_into(&bytes).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_furnace_tick, bench_furnace_row, bench_snapshot);
criterion_main!(benches);
