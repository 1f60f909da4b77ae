//! Performance benchmarks for bus_core using Criterion.rs.

use std::collections::BTreeMap;

use bevy_ecs::prelude::{Entity, World};
use bevy_math::{Quat, Vec3};
use bus_core::dispatcher::plan_fleet;
use bus_core::ecs::PassengerColor;
use bus_core::launch::launch_ready_buses;
use bus_core::runner::{initialize_simulation, run_until_outcome_with_hook, simulation_schedule};
use bus_core::scenario::{build_level, LevelConfig, NodeConfig};
use bus_core::spatial::{SpatialGrid, SpatialQuery};
use bus_core::test_helpers::{empty_level, near_node, side_node, two_color_level};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const COLORS: [PassengerColor; 4] = [
    PassengerColor::Red,
    PassengerColor::Blue,
    PassengerColor::Green,
    PassengerColor::Yellow,
];

fn crowded_level(per_batch: usize) -> LevelConfig {
    let mut near = near_node();
    let mut side = side_node();
    for (i, color) in COLORS.iter().enumerate() {
        if i % 2 == 0 {
            near = near.with_batch(*color, per_batch);
        } else {
            side = side.with_batch(*color, per_batch);
        }
    }
    empty_level()
        .with_node(near)
        .with_node(side)
        .with_priority_order(COLORS.to_vec())
}

fn play_level(config: &LevelConfig) {
    let mut world = World::new();
    if build_level(&mut world, config).is_err() {
        return;
    }
    initialize_simulation(&mut world);
    let mut schedule = simulation_schedule();
    black_box(run_until_outcome_with_hook(
        &mut world,
        &mut schedule,
        100_000,
        |world| {
            launch_ready_buses(world);
        },
    ));
}

fn bench_level_play(c: &mut Criterion) {
    let mut group = c.benchmark_group("level_play");
    group.sample_size(10);

    let two_color = two_color_level();
    group.bench_function("two_color", |b| b.iter(|| play_level(&two_color)));

    for per_batch in [5usize, 15, 30] {
        let config = crowded_level(per_batch);
        group.bench_with_input(
            BenchmarkId::new("crowded", per_batch),
            &config,
            |b, config| b.iter(|| play_level(config)),
        );
    }
    group.finish();
}

fn bench_plan_fleet(c: &mut Criterion) {
    let tally: BTreeMap<PassengerColor, usize> =
        COLORS.iter().enumerate().map(|(i, c)| (*c, 37 + i * 11)).collect();
    c.bench_function("plan_fleet_four_colors", |b| {
        b.iter(|| black_box(plan_fleet(black_box(&tally), &COLORS, 5)))
    });
}

fn bench_spatial_overlap(c: &mut Criterion) {
    let mut grid = SpatialGrid::default();
    for i in 0..200u32 {
        let angle = i as f32 * 0.1;
        grid.insert_bus(
            Entity::from_raw(i),
            Vec3::new(angle.cos() * 20.0, 0.0, angle.sin() * 20.0),
        );
    }
    c.bench_function("overlap_box_200_buses", |b| {
        b.iter(|| {
            black_box(grid.overlap_box(
                black_box(Vec3::new(20.0, 0.0, 0.0)),
                Vec3::new(0.75, 0.5, 0.625),
                Quat::IDENTITY,
            ))
        })
    });
}

criterion_group!(benches, bench_level_play, bench_plan_fleet, bench_spatial_overlap);
criterion_main!(benches);
