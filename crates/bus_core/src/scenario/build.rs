use std::collections::BTreeMap;

use bevy_ecs::prelude::{Entity, With, World};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use super::config::{LevelConfig, NodeConfig};
use super::error::LevelConfigError;
use super::params::{FleetSpec, LevelNumber};
use crate::clock::{DueEvents, SimulationClock};
use crate::collision::FleetView;
use crate::demand::{Batch, DemandQueue};
use crate::dispatcher::{override_fleet, Dispatcher};
use crate::ecs::{Bus, Passenger, PassengerColor, Position};
use crate::level::{ExitPoint, LevelStatus};
use crate::presentation::Presentation;
use crate::route::Route;
use crate::spatial::SpatialGrid;
use crate::telemetry::{SimSnapshotConfig, SimSnapshots, SimTelemetry};

/// Spatial grid cell edge, in world units.
const GRID_CELL_SIZE: f32 = 4.0;

/// Validates `config` and populates `world` with a fresh level: resources,
/// demand queues and their waiting passengers, plus the computed bus schedule.
///
/// A [Presentation] already in the world is kept; otherwise a null sink is
/// inserted. Call [crate::runner::initialize_simulation] afterwards.
pub fn build_level(world: &mut World, config: &LevelConfig) -> Result<(), LevelConfigError> {
    config.validate()?;

    let mut tuning = config.tuning;
    let route = Route::new(config.route.points.clone(), config.route.closed);
    if tuning.route_length_estimate.is_none() {
        tuning.route_length_estimate = Some(tuning.route_length(&route));
    }

    world.insert_resource(SimulationClock::with_tick_ms(config.timing.tick_ms));
    world.insert_resource(DueEvents::default());
    world.insert_resource(route);
    world.insert_resource(tuning);
    world.insert_resource(config.timing);
    world.insert_resource(FleetSpec {
        capacity: config.capacity,
        seat_offsets: config.seat_offsets.clone(),
    });
    world.insert_resource(LevelNumber(config.level_number));
    world.insert_resource(ExitPoint(config.exit_point));
    world.insert_resource(LevelStatus::Running);
    world.insert_resource(FleetView::default());
    world.insert_resource(SpatialGrid::new(GRID_CELL_SIZE, tuning.body_radius));
    world.insert_resource(SimTelemetry::default());
    world.insert_resource(SimSnapshotConfig::default());
    world.insert_resource(SimSnapshots::default());
    if !world.contains_resource::<Presentation>() {
        world.insert_resource(Presentation::default());
    }

    let mut tally = BTreeMap::new();
    for node in &config.nodes {
        spawn_node(world, node, &mut tally);
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut dispatcher = Dispatcher::new(config.waiting_slots.clone(), config.max_active);
    match config.fleet_override {
        Some(buses) => {
            dispatcher.set_schedule(override_fleet(buses, &config.priority_order, &mut rng));
        }
        None => {
            dispatcher.compute_schedule(&tally, &config.priority_order, config.capacity, &mut rng);
        }
    }
    world.insert_resource(dispatcher);

    info!(
        level = config.level_number,
        nodes = config.nodes.len(),
        passengers = config.total_passengers(),
        "level built"
    );
    Ok(())
}

fn spawn_node(
    world: &mut World,
    node: &NodeConfig,
    tally: &mut BTreeMap<PassengerColor, usize>,
) -> Entity {
    let mut queue = DemandQueue::new(node.position, node.stop_point, node.detection_radius)
        .with_layout(node.layout);
    queue.next_nodes = node.next_nodes.clone();

    for batch in &node.batches {
        let passengers: Vec<Entity> = (0..batch.count)
            .map(|_| {
                world
                    .spawn((Passenger { color: batch.color }, Position(node.position)))
                    .id()
            })
            .collect();
        queue.push_batch(Batch::new(batch.color, passengers));
    }

    for (passenger, spot) in queue.standing_spots() {
        if let Some(mut position) = world.get_mut::<Position>(passenger) {
            position.0 = spot;
        }
    }
    queue.tally_into(tally);

    world.spawn((queue, Position(node.position))).id()
}

/// Removes every bus, passenger and queue, then builds `config` from scratch.
pub fn reset_level(world: &mut World, config: &LevelConfig) -> Result<(), LevelConfigError> {
    config.validate()?;

    let mut doomed: Vec<Entity> = Vec::new();
    doomed.extend(world.query_filtered::<Entity, With<Bus>>().iter(world));
    doomed.extend(world.query_filtered::<Entity, With<Passenger>>().iter(world));
    doomed.extend(world.query_filtered::<Entity, With<DemandQueue>>().iter(world));
    for entity in doomed {
        world.despawn(entity);
    }
    if let Some(mut grid) = world.get_resource_mut::<SpatialGrid>() {
        grid.clear();
    }

    build_level(world, config)
}
