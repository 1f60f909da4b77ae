//! Keeps [SpatialGrid] in sync with bus positions and demand queues.

use bevy_ecs::prelude::{Added, Changed, Entity, Query, RemovedComponents, ResMut, With};

use crate::demand::DemandQueue;
use crate::ecs::{Bus, Position};
use crate::spatial::SpatialGrid;

/// Inserts, moves and drops buses in the grid. Skips all work on ticks where
/// no bus spawned, moved or left.
pub fn update_spatial_index_buses_system(
    mut grid: ResMut<SpatialGrid>,
    added_buses: Query<(Entity, &Position), Added<Bus>>,
    moved_buses: Query<(Entity, &Position), (Changed<Position>, With<Bus>)>,
    mut removed_buses: RemovedComponents<Bus>,
) {
    for (entity, position) in added_buses.iter() {
        grid.insert_bus(entity, position.0);
    }

    // Freshly added buses also show up as changed; update_bus handles both.
    for (entity, position) in moved_buses.iter() {
        if grid.bus_position(entity) != Some(position.0) {
            grid.update_bus(entity, position.0);
        }
    }

    for entity in removed_buses.read() {
        grid.remove_bus(entity);
    }
}

pub fn update_spatial_index_queues_system(
    mut grid: ResMut<SpatialGrid>,
    added_queues: Query<(Entity, &DemandQueue, &Position), Added<DemandQueue>>,
    mut removed_queues: RemovedComponents<DemandQueue>,
) {
    for (entity, queue, position) in added_queues.iter() {
        grid.insert_queue(entity, position.0, queue.detection_radius);
    }
    for entity in removed_queues.read() {
        grid.remove_queue(entity);
    }
}
