use bevy_ecs::prelude::{Query, Res};

use crate::clock::SimulationClock;
use crate::ecs::{Bus, BusState, Heading, Position};
use crate::level::ExitPoint;
use crate::motion::{look_rotation, move_towards};
use crate::scenario::BusTuning;

/// Drives exiting buses straight to the exit point; they never brake.
pub fn exiting_bus_system(
    clock: Res<SimulationClock>,
    tuning: Res<BusTuning>,
    exit: Res<ExitPoint>,
    mut buses: Query<(&Bus, &mut BusState, &mut Position, &mut Heading)>,
) {
    let dt = clock.dt_secs();
    for (bus, mut state, mut position, mut heading) in buses.iter_mut() {
        if !matches!(*state, BusState::Exiting) {
            continue;
        }
        if let Some(facing) = look_rotation(exit.0 - position.0) {
            heading.0 = facing;
        }
        position.0 = move_towards(position.0, exit.0, bus.speed * dt);
        if position.0.distance(exit.0) <= tuning.exit_arrival_distance {
            *state = BusState::Departed;
        }
    }
}
