//! Passenger movement: walking to a seat, riding along, and standing in line.

use bevy_ecs::prelude::{Changed, Commands, Entity, Query, Res, With, Without};

use crate::clock::SimulationClock;
use crate::demand::DemandQueue;
use crate::ecs::{Boarding, Bus, Delivered, Heading, Passenger, Position, Seated};
use crate::motion::move_towards;
use crate::scenario::BusTuning;

type WalkingPassenger<'a> = (Entity, &'a Boarding, &'a mut Position);
type RidingPassenger<'a> = (&'a Seated, &'a mut Position);

/// Walks boarding passengers to their seat and keeps seated ones on theirs.
pub fn passenger_boarding_system(
    mut commands: Commands,
    clock: Res<SimulationClock>,
    tuning: Res<BusTuning>,
    buses: Query<(&Bus, &Position, &Heading)>,
    mut walking: Query<WalkingPassenger, (With<Passenger>, Without<Bus>)>,
    mut riding: Query<RidingPassenger, (With<Passenger>, Without<Bus>, Without<Boarding>)>,
) {
    let step = tuning.passenger_speed * clock.dt_secs();

    for (entity, boarding, mut position) in walking.iter_mut() {
        position.0 = move_towards(position.0, boarding.target, step);
        if position.0 == boarding.target {
            commands.entity(entity).remove::<Boarding>().insert(Seated {
                bus: boarding.bus,
                seat_index: boarding.seat_index,
            });
        }
    }

    for (seated, mut position) in riding.iter_mut() {
        let Ok((bus, bus_position, heading)) = buses.get(seated.bus) else {
            continue;
        };
        let seat = bus.seat_position(seated.seat_index, bus_position.0, heading.0);
        if position.0 != seat {
            position.0 = seat;
        }
    }
}

/// Moves waiting passengers up whenever their queue changed.
pub fn queue_layout_system(
    queues: Query<&DemandQueue, Changed<DemandQueue>>,
    mut waiting: Query<
        &mut Position,
        (
            With<Passenger>,
            Without<Boarding>,
            Without<Seated>,
            Without<Delivered>,
            Without<DemandQueue>,
        ),
    >,
) {
    for queue in queues.iter() {
        for (passenger, spot) in queue.standing_spots() {
            if let Ok(mut position) = waiting.get_mut(passenger) {
                if position.0 != spot {
                    position.0 = spot;
                }
            }
        }
    }
}
