//! Loading at a demand queue: pull in, seat passengers one at a time, pull out.

use bevy_ecs::prelude::{Commands, Entity, Query, Res, ResMut, With, Without};
use tracing::{debug, warn};

use crate::clock::SimulationClock;
use crate::demand::DemandQueue;
use crate::ecs::{Boarding, Bus, BusState, Heading, LoadPhase, Passenger, Position};
use crate::presentation::{Presentation, PresentationEvent};
use crate::route::Route;
use crate::scenario::BusTuning;
use crate::telemetry::SimTelemetry;

const APPROACH_TURN_SPEEDUP: f32 = 5.0;

#[allow(clippy::too_many_arguments)]
pub fn loading_bus_system(
    mut commands: Commands,
    clock: Res<SimulationClock>,
    tuning: Res<BusTuning>,
    route: Option<Res<Route>>,
    mut presentation: ResMut<Presentation>,
    mut telemetry: ResMut<SimTelemetry>,
    mut queues: Query<&mut DemandQueue>,
    passengers: Query<&Position, (With<Passenger>, Without<Bus>)>,
    mut buses: Query<(Entity, &mut Bus, &mut BusState, &mut Position, &mut Heading)>,
) {
    let dt_ms = clock.tick_ms();

    for (entity, mut bus, mut state, mut position, mut heading) in buses.iter_mut() {
        if !matches!(*state, BusState::Loading { .. }) {
            continue;
        }
        let BusState::Loading { queue, phase } = &mut *state else {
            continue;
        };
        let queue_entity = *queue;

        match phase {
            LoadPhase::Approach {
                tween,
                from_heading,
                to_heading,
            } => {
                position.0 = tween.step(dt_ms);
                let turn = (tween.progress() * APPROACH_TURN_SPEEDUP).min(1.0);
                heading.0 = from_heading.slerp(*to_heading, turn);
                if tween.is_finished() {
                    *phase = LoadPhase::NextPassenger;
                }
            }
            LoadPhase::NextPassenger => {
                let taken = if bus.is_full() {
                    None
                } else {
                    queues
                        .get_mut(queue_entity)
                        .ok()
                        .and_then(|mut q| q.take_one(bus.color))
                };
                let seated = taken.and_then(|passenger| {
                    bus.board(passenger).map(|seat_index| (passenger, seat_index))
                });
                match seated {
                    Some((passenger, seat_index)) => {
                        let seat = bus.seat_position(seat_index, position.0, heading.0);
                        commands.entity(passenger).insert(Boarding {
                            bus: entity,
                            seat_index,
                            target: seat,
                        });
                        telemetry.boardings += 1;
                        presentation.notify(PresentationEvent::PassengerBoarded {
                            bus: entity,
                            passenger,
                            seat_index,
                        });
                        debug!(bus = ?entity, passenger = ?passenger, seat_index, "passenger boarding");
                        *phase = LoadPhase::AwaitSeat {
                            passenger,
                            seat,
                            remaining_ms: tuning.boarding_timeout_ms,
                        };
                    }
                    None => {
                        *phase = LoadPhase::Settle {
                            remaining_ms: tuning.settle_ms,
                        };
                    }
                }
            }
            LoadPhase::AwaitSeat {
                passenger,
                seat,
                remaining_ms,
            } => {
                // A passenger that no longer exists counts as arrived.
                let arrived = passengers
                    .get(*passenger)
                    .map(|p| p.0.distance(*seat) <= tuning.seat_arrival_distance)
                    .unwrap_or(true);
                *remaining_ms = remaining_ms.saturating_sub(dt_ms);
                if arrived {
                    *phase = LoadPhase::NextPassenger;
                } else if *remaining_ms == 0 {
                    warn!(bus = ?entity, passenger = ?passenger, "passenger never reached its seat; moving on");
                    telemetry.boarding_timeouts += 1;
                    *phase = LoadPhase::NextPassenger;
                }
            }
            LoadPhase::Settle { remaining_ms } => {
                *remaining_ms = remaining_ms.saturating_sub(dt_ms);
                if *remaining_ms == 0 {
                    if let Some(route) = route.as_deref() {
                        bus.route_t = route.closest_param(position.0);
                    }
                    debug!(bus = ?entity, passengers = bus.seats.len(), t = bus.route_t, "leaving stop");
                    *state = BusState::OnRoute;
                }
            }
        }
    }
}
