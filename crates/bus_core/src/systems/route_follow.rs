//! Buses on the route: advance, brake, stop at matching queues, peel off to the exit.

use bevy_ecs::prelude::{Entity, Query, Res, ResMut};
use bevy_math::Vec3;
use tracing::{debug, info};

use crate::clock::SimulationClock;
use crate::collision::{path_blocked, BusView, FleetView, TrafficRole};
use crate::demand::DemandQueue;
use crate::ecs::{Bus, BusState, Heading, LoadPhase, Position};
use crate::motion::{look_rotation, Tween};
use crate::presentation::{Presentation, PresentationEvent};
use crate::route::Route;
use crate::scenario::BusTuning;
use crate::spatial::{SpatialGrid, SpatialQuery};

/// First queue within the stop check radius that this bus can load from.
fn find_stop(
    bus: &Bus,
    position: Vec3,
    tuning: &BusTuning,
    grid: &impl SpatialQuery,
    queues: &Query<&DemandQueue>,
) -> Option<(Entity, Option<Vec3>)> {
    if tuning.node_detection_radius <= 0.0 || bus.is_full() {
        return None;
    }
    grid.overlap_sphere(position, tuning.node_detection_radius)
        .into_iter()
        .filter_map(|hit| hit.node())
        .find_map(|entity| {
            let queue = queues.get(entity).ok()?;
            if !queue.has_color(bus.color) {
                return None;
            }
            match queue.stop_point {
                Some(stop) if position.distance(stop) > tuning.stop_distance => None,
                stop => Some((entity, stop)),
            }
        })
}

/// Exit once past the threshold with nothing left to do: full, or no
/// passenger of this color waits anywhere.
fn should_exit(bus: &Bus, tuning: &BusTuning, fleet: &FleetView) -> bool {
    bus.route_t > tuning.exit_threshold && (bus.is_full() || fleet.waiting_for(bus.color) == 0)
}

#[allow(clippy::too_many_arguments)]
pub fn route_follow_system(
    clock: Res<SimulationClock>,
    tuning: Res<BusTuning>,
    route: Option<Res<Route>>,
    grid: Res<SpatialGrid>,
    fleet: Res<FleetView>,
    queues: Query<&DemandQueue>,
    mut presentation: ResMut<Presentation>,
    mut buses: Query<(Entity, &mut Bus, &mut BusState, &mut Position, &mut Heading)>,
) {
    let Some(route) = route.as_deref() else {
        return;
    };
    let dt = clock.dt_secs();
    let length = tuning.route_length(route);

    for (entity, mut bus, mut state, mut position, mut heading) in buses.iter_mut() {
        if !matches!(*state, BusState::OnRoute) {
            continue;
        }

        let me = BusView::new(entity, TrafficRole::OnRoute { t: bus.route_t }, position.0);
        if path_blocked(&me, heading.0, &*grid, &fleet, &tuning) {
            continue;
        }

        bus.route_t = (bus.route_t + bus.speed * dt / length).rem_euclid(1.0);
        position.0 = route.point_at(bus.route_t);
        if let Some(facing) = route.direction_at(bus.route_t).and_then(look_rotation) {
            heading.0 = heading.0.slerp(facing, (tuning.turn_rate * dt).min(1.0));
        }

        if let Some((queue, stop)) = find_stop(&bus, position.0, &tuning, &*grid, &queues) {
            let phase = match stop {
                Some(stop) => LoadPhase::Approach {
                    tween: Tween::new(position.0, stop, tuning.stop_approach_ms),
                    from_heading: heading.0,
                    to_heading: look_rotation(stop - position.0).unwrap_or(heading.0),
                },
                None => LoadPhase::NextPassenger,
            };
            debug!(bus = ?entity, queue = ?queue, t = bus.route_t, "stopping to load");
            *state = BusState::Loading { queue, phase };
            continue;
        }

        if should_exit(&bus, &tuning, &fleet) {
            if bus.is_full() {
                presentation.notify(PresentationEvent::BusFull { bus: entity });
            }
            info!(
                bus = ?entity,
                color = ?bus.color,
                passengers = bus.seats.len(),
                "heading for the exit"
            );
            *state = BusState::Exiting;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::PassengerColor;

    #[test]
    fn exit_waits_for_threshold_and_for_a_reason() {
        let tuning = BusTuning::default();
        let mut fleet = FleetView::default();
        fleet.waiting_mut().insert(PassengerColor::Red, 2);

        let mut bus = Bus::new(PassengerColor::Red, 2, 5.0, 0);
        bus.route_t = 0.5;
        bus.seats = vec![Entity::from_raw(1), Entity::from_raw(2)];
        assert!(!should_exit(&bus, &tuning, &fleet), "full but before threshold");

        bus.route_t = 0.85;
        assert!(should_exit(&bus, &tuning, &fleet));

        bus.seats.pop();
        assert!(!should_exit(&bus, &tuning, &fleet), "red passengers still wait");

        fleet.waiting_mut().insert(PassengerColor::Red, 0);
        assert!(should_exit(&bus, &tuning, &fleet), "no red demand left anywhere");
    }
}
