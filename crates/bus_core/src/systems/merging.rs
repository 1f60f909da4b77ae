//! Merging: clearance check, merge lock, and the timed drive onto the route.

use bevy_ecs::prelude::{Entity, Query, Res, ResMut};
use tracing::{debug, error};

use crate::clock::SimulationClock;
use crate::collision::{path_blocked, BusView, FleetView, TrafficRole};
use crate::dispatcher::Dispatcher;
use crate::ecs::{Bus, BusState, Heading, MergePhase, Position};
use crate::motion::{look_rotation, Tween};
use crate::route::Route;
use crate::scenario::BusTuning;
use crate::spatial::SpatialGrid;

/// Heading catches up with the entry direction over the first fifth of the merge.
const MERGE_TURN_SPEEDUP: f32 = 5.0;

#[allow(clippy::too_many_arguments)]
pub fn merging_bus_system(
    clock: Res<SimulationClock>,
    tuning: Res<BusTuning>,
    route: Option<Res<Route>>,
    grid: Res<SpatialGrid>,
    fleet: Res<FleetView>,
    mut dispatcher: ResMut<Dispatcher>,
    mut buses: Query<(Entity, &mut Bus, &mut BusState, &mut Position, &mut Heading)>,
) {
    let dt_ms = clock.tick_ms();
    let route = route.as_deref();

    for (entity, mut bus, mut state, mut position, mut heading) in buses.iter_mut() {
        if !matches!(*state, BusState::Merging(_)) {
            continue;
        }
        let me = BusView::new(entity, TrafficRole::of(&state, bus.route_t), position.0);
        let BusState::Merging(phase) = &mut *state else {
            continue;
        };

        let next = match phase {
            MergePhase::AwaitingClearance { retry_in_ms } => {
                if *retry_in_ms > 0 {
                    *retry_in_ms = retry_in_ms.saturating_sub(dt_ms);
                    None
                } else if path_blocked(&me, heading.0, &*grid, &fleet, &tuning) {
                    *retry_in_ms = tuning.clearance_retry_ms;
                    None
                } else {
                    Some(MergePhase::AcquiringLock { retry_in_ms: 0 })
                }
            }
            MergePhase::AcquiringLock { retry_in_ms } => {
                if *retry_in_ms > 0 {
                    *retry_in_ms = retry_in_ms.saturating_sub(dt_ms);
                    None
                } else if let Some(route) = route {
                    if dispatcher.try_lock_entry(entity) {
                        let entry_t = route.closest_param(position.0);
                        let target = route.point_at(entry_t);
                        let to_heading = look_rotation(target - position.0).unwrap_or(heading.0);
                        debug!(bus = ?entity, entry_t, "merge lock acquired");
                        Some(MergePhase::Entering {
                            tween: Tween::new(position.0, target, tuning.merge_duration_ms),
                            from_heading: heading.0,
                            to_heading,
                            entry_t,
                        })
                    } else {
                        *retry_in_ms = tuning.lock_retry_ms;
                        None
                    }
                } else {
                    error!(bus = ?entity, "no route to merge onto; bus stalls");
                    Some(MergePhase::Stalled)
                }
            }
            MergePhase::Entering {
                tween,
                from_heading,
                to_heading,
                entry_t,
            } => {
                if path_blocked(&me, heading.0, &*grid, &fleet, &tuning) {
                    None
                } else {
                    position.0 = tween.step(dt_ms);
                    let turn = (tween.progress() * MERGE_TURN_SPEEDUP).min(1.0);
                    heading.0 = from_heading.slerp(*to_heading, turn);
                    if tween.is_finished() {
                        bus.route_t = *entry_t;
                        dispatcher.unlock_entry(entity);
                        dispatcher.leave_queue(entity);
                        debug!(bus = ?entity, t = bus.route_t, "merged onto route");
                        *state = BusState::OnRoute;
                        continue;
                    }
                    None
                }
            }
            MergePhase::Stalled => None,
        };

        if let Some(next) = next {
            *state = BusState::Merging(next);
        }
    }
}
