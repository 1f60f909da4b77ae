//! Player-facing launch requests ("tap a bus").

use bevy_ecs::prelude::{Entity, World};
use tracing::{debug, info};

use crate::clock::SimulationClock;
use crate::dispatcher::{is_front_slot, Dispatcher};
use crate::ecs::{Bus, BusState};
use crate::presentation::{Presentation, PresentationEvent};
use crate::telemetry::SimTelemetry;

/// Outcome of [try_launch_bus].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchResponse {
    Accepted,
    /// Launch was accepted earlier; nothing changes.
    AlreadyLaunched,
    /// Only the two front slots may launch.
    NotAtFront,
    /// Admission cap reached.
    GateClosed,
    UnknownBus,
}

impl LaunchResponse {
    pub fn is_accepted(self) -> bool {
        self == LaunchResponse::Accepted
    }
}

fn notify(world: &mut World, event: PresentationEvent) {
    if let Some(mut presentation) = world.get_resource_mut::<Presentation>() {
        presentation.notify(event);
    }
}

/// Asks the dispatcher to admit `bus` onto the route.
///
/// On acceptance the bus starts merging on the next tick its slot animation
/// allows. Rejections leave every counter untouched.
pub fn try_launch_bus(world: &mut World, bus: Entity) -> LaunchResponse {
    let response = evaluate_launch(world, bus);
    match response {
        LaunchResponse::Accepted => {
            let now = world
                .get_resource::<SimulationClock>()
                .map(SimulationClock::now)
                .unwrap_or(0);
            if let Some(mut state) = world.get_mut::<BusState>(bus) {
                if let BusState::Queued {
                    launch_accepted, ..
                } = &mut *state
                {
                    *launch_accepted = true;
                }
            }
            if let Some(mut record) = world.get_mut::<Bus>(bus) {
                record.launched_at = Some(now);
            }
            if let Some(mut telemetry) = world.get_resource_mut::<SimTelemetry>() {
                telemetry.launches_accepted += 1;
            }
            info!(bus = ?bus, at = now, "launch accepted");
            notify(world, PresentationEvent::LaunchAccepted { bus });
        }
        LaunchResponse::AlreadyLaunched => {}
        rejected => {
            if let Some(mut telemetry) = world.get_resource_mut::<SimTelemetry>() {
                telemetry.launches_rejected += 1;
            }
            debug!(bus = ?bus, reason = ?rejected, "launch rejected");
            notify(
                world,
                PresentationEvent::LaunchRejected {
                    bus,
                    reason: rejected,
                },
            );
        }
    }
    response
}

fn evaluate_launch(world: &mut World, bus: Entity) -> LaunchResponse {
    let Some(state) = world.get::<BusState>(bus) else {
        return LaunchResponse::UnknownBus;
    };
    match state {
        BusState::Queued {
            launch_accepted: false,
            ..
        } => {}
        _ => return LaunchResponse::AlreadyLaunched,
    }

    let Some(mut dispatcher) = world.get_resource_mut::<Dispatcher>() else {
        return LaunchResponse::UnknownBus;
    };
    match dispatcher.slot_of(bus) {
        None => LaunchResponse::UnknownBus,
        Some(slot) if !is_front_slot(slot) => LaunchResponse::NotAtFront,
        Some(_) => {
            if dispatcher.request_launch() {
                LaunchResponse::Accepted
            } else {
                LaunchResponse::GateClosed
            }
        }
    }
}

/// Launches every launchable front-slot bus, lowest slot first. Returns how
/// many were accepted. Used by demos and tests as an auto-play policy.
pub fn launch_ready_buses(world: &mut World) -> usize {
    let candidates: Vec<Entity> = {
        let Some(dispatcher) = world.get_resource::<Dispatcher>() else {
            return 0;
        };
        (0..dispatcher.slot_count())
            .filter(|&slot| is_front_slot(slot))
            .filter_map(|slot| dispatcher.occupant(slot))
            .collect()
    };

    let mut accepted = 0;
    for bus in candidates {
        let waiting = matches!(
            world.get::<BusState>(bus),
            Some(BusState::Queued {
                launch_accepted: false,
                ..
            })
        );
        let gate_open = world
            .get_resource::<Dispatcher>()
            .map(Dispatcher::can_launch)
            .unwrap_or(false);
        if waiting && gate_open && try_launch_bus(world, bus).is_accepted() {
            accepted += 1;
        }
    }
    accepted
}
