//! Bus spawner: fills the lowest free waiting slot from the schedule, one bus per tick of the spawn cadence.

use std::f32::consts::PI;

use bevy_ecs::prelude::{Commands, Res, ResMut};
use bevy_math::Quat;
use tracing::{debug, warn};

use crate::clock::{DueEvents, EventKind, SimulationClock};
use crate::dispatcher::Dispatcher;
use crate::ecs::{Bus, BusState, Heading, Position};
use crate::motion::Tween;
use crate::presentation::{Presentation, PresentationEvent};
use crate::scenario::{BusTuning, DispatchTiming, FleetSpec};
use crate::telemetry::SimTelemetry;

/// Reacts to [EventKind::SpawnBus]. Re-arms itself while the schedule is non-empty.
#[allow(clippy::too_many_arguments)]
pub fn bus_spawner_system(
    mut commands: Commands,
    mut clock: ResMut<SimulationClock>,
    mut dispatcher: ResMut<Dispatcher>,
    mut presentation: ResMut<Presentation>,
    mut telemetry: ResMut<SimTelemetry>,
    events: Res<DueEvents>,
    tuning: Res<BusTuning>,
    timing: Res<DispatchTiming>,
    fleet: Res<FleetSpec>,
) {
    if !events.contains(EventKind::SpawnBus) {
        return;
    }

    if let Some((color, slot)) = dispatcher.next_spawn() {
        match dispatcher.slot_position(slot) {
            Some(spot) => {
                let start = spot + tuning.slot_entry_offset;
                let mut bus = Bus::new(color, fleet.capacity, tuning.speed, clock.now());
                bus.seat_offsets = fleet.seat_offsets.clone();
                let entity = commands
                    .spawn((
                        bus,
                        BusState::Queued {
                            tween: Some(Tween::new(start, spot, tuning.slot_entry_ms)),
                            launch_accepted: false,
                        },
                        Position(start),
                        Heading(Quat::from_rotation_y(PI)),
                    ))
                    .id();
                dispatcher.occupy(slot, entity);
                telemetry.buses_spawned += 1;
                presentation.notify(PresentationEvent::BusSpawned {
                    bus: entity,
                    color,
                    slot,
                });
                debug!(bus = ?entity, ?color, slot, remaining = dispatcher.pending_count(), "bus spawned");
            }
            None => warn!(slot, "free slot has no position; bus dropped"),
        }
    }

    if dispatcher.has_pending() {
        clock.schedule_in(timing.spawn_interval_ms, EventKind::SpawnBus);
    }
}
