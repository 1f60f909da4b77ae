//! Departure: frees the admission slot, records the trip and removes the bus.

use bevy_ecs::prelude::{Commands, Entity, Query, ResMut};
use tracing::info;

use crate::clock::{EventKind, SimulationClock};
use crate::dispatcher::Dispatcher;
use crate::ecs::{Boarding, Bus, BusState, Delivered, Seated};
use crate::presentation::{Presentation, PresentationEvent};
use crate::telemetry::{DepartureRecord, SimTelemetry};

pub fn departure_system(
    mut commands: Commands,
    mut clock: ResMut<SimulationClock>,
    mut dispatcher: ResMut<Dispatcher>,
    mut telemetry: ResMut<SimTelemetry>,
    mut presentation: ResMut<Presentation>,
    buses: Query<(Entity, &Bus, &BusState)>,
) {
    let now = clock.now();
    let mut departed = 0;

    for (entity, bus, state) in buses.iter() {
        if !matches!(state, BusState::Departed) {
            continue;
        }
        dispatcher.release_launch();
        dispatcher.forget(entity);

        for &passenger in &bus.seats {
            commands
                .entity(passenger)
                .remove::<(Boarding, Seated)>()
                .insert(Delivered {
                    bus: entity,
                    at: now,
                });
        }
        telemetry.departures.push(DepartureRecord {
            bus: entity,
            color: bus.color,
            passengers: bus.seats.len(),
            capacity: bus.capacity,
            spawned_at: bus.spawned_at,
            launched_at: bus.launched_at,
            departed_at: now,
        });
        presentation.notify(PresentationEvent::BusDeparted {
            bus: entity,
            color: bus.color,
            passengers: bus.seats.len(),
        });
        info!(
            bus = ?entity,
            color = ?bus.color,
            passengers = bus.seats.len(),
            active = dispatcher.active_count(),
            "bus departed"
        );
        commands.entity(entity).despawn();
        departed += 1;
    }

    // Judge the level on the next tick, once the despawns have landed.
    if departed > 0 && !clock.has_pending(EventKind::CheckLevelStatus) {
        let next_tick = clock.now() + clock.tick_ms();
        clock.schedule_at(next_tick, EventKind::CheckLevelStatus);
    }
}
