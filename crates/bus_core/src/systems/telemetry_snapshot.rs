use bevy_ecs::prelude::{Entity, Query, Res, ResMut};

use crate::clock::SimulationClock;
use crate::demand::DemandQueue;
use crate::dispatcher::Dispatcher;
use crate::ecs::{Bus, BusState, Position};
use crate::telemetry::{
    BusSnapshot, SimCounts, SimSnapshot, SimSnapshotConfig, SimSnapshots, SimTelemetry,
};

/// Captures a fleet snapshot when the configured interval has elapsed.
pub fn capture_snapshot_system(
    clock: Res<SimulationClock>,
    config: Res<SimSnapshotConfig>,
    telemetry: Res<SimTelemetry>,
    dispatcher: Res<Dispatcher>,
    mut snapshots: ResMut<SimSnapshots>,
    buses: Query<(Entity, &Bus, &BusState, &Position)>,
    queues: Query<&DemandQueue>,
) {
    let now = clock.now();

    let mut counts = SimCounts {
        buses_scheduled: dispatcher.pending_count(),
        buses_departed_total: telemetry.departures.len(),
        passengers_waiting: queues.iter().map(DemandQueue::waiting_count).sum(),
        ..Default::default()
    };

    let mut fleet = Vec::new();
    for (entity, bus, state, position) in buses.iter() {
        let kind = state.kind();
        counts.add_bus(kind);
        fleet.push(BusSnapshot {
            entity,
            color: bus.color,
            state: kind,
            position: position.0,
            route_t: bus.route_t,
            passengers: bus.seats.len(),
        });
    }

    snapshots.last_snapshot_at = Some(now);
    snapshots.snapshots.push_back(SimSnapshot {
        timestamp_ms: now,
        counts,
        buses: fleet,
    });
    while snapshots.snapshots.len() > config.max_snapshots {
        snapshots.snapshots.pop_front();
    }
}
