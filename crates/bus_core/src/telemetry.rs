//! Telemetry: departure records, launch counters and periodic fleet snapshots.

use std::collections::VecDeque;

use bevy_ecs::prelude::{Entity, Resource};
use bevy_math::Vec3;

use crate::ecs::{BusStateKind, PassengerColor};

/// One bus that reached the exit and left the level.
#[derive(Debug, Clone, PartialEq)]
pub struct DepartureRecord {
    pub bus: Entity,
    pub color: PassengerColor,
    pub passengers: usize,
    pub capacity: usize,
    pub spawned_at: u64,
    pub launched_at: Option<u64>,
    pub departed_at: u64,
}

impl DepartureRecord {
    /// Time from launch acceptance to departure.
    pub fn time_on_route(&self) -> Option<u64> {
        self.launched_at
            .map(|launched| self.departed_at.saturating_sub(launched))
    }

    /// Time spent waiting in a slot before launch.
    pub fn time_in_queue(&self) -> Option<u64> {
        self.launched_at
            .map(|launched| launched.saturating_sub(self.spawned_at))
    }

    pub fn is_full(&self) -> bool {
        self.passengers >= self.capacity
    }
}

#[derive(Debug, Default, Resource)]
pub struct SimTelemetry {
    pub departures: Vec<DepartureRecord>,
    pub buses_spawned: usize,
    pub boardings: usize,
    pub boarding_timeouts: usize,
    pub launches_accepted: usize,
    pub launches_rejected: usize,
}

impl SimTelemetry {
    pub fn passengers_delivered(&self) -> usize {
        self.departures.iter().map(|d| d.passengers).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BusSnapshot {
    pub entity: Entity,
    pub color: PassengerColor,
    pub state: BusStateKind,
    pub position: Vec3,
    pub route_t: f32,
    pub passengers: usize,
}

/// Aggregated counts at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimCounts {
    pub buses_queued: usize,
    pub buses_merging: usize,
    pub buses_on_route: usize,
    pub buses_loading: usize,
    pub buses_exiting: usize,
    pub buses_scheduled: usize,
    pub buses_departed_total: usize,
    pub passengers_waiting: usize,
}

impl SimCounts {
    pub fn add_bus(&mut self, state: BusStateKind) {
        match state {
            BusStateKind::Queued => self.buses_queued += 1,
            BusStateKind::Merging => self.buses_merging += 1,
            BusStateKind::OnRoute => self.buses_on_route += 1,
            BusStateKind::Loading => self.buses_loading += 1,
            BusStateKind::Exiting => self.buses_exiting += 1,
            BusStateKind::Departed => {}
        }
    }

    /// Buses past launch that have not left yet.
    pub fn buses_active(&self) -> usize {
        self.buses_merging + self.buses_on_route + self.buses_loading + self.buses_exiting
    }
}

/// Snapshot of the level at a specific timestamp (simulation ms).
#[derive(Debug, Clone)]
pub struct SimSnapshot {
    pub timestamp_ms: u64,
    pub counts: SimCounts,
    pub buses: Vec<BusSnapshot>,
}

/// Snapshot capture configuration.
#[derive(Debug, Clone, Copy, Resource)]
pub struct SimSnapshotConfig {
    pub interval_ms: u64,
    pub max_snapshots: usize,
}

impl Default for SimSnapshotConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            max_snapshots: 10_000,
        }
    }
}

/// Rolling snapshot buffer.
#[derive(Debug, Default, Resource)]
pub struct SimSnapshots {
    pub snapshots: VecDeque<SimSnapshot>,
    pub last_snapshot_at: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn departure_record_durations() {
        let record = DepartureRecord {
            bus: Entity::from_raw(1),
            color: PassengerColor::Blue,
            passengers: 5,
            capacity: 5,
            spawned_at: 1_000,
            launched_at: Some(4_000),
            departed_at: 19_000,
        };
        assert_eq!(record.time_in_queue(), Some(3_000));
        assert_eq!(record.time_on_route(), Some(15_000));
        assert!(record.is_full());
    }

    #[test]
    fn counts_ignore_departed_buses() {
        let mut counts = SimCounts::default();
        counts.add_bus(BusStateKind::Queued);
        counts.add_bus(BusStateKind::OnRoute);
        counts.add_bus(BusStateKind::Loading);
        counts.add_bus(BusStateKind::Departed);
        assert_eq!(counts.buses_queued, 1);
        assert_eq!(counts.buses_active(), 2);
    }
}
