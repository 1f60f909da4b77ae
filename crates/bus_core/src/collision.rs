//! Right of way between buses and the forward sensor that enforces it.
//!
//! A bus brakes when its sensor box overlaps another bus it must yield to.
//! [must_yield] is antisymmetric for every pair of moving buses, so two buses
//! that see each other never both brake.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use bevy_ecs::prelude::{Entity, Resource};
use bevy_math::{Quat, Vec3};

use crate::ecs::{BusState, MergePhase, PassengerColor};
use crate::route::wrapped_param_diff;
use crate::scenario::BusTuning;
use crate::spatial::SpatialQuery;

/// What a bus is doing, as far as other buses' sensors care.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrafficRole {
    Queued,
    /// Merging, lock not yet held.
    AwaitingMerge,
    /// Merging with the merge lock held.
    Entering,
    OnRoute { t: f32 },
    Loading,
    Exiting,
}

impl TrafficRole {
    pub fn of(state: &BusState, route_t: f32) -> Self {
        match state {
            BusState::Queued { .. } => TrafficRole::Queued,
            BusState::Merging(MergePhase::Entering { .. }) => TrafficRole::Entering,
            BusState::Merging(_) => TrafficRole::AwaitingMerge,
            BusState::OnRoute => TrafficRole::OnRoute { t: route_t },
            BusState::Loading { .. } => TrafficRole::Loading,
            // Departed buses are removed this tick; treat them like a bus leaving.
            BusState::Exiting | BusState::Departed => TrafficRole::Exiting,
        }
    }

    /// Lower rank yields. The merge lock holder outranks route traffic.
    fn rank(&self) -> u8 {
        match self {
            TrafficRole::Queued => 0,
            TrafficRole::AwaitingMerge => 1,
            TrafficRole::OnRoute { .. } => 2,
            TrafficRole::Entering => 3,
            TrafficRole::Loading | TrafficRole::Exiting => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusView {
    pub entity: Entity,
    pub role: TrafficRole,
    pub position: Vec3,
}

impl BusView {
    pub fn new(entity: Entity, role: TrafficRole, position: Vec3) -> Self {
        Self {
            entity,
            role,
            position,
        }
    }
}

fn wins_tie(me: Entity, other: Entity) -> bool {
    me.to_bits() < other.to_bits()
}

/// Whether `me` must brake for `other` when `other` is inside its sensor.
pub fn must_yield(me: &BusView, other: &BusView) -> bool {
    match (me.role, other.role) {
        (_, TrafficRole::Queued) => false,
        (_, TrafficRole::Loading | TrafficRole::Exiting) => true,
        (TrafficRole::OnRoute { t: mine }, TrafficRole::OnRoute { t: theirs }) => {
            let ahead_by = wrapped_param_diff(mine, theirs);
            if ahead_by == 0.0 || ahead_by == 0.5 {
                !wins_tie(me.entity, other.entity)
            } else {
                ahead_by < 0.0
            }
        }
        (mine, theirs) => match mine.rank().cmp(&theirs.rank()) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => !wins_tie(me.entity, other.entity),
        },
    }
}

/// Oriented sensor box in front of a bus: `(center, half_extents, rotation)`.
pub fn forward_sensor(position: Vec3, heading: Quat, tuning: &BusTuning) -> (Vec3, Vec3, Quat) {
    let forward = heading * Vec3::Z;
    let center =
        position + forward * (tuning.sensor_length * 0.5) + Vec3::Y * (tuning.sensor_height * 0.5);
    let half_extents = Vec3::new(
        tuning.sensor_width * 0.5,
        tuning.sensor_height * 0.5,
        tuning.sensor_length * 0.5,
    );
    (center, half_extents, heading)
}

/// True when a bus the sensor sees has right of way over `me`.
pub fn path_blocked(
    me: &BusView,
    heading: Quat,
    spatial: &impl SpatialQuery,
    fleet: &FleetView,
    tuning: &BusTuning,
) -> bool {
    let (center, half_extents, rotation) = forward_sensor(me.position, heading, tuning);
    spatial
        .overlap_box(center, half_extents, rotation)
        .into_iter()
        .filter_map(|hit| hit.bus())
        .filter(|&entity| entity != me.entity)
        .filter_map(|entity| fleet.get(entity))
        .any(|other| must_yield(me, other))
}

/// Per-tick snapshot of every bus and of waiting demand.
///
/// Rebuilt at the start of each tick; buses decide against this view rather
/// than against whatever earlier systems in the same tick already changed.
#[derive(Debug, Default, Resource)]
pub struct FleetView {
    buses: HashMap<Entity, BusView>,
    waiting: BTreeMap<PassengerColor, usize>,
}

impl FleetView {
    pub fn clear(&mut self) {
        self.buses.clear();
        self.waiting.clear();
    }

    pub fn insert(&mut self, view: BusView) {
        self.buses.insert(view.entity, view);
    }

    pub fn get(&self, entity: Entity) -> Option<&BusView> {
        self.buses.get(&entity)
    }

    pub fn len(&self) -> usize {
        self.buses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }

    pub fn waiting_mut(&mut self) -> &mut BTreeMap<PassengerColor, usize> {
        &mut self.waiting
    }

    /// Passengers of `color` waiting in any queue at the start of the tick.
    pub fn waiting_for(&self, color: PassengerColor) -> usize {
        self.waiting.get(&color).copied().unwrap_or(0)
    }

    pub fn total_waiting(&self) -> usize {
        self.waiting.values().sum()
    }
}
