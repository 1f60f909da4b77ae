use bevy_ecs::prelude::{Component, Entity};
use bevy_math::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::motion::Tween;

/// Passenger and bus colors. A bus only boards passengers of its own color.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PassengerColor {
    Red,
    Green,
    Blue,
    Yellow,
}

impl PassengerColor {
    pub const ALL: [PassengerColor; 4] = [
        PassengerColor::Red,
        PassengerColor::Green,
        PassengerColor::Blue,
        PassengerColor::Yellow,
    ];
}

/// World-space position. Buses, passengers and demand queues all carry one.
#[derive(Debug, Clone, Copy, PartialEq, Default, Component)]
pub struct Position(pub Vec3);

/// Facing of a bus; forward is `heading * Vec3::Z`.
#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct Heading(pub Quat);

impl Default for Heading {
    fn default() -> Self {
        Self(Quat::IDENTITY)
    }
}

impl Heading {
    pub fn forward(&self) -> Vec3 {
        self.0 * Vec3::Z
    }
}

#[derive(Debug, Clone, PartialEq, Component)]
pub struct Bus {
    pub color: PassengerColor,
    pub capacity: usize,
    pub speed: f32,
    /// Boarded passengers in boarding order; never longer than `capacity`.
    pub seats: Vec<Entity>,
    /// Local-space seat positions; seats past the end of this list use the bus origin.
    pub seat_offsets: Vec<Vec3>,
    /// Route parameter, meaningful while the bus is on the route.
    pub route_t: f32,
    pub spawned_at: u64,
    pub launched_at: Option<u64>,
}

impl Bus {
    pub fn new(color: PassengerColor, capacity: usize, speed: f32, spawned_at: u64) -> Self {
        Self {
            color,
            capacity,
            speed,
            seats: Vec::with_capacity(capacity),
            seat_offsets: Vec::new(),
            route_t: 0.0,
            spawned_at,
            launched_at: None,
        }
    }

    pub fn is_full(&self) -> bool {
        self.seats.len() >= self.capacity
    }

    pub fn free_seats(&self) -> usize {
        self.capacity.saturating_sub(self.seats.len())
    }

    /// Seats `passenger` and returns the seat index, or `None` when full.
    pub fn board(&mut self, passenger: Entity) -> Option<usize> {
        if self.is_full() {
            return None;
        }
        self.seats.push(passenger);
        Some(self.seats.len() - 1)
    }

    /// World-space position of seat `index` for a bus at `position` facing `heading`.
    pub fn seat_position(&self, index: usize, position: Vec3, heading: Quat) -> Vec3 {
        match self.seat_offsets.get(index) {
            Some(offset) => position + heading * *offset,
            None => position,
        }
    }
}

/// Sub-steps of entering the route from a waiting slot.
#[derive(Debug, Clone, PartialEq)]
pub enum MergePhase {
    /// Waiting for the forward sensor to clear; re-checked when `retry_in_ms` runs out.
    AwaitingClearance { retry_in_ms: u64 },
    /// Polling the dispatcher's merge lock.
    AcquiringLock { retry_in_ms: u64 },
    /// Lock held; driving onto the route point at `entry_t`.
    Entering {
        tween: Tween,
        from_heading: Quat,
        to_heading: Quat,
        entry_t: f32,
    },
    /// No route to merge onto; the bus never proceeds.
    Stalled,
}

/// Sub-steps of stopping at a demand queue.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadPhase {
    /// Pulling into the queue's stop point.
    Approach {
        tween: Tween,
        from_heading: Quat,
        to_heading: Quat,
    },
    /// Ready to take the next passenger from the front batch.
    NextPassenger,
    /// A passenger is walking to `seat`; gives up after `remaining_ms`.
    AwaitSeat {
        passenger: Entity,
        seat: Vec3,
        remaining_ms: u64,
    },
    /// Short pause before pulling out again.
    Settle { remaining_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Component)]
pub enum BusState {
    Queued {
        /// Slot entry / re-slot animation in progress.
        tween: Option<Tween>,
        launch_accepted: bool,
    },
    Merging(MergePhase),
    OnRoute,
    Loading {
        queue: Entity,
        phase: LoadPhase,
    },
    Exiting,
    Departed,
}

impl BusState {
    pub fn kind(&self) -> BusStateKind {
        match self {
            BusState::Queued { .. } => BusStateKind::Queued,
            BusState::Merging(_) => BusStateKind::Merging,
            BusState::OnRoute => BusStateKind::OnRoute,
            BusState::Loading { .. } => BusStateKind::Loading,
            BusState::Exiting => BusStateKind::Exiting,
            BusState::Departed => BusStateKind::Departed,
        }
    }

    /// Launch accepted or later; counts against the admission gate.
    pub fn is_active(&self) -> bool {
        match self {
            BusState::Queued {
                launch_accepted, ..
            } => *launch_accepted,
            BusState::Departed => false,
            _ => true,
        }
    }
}

/// Data-free view of [BusState] for counting and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusStateKind {
    Queued,
    Merging,
    OnRoute,
    Loading,
    Exiting,
    Departed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Component)]
pub struct Passenger {
    pub color: PassengerColor,
}

/// Passenger walking to a seat of `bus`.
#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct Boarding {
    pub bus: Entity,
    pub seat_index: usize,
    pub target: Vec3,
}

/// Passenger riding in `bus`; follows the seat each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Component)]
pub struct Seated {
    pub bus: Entity,
    pub seat_index: usize,
}

/// Passenger whose bus has left the level. Kept until level reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Component)]
pub struct Delivered {
    pub bus: Entity,
    pub at: u64,
}
