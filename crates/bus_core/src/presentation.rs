//! Outbound notifications for whatever renders the level.
//!
//! The simulation never waits on a sink; implementations must return promptly.

use std::sync::{Arc, Mutex};

use bevy_ecs::prelude::{Entity, Resource};
use bevy_math::{Quat, Vec3};

use crate::ecs::PassengerColor;
use crate::launch::LaunchResponse;

#[derive(Debug, Clone, PartialEq)]
pub enum PresentationEvent {
    BusSpawned {
        bus: Entity,
        color: PassengerColor,
        slot: usize,
    },
    LaunchAccepted {
        bus: Entity,
    },
    LaunchRejected {
        bus: Entity,
        reason: LaunchResponse,
    },
    PassengerBoarded {
        bus: Entity,
        passenger: Entity,
        seat_index: usize,
    },
    BusFull {
        bus: Entity,
    },
    BusDeparted {
        bus: Entity,
        color: PassengerColor,
        passengers: usize,
    },
    LevelComplete {
        level: u32,
    },
    LevelFailed {
        level: u32,
    },
}

pub trait PresentationSink: Send + Sync {
    /// A bus moved or turned this tick.
    fn bus_pose(&mut self, _bus: Entity, _position: Vec3, _heading: Quat, _color: PassengerColor) {}

    fn notify(&mut self, event: PresentationEvent);
}

#[derive(Resource)]
pub struct Presentation(pub Box<dyn PresentationSink>);

impl Default for Presentation {
    fn default() -> Self {
        Self(Box::new(NullPresentation))
    }
}

impl Presentation {
    pub fn new(sink: impl PresentationSink + 'static) -> Self {
        Self(Box::new(sink))
    }

    pub fn notify(&mut self, event: PresentationEvent) {
        self.0.notify(event);
    }

    pub fn bus_pose(&mut self, bus: Entity, position: Vec3, heading: Quat, color: PassengerColor) {
        self.0.bus_pose(bus, position, heading, color);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresentation;

impl PresentationSink for NullPresentation {
    fn notify(&mut self, _event: PresentationEvent) {}
}

/// Keeps every event in a shared log; clone the sink before handing it over
/// to keep a handle for inspection.
#[derive(Debug, Default, Clone)]
pub struct RecordingPresentation {
    events: Arc<Mutex<Vec<PresentationEvent>>>,
    pose_updates: Arc<Mutex<usize>>,
}

impl RecordingPresentation {
    pub fn events(&self) -> Vec<PresentationEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn pose_updates(&self) -> usize {
        match self.pose_updates.lock() {
            Ok(count) => *count,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn count(&self, matches: impl Fn(&PresentationEvent) -> bool) -> usize {
        self.events().iter().filter(|event| matches(event)).count()
    }
}

impl PresentationSink for RecordingPresentation {
    fn bus_pose(&mut self, _bus: Entity, _position: Vec3, _heading: Quat, _color: PassengerColor) {
        if let Ok(mut count) = self.pose_updates.lock() {
            *count += 1;
        }
    }

    fn notify(&mut self, event: PresentationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
