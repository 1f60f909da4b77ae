use bevy_ecs::prelude::Resource;
use bevy_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::clock::DEFAULT_TICK_MS;
use crate::route::Route;

/// Route length used for speed normalization when nothing better is known.
pub const FALLBACK_ROUTE_LENGTH: f32 = 50.0;

/// Level number, for logs and presentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Resource)]
pub struct LevelNumber(pub u32);

/// Motion, sensing and timing shared by every bus in a level.
///
/// Distances are world units, durations simulation milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct BusTuning {
    /// Route speed in world units per second.
    pub speed: f32,
    /// Divides `speed * dt` when advancing the route parameter. `None` uses
    /// the actual route length.
    pub route_length_estimate: Option<f32>,
    /// Forward collision sensor.
    pub sensor_length: f32,
    pub sensor_width: f32,
    pub sensor_height: f32,
    /// Radius other buses' sensors see this bus as.
    pub body_radius: f32,
    /// Stop check radius; 0 disables stopping at nodes.
    pub node_detection_radius: f32,
    pub stop_distance: f32,
    /// Route parameter past which a bus may leave for the exit.
    pub exit_threshold: f32,
    pub exit_arrival_distance: f32,
    pub seat_arrival_distance: f32,
    /// Walking speed of a boarding passenger, units per second.
    pub passenger_speed: f32,
    /// Heading interpolation rate while on the route, per second.
    pub turn_rate: f32,
    pub boarding_timeout_ms: u64,
    pub clearance_retry_ms: u64,
    pub lock_retry_ms: u64,
    pub merge_duration_ms: u64,
    pub stop_approach_ms: u64,
    pub settle_ms: u64,
    pub slot_entry_ms: u64,
    pub slot_shift_ms: u64,
    /// Where a freshly spawned bus starts relative to its slot.
    pub slot_entry_offset: Vec3,
}

impl Default for BusTuning {
    fn default() -> Self {
        Self {
            speed: 5.0,
            route_length_estimate: None,
            sensor_length: 1.25,
            sensor_width: 1.5,
            sensor_height: 1.0,
            body_radius: 0.5,
            node_detection_radius: 0.75,
            stop_distance: 0.5,
            exit_threshold: 0.8,
            exit_arrival_distance: 0.5,
            seat_arrival_distance: 0.2,
            passenger_speed: 5.0 * 1.75,
            turn_rate: 10.0,
            boarding_timeout_ms: 3000,
            clearance_retry_ms: 200,
            lock_retry_ms: 100,
            merge_duration_ms: 500,
            stop_approach_ms: 500,
            settle_ms: 500,
            slot_entry_ms: 1500,
            slot_shift_ms: 500,
            slot_entry_offset: Vec3::new(0.0, 0.0, 10.0),
        }
    }
}

impl BusTuning {
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_route_length_estimate(mut self, length: f32) -> Self {
        self.route_length_estimate = Some(length);
        self
    }

    pub fn with_node_detection_radius(mut self, radius: f32) -> Self {
        self.node_detection_radius = radius;
        self
    }

    pub fn with_boarding_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.boarding_timeout_ms = timeout_ms;
        self
    }

    /// Length that `speed * dt` is divided by when advancing along `route`.
    pub fn route_length(&self, route: &Route) -> f32 {
        let length = match self.route_length_estimate {
            Some(estimate) => estimate,
            None => route.length(),
        };
        if length > f32::EPSILON {
            length
        } else {
            FALLBACK_ROUTE_LENGTH
        }
    }
}

/// Clock and spawner cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct DispatchTiming {
    pub tick_ms: u64,
    pub initial_spawn_delay_ms: u64,
    pub spawn_interval_ms: u64,
}

impl Default for DispatchTiming {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            initial_spawn_delay_ms: 1000,
            spawn_interval_ms: 1000,
        }
    }
}

impl DispatchTiming {
    pub fn with_tick_ms(mut self, tick_ms: u64) -> Self {
        self.tick_ms = tick_ms;
        self
    }

    pub fn with_spawn_interval_ms(mut self, interval_ms: u64) -> Self {
        self.spawn_interval_ms = interval_ms;
        self
    }

    pub fn with_initial_spawn_delay_ms(mut self, delay_ms: u64) -> Self {
        self.initial_spawn_delay_ms = delay_ms;
        self
    }
}

/// What every spawned bus looks like.
#[derive(Debug, Clone, PartialEq, Resource)]
pub struct FleetSpec {
    pub capacity: usize,
    pub seat_offsets: Vec<Vec3>,
}

impl Default for FleetSpec {
    fn default() -> Self {
        Self {
            capacity: 5,
            seat_offsets: Vec::new(),
        }
    }
}
