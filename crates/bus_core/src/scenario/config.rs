//! Level description as loaded from JSON.

use std::path::Path;

use bevy_math::Vec3;
use serde::{Deserialize, Serialize};

use super::error::LevelConfigError;
use super::params::{BusTuning, DispatchTiming};
use crate::demand::BatchLayout;
use crate::ecs::PassengerColor;

fn default_closed() -> bool {
    true
}

fn default_detection_radius() -> f32 {
    1.0
}

fn default_capacity() -> usize {
    5
}

fn default_max_active() -> usize {
    5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub points: Vec<Vec3>,
    #[serde(default = "default_closed")]
    pub closed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub color: PassengerColor,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub position: Vec3,
    #[serde(default)]
    pub stop_point: Option<Vec3>,
    /// Radius within which a bus's stop check sees this node.
    #[serde(default = "default_detection_radius")]
    pub detection_radius: f32,
    #[serde(default)]
    pub layout: BatchLayout,
    #[serde(default)]
    pub batches: Vec<BatchConfig>,
    #[serde(default)]
    pub next_nodes: Vec<usize>,
}

impl NodeConfig {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            stop_point: None,
            detection_radius: default_detection_radius(),
            layout: BatchLayout::default(),
            batches: Vec::new(),
            next_nodes: Vec::new(),
        }
    }

    pub fn with_stop_point(mut self, stop_point: Vec3) -> Self {
        self.stop_point = Some(stop_point);
        self
    }

    pub fn with_batch(mut self, color: PassengerColor, count: usize) -> Self {
        self.batches.push(BatchConfig { color, count });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    #[serde(default)]
    pub level_number: u32,
    /// Seeds the schedule shuffle. `None` draws from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    pub route: RouteConfig,
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
    pub waiting_slots: Vec<Vec3>,
    pub exit_point: Vec3,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub priority_order: Vec<PassengerColor>,
    /// Admission cap: buses allowed past launch at once.
    #[serde(default = "default_max_active")]
    pub max_active: usize,
    /// Schedules exactly this many buses instead of sizing the fleet from demand.
    #[serde(default)]
    pub fleet_override: Option<usize>,
    #[serde(default)]
    pub seat_offsets: Vec<Vec3>,
    #[serde(default)]
    pub tuning: BusTuning,
    #[serde(default)]
    pub timing: DispatchTiming,
}

impl LevelConfig {
    pub fn new(route: Vec<Vec3>, waiting_slots: Vec<Vec3>, exit_point: Vec3) -> Self {
        Self {
            level_number: 0,
            seed: None,
            route: RouteConfig {
                points: route,
                closed: true,
            },
            nodes: Vec::new(),
            waiting_slots,
            exit_point,
            capacity: default_capacity(),
            priority_order: Vec::new(),
            max_active: default_max_active(),
            fleet_override: None,
            seat_offsets: Vec::new(),
            tuning: BusTuning::default(),
            timing: DispatchTiming::default(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, LevelConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LevelConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String, LevelConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), LevelConfigError> {
        match self.route.points.len() {
            0 => return Err(LevelConfigError::MissingRoute),
            1 => return Err(LevelConfigError::RouteTooShort(1)),
            _ => {}
        }
        if self.capacity == 0 {
            return Err(LevelConfigError::ZeroCapacity);
        }
        if self.max_active == 0 {
            return Err(LevelConfigError::ZeroAdmissionCap);
        }
        if self.waiting_slots.is_empty() {
            return Err(LevelConfigError::NoWaitingSlots);
        }
        if self.timing.tick_ms == 0 {
            return Err(LevelConfigError::ZeroTick);
        }
        if self.tuning.speed <= 0.0 || self.tuning.speed.is_nan() {
            return Err(LevelConfigError::NonPositiveSpeed(self.tuning.speed));
        }
        let count = self.nodes.len();
        for (node, config) in self.nodes.iter().enumerate() {
            if let Some(&target) = config.next_nodes.iter().find(|&&t| t >= count) {
                return Err(LevelConfigError::DanglingJunction {
                    node,
                    target,
                    count,
                });
            }
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_node(mut self, node: NodeConfig) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_max_active(mut self, max_active: usize) -> Self {
        self.max_active = max_active;
        self
    }

    pub fn with_priority_order(mut self, order: Vec<PassengerColor>) -> Self {
        self.priority_order = order;
        self
    }

    pub fn with_fleet_override(mut self, buses: usize) -> Self {
        self.fleet_override = Some(buses);
        self
    }

    pub fn with_tuning(mut self, tuning: BusTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn with_timing(mut self, timing: DispatchTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Passengers waiting across every node at level start.
    pub fn total_passengers(&self) -> usize {
        self.nodes
            .iter()
            .flat_map(|node| node.batches.iter())
            .map(|batch| batch.count)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "route": { "points": [[0,0,0],[10,0,0],[10,0,10],[0,0,10]] },
        "nodes": [
            { "position": [5,0,0], "batches": [{ "color": "Red", "count": 4 }] }
        ],
        "waiting_slots": [[-5,0,-5],[-3,0,-5]],
        "exit_point": [20,0,0]
    }"#;

    #[test]
    fn minimal_json_fills_defaults() {
        let config = LevelConfig::from_json_str(MINIMAL).expect("valid config");
        assert!(config.route.closed);
        assert_eq!(config.capacity, 5);
        assert_eq!(config.max_active, 5);
        assert_eq!(config.nodes[0].detection_radius, 1.0);
        assert_eq!(config.timing.spawn_interval_ms, 1000);
        assert_eq!(config.total_passengers(), 4);
    }

    #[test]
    fn rejects_empty_route() {
        let mut config = LevelConfig::from_json_str(MINIMAL).expect("valid config");
        config.route.points.clear();
        assert!(matches!(
            config.validate(),
            Err(LevelConfigError::MissingRoute)
        ));
    }

    #[test]
    fn rejects_single_point_route() {
        let mut config = LevelConfig::from_json_str(MINIMAL).expect("valid config");
        config.route.points.truncate(1);
        assert!(matches!(
            config.validate(),
            Err(LevelConfigError::RouteTooShort(1))
        ));

        let json = MINIMAL.replace("[[0,0,0],[10,0,0],[10,0,10],[0,0,10]]", "[[0,0,0]]");
        assert!(matches!(
            LevelConfig::from_json_str(&json),
            Err(LevelConfigError::RouteTooShort(1))
        ));
    }

    #[test]
    fn rejects_zero_capacity_and_cap() {
        let config = LevelConfig::from_json_str(MINIMAL).expect("valid config");
        assert!(matches!(
            config.clone().with_capacity(0).validate(),
            Err(LevelConfigError::ZeroCapacity)
        ));
        assert!(matches!(
            config.with_max_active(0).validate(),
            Err(LevelConfigError::ZeroAdmissionCap)
        ));
    }

    #[test]
    fn rejects_dangling_junction() {
        let mut config = LevelConfig::from_json_str(MINIMAL).expect("valid config");
        config.nodes[0].next_nodes = vec![0, 3];
        match config.validate() {
            Err(LevelConfigError::DanglingJunction {
                node,
                target,
                count,
            }) => {
                assert_eq!((node, target, count), (0, 3, 1));
            }
            other => panic!("unexpected validation result: {other:?}"),
        }
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            LevelConfig::from_json_str("{ \"route\": 7 }"),
            Err(LevelConfigError::Json(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            LevelConfig::from_path("/definitely/not/a/level.json"),
            Err(LevelConfigError::Io(_))
        ));
    }

    #[test]
    fn round_trips_through_json() {
        let config = LevelConfig::from_json_str(MINIMAL)
            .expect("valid config")
            .with_seed(9)
            .with_priority_order(vec![PassengerColor::Blue]);
        let text = config.to_json_string().expect("serialize");
        assert_eq!(LevelConfig::from_json_str(&text).expect("reparse"), config);
    }
}
