//! Test helpers: a small reference level shared by unit tests, integration tests and benches.
//!
//! Geometry: a 20 x 20 square loop on the ground plane, waiting slots beyond
//! its far (+Z) edge facing the route, and the exit off the left side.

use bevy_ecs::prelude::World;
use bevy_math::Vec3;

use crate::ecs::PassengerColor;
use crate::scenario::{build_level, LevelConfig, NodeConfig};

pub const TEST_SEED: u64 = 42;

/// Side length of [square_route].
pub const ROUTE_SIDE: f32 = 20.0;

/// Closed square loop, counter-clockwise seen from above, starting at the origin.
pub fn square_route() -> Vec<Vec3> {
    vec![
        Vec3::ZERO,
        Vec3::new(ROUTE_SIDE, 0.0, 0.0),
        Vec3::new(ROUTE_SIDE, 0.0, ROUTE_SIDE),
        Vec3::new(0.0, 0.0, ROUTE_SIDE),
    ]
}

/// `count` waiting slots in two lanes behind the far edge of [square_route].
/// Even slots form the left lane, odd slots the right lane.
pub fn lane_slots(count: usize) -> Vec<Vec3> {
    (0..count)
        .map(|slot| {
            let lane = (slot % 2) as f32;
            let depth = (slot / 2) as f32;
            Vec3::new(4.0 + lane * 4.0, 0.0, ROUTE_SIDE + 4.0 + depth * 3.0)
        })
        .collect()
}

pub fn exit_point() -> Vec3 {
    Vec3::new(-10.0, 0.0, 10.0)
}

/// Queue on the first edge of the route.
pub fn near_node() -> NodeConfig {
    NodeConfig::new(Vec3::new(10.0, 0.0, 0.0))
}

/// Queue on the second edge of the route.
pub fn side_node() -> NodeConfig {
    NodeConfig::new(Vec3::new(ROUTE_SIDE, 0.0, 10.0))
}

/// Level with no queues yet; add some with [LevelConfig::with_node].
pub fn empty_level() -> LevelConfig {
    LevelConfig::new(square_route(), lane_slots(4), exit_point()).with_seed(TEST_SEED)
}

/// One queue holding a single batch.
pub fn single_batch_level(color: PassengerColor, count: usize) -> LevelConfig {
    empty_level().with_node(near_node().with_batch(color, count))
}

/// Two colors across two queues; blue is partly stuck behind red.
pub fn two_color_level() -> LevelConfig {
    empty_level()
        .with_node(
            near_node()
                .with_batch(PassengerColor::Red, 5)
                .with_batch(PassengerColor::Blue, 3),
        )
        .with_node(side_node().with_batch(PassengerColor::Blue, 2))
        .with_priority_order(vec![PassengerColor::Red, PassengerColor::Blue])
}

/// Fresh world with `config` built into it.
///
/// # Panics
///
/// Panics if `config` fails validation.
pub fn create_level_world(config: &LevelConfig) -> World {
    let mut world = World::new();
    build_level(&mut world, config).expect("test level should be valid");
    world
}
