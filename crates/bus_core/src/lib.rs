pub mod clock;
pub mod collision;
pub mod demand;
pub mod dispatcher;
pub mod ecs;
pub mod launch;
pub mod level;
pub mod motion;
pub mod presentation;
pub mod route;
pub mod runner;
pub mod scenario;
pub mod spatial;
pub mod systems;
pub mod telemetry;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
