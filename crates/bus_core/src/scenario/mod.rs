//! Level setup: configuration, validation and world construction.

mod build;
mod config;
mod error;
mod params;

pub use build::{build_level, reset_level};
pub use config::{BatchConfig, LevelConfig, NodeConfig, RouteConfig};
pub use error::LevelConfigError;
pub use params::{BusTuning, DispatchTiming, FleetSpec, LevelNumber, FALLBACK_ROUTE_LENGTH};
